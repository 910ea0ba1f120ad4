//! Database row types: these map directly to SQLite rows.
//! Distinct from nook-types API responses to keep the DB layer independent.
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use nook_types::{FolderKind, ItemType};

pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub private_pin_hash: Option<String>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FolderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: FolderKind,
    pub name: String,
    pub is_private: bool,
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The owning folder as joined onto an item row.
#[derive(Debug, Clone)]
pub struct FolderRef {
    pub id: Uuid,
    pub name: String,
    pub kind: FolderKind,
    pub is_private: bool,
}

#[derive(Debug, Clone)]
pub struct ItemRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_type: ItemType,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub folder: Option<FolderRef>,
    pub is_starred: bool,
    pub is_draft: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemRow {
    pub fn folder_id(&self) -> Option<Uuid> {
        self.folder.as_ref().map(|f| f.id)
    }

    /// Effective privacy is inherited from the folder; unfiled items are public.
    pub fn is_private(&self) -> bool {
        self.folder.as_ref().is_some_and(|f| f.is_private)
    }
}

pub(crate) const USER_COLUMNS: &str = "id, email, private_pin_hash, last_active_at, created_at";

pub(crate) const FOLDER_COLUMNS: &str =
    "id, user_id, kind, name, is_private, is_starred, created_at, updated_at";

pub(crate) const ITEM_SELECT: &str = "SELECT i.id, i.user_id, i.type, i.title, i.content, i.url,
            i.folder_id, f.name, f.kind, f.is_private,
            i.is_starred, i.is_draft, i.deleted_at, i.created_at, i.updated_at
     FROM items i
     LEFT JOIN folders f ON f.id = i.folder_id";

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_col(row, 0)?,
            email: row.get(1)?,
            private_pin_hash: row.get(2)?,
            last_active_at: parse_opt_col(row, 3)?,
            created_at: parse_col(row, 4)?,
        })
    }
}

impl FolderRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_col(row, 0)?,
            user_id: parse_col(row, 1)?,
            kind: parse_col(row, 2)?,
            name: row.get(3)?,
            is_private: row.get(4)?,
            is_starred: row.get(5)?,
            created_at: parse_col(row, 6)?,
            updated_at: parse_col(row, 7)?,
        })
    }
}

impl ItemRow {
    /// Maps a row produced by `ITEM_SELECT`.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let folder_id: Option<Uuid> = parse_opt_col(row, 6)?;
        let folder = match folder_id {
            Some(id) => Some(FolderRef {
                id,
                name: row.get(7)?,
                kind: parse_col(row, 8)?,
                is_private: row.get(9)?,
            }),
            None => None,
        };

        Ok(Self {
            id: parse_col(row, 0)?,
            user_id: parse_col(row, 1)?,
            item_type: parse_col(row, 2)?,
            title: row.get(3)?,
            content: row.get(4)?,
            url: row.get(5)?,
            folder,
            is_starred: row.get(10)?,
            is_draft: row.get(11)?,
            deleted_at: parse_opt_col(row, 12)?,
            created_at: parse_col(row, 13)?,
            updated_at: parse_col(row, 14)?,
        })
    }
}

/// Reads a TEXT column and parses it, reporting corrupt values as a
/// conversion failure on that column.
fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
