use crate::filters::{ItemFilter, ItemSearch, Partition};
use crate::models::{FOLDER_COLUMNS, FolderRow, ITEM_SELECT, ItemRow, USER_COLUMNS, UserRow};
use crate::{Database, timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, params_from_iter};
use uuid::Uuid;

use nook_types::FolderKind;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: Uuid, email: &str, now: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                (id.to_string(), email, timestamp(now)),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            conn.query_row(&sql, [email], UserRow::from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn touch_last_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_active_at = ?2 WHERE id = ?1",
                (user_id.to_string(), timestamp(at)),
            )?;
            Ok(())
        })
    }

    /// `None` when the user has not configured a PIN (or does not exist).
    pub fn private_pin_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        Ok(self.get_user_by_id(user_id)?.and_then(|u| u.private_pin_hash))
    }

    /// Stores the first PIN hash. Returns false when one is already set, so
    /// two racing setups cannot both succeed.
    pub fn init_private_pin_hash(&self, user_id: Uuid, hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET private_pin_hash = ?2
                 WHERE id = ?1 AND private_pin_hash IS NULL",
                (user_id.to_string(), hash),
            )?;
            Ok(changed == 1)
        })
    }

    /// Rotates an existing PIN hash. Returns false when none is set.
    pub fn replace_private_pin_hash(&self, user_id: Uuid, hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET private_pin_hash = ?2
                 WHERE id = ?1 AND private_pin_hash IS NOT NULL",
                (user_id.to_string(), hash),
            )?;
            Ok(changed == 1)
        })
    }

    // -- Folders --

    /// Folders on one side of the partition, most recently updated first.
    /// `Partition::Any` is accepted but lists both sides.
    pub fn list_folders(
        &self,
        user_id: Uuid,
        kind: Option<FolderKind>,
        partition: Partition,
    ) -> Result<Vec<FolderRow>> {
        self.with_conn(|conn| {
            let mut sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ?1");
            sql.push_str(partition.folder_clause());
            let mut args = vec![user_id.to_string()];
            if let Some(kind) = kind {
                sql.push_str(" AND kind = ?2");
                args.push(kind.as_str().to_string());
            }
            sql.push_str(" ORDER BY updated_at DESC, rowid DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), FolderRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_folder(
        &self,
        user_id: Uuid,
        folder_id: Uuid,
        partition: Partition,
    ) -> Result<Option<FolderRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1 AND user_id = ?2{}",
                partition.folder_clause()
            );
            conn.query_row(
                &sql,
                (folder_id.to_string(), user_id.to_string()),
                FolderRow::from_row,
            )
            .optional()
        })
    }

    pub fn find_folder_by_name(
        &self,
        user_id: Uuid,
        kind: FolderKind,
        name: &str,
    ) -> Result<Option<FolderRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ?1 AND kind = ?2 AND name = ?3"
            );
            conn.query_row(
                &sql,
                (user_id.to_string(), kind.as_str(), name),
                FolderRow::from_row,
            )
            .optional()
        })
    }

    /// The oldest private folder of the given kind.
    pub fn first_private_folder(&self, user_id: Uuid, kind: FolderKind) -> Result<Option<FolderRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {FOLDER_COLUMNS} FROM folders
                 WHERE user_id = ?1 AND kind = ?2 AND is_private = 1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT 1"
            );
            conn.query_row(&sql, (user_id.to_string(), kind.as_str()), FolderRow::from_row)
                .optional()
        })
    }

    /// Inserts a folder. Returns false, leaving the table untouched, when the
    /// `(user_id, kind, name)` triple is already taken.
    pub fn insert_folder(&self, folder: &FolderRow) -> Result<bool> {
        self.with_conn(|conn| insert_folder_row(conn, folder))
    }

    /// Writes name, star flag and `updated_at`. Returns false when the new
    /// name collides with a sibling folder.
    pub fn update_folder(&self, folder: &FolderRow) -> Result<bool> {
        self.with_conn(|conn| {
            let result = conn.execute(
                "UPDATE folders SET name = ?3, is_starred = ?4, updated_at = ?5
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    folder.id.to_string(),
                    folder.user_id.to_string(),
                    folder.name,
                    folder.is_starred,
                    timestamp(folder.updated_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn delete_folder(&self, user_id: Uuid, folder_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM folders WHERE id = ?1 AND user_id = ?2",
                (folder_id.to_string(), user_id.to_string()),
            )?;
            Ok(changed == 1)
        })
    }

    pub fn count_folders(&self, user_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM folders WHERE user_id = ?1",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Items in the folder that are not soft-deleted, drafts included.
    pub fn count_live_items_in_folder(&self, folder_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM items WHERE folder_id = ?1 AND deleted_at IS NULL",
                [folder_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Items --

    pub fn insert_item(&self, item: &ItemRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO items (id, user_id, type, title, content, url, folder_id,
                                    is_starred, is_draft, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    item.id.to_string(),
                    item.user_id.to_string(),
                    item.item_type.as_str(),
                    item.title,
                    item.content,
                    item.url,
                    item.folder_id().map(|id| id.to_string()),
                    item.is_starred,
                    item.is_draft,
                    timestamp(item.created_at),
                    timestamp(item.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// A live (not soft-deleted) item owned by `user_id`, restricted to one
    /// side of the partition.
    pub fn get_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        partition: Partition,
    ) -> Result<Option<ItemRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ITEM_SELECT} WHERE i.id = ?1 AND i.user_id = ?2 AND i.deleted_at IS NULL{}",
                partition.item_clause()
            );
            conn.query_row(
                &sql,
                (item_id.to_string(), user_id.to_string()),
                ItemRow::from_row,
            )
            .optional()
        })
    }

    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ItemRow>> {
        let (clause, args) = filter.to_sql();
        self.with_conn(|conn| query_items(conn, &clause, &args))
    }

    pub fn search_items(&self, search: &ItemSearch<'_>) -> Result<Vec<ItemRow>> {
        let (clause, args) = search.to_sql();
        self.with_conn(|conn| query_items(conn, &clause, &args))
    }

    /// Persists the mutable fields of an item. Type, draft flag and
    /// ownership are fixed after creation and are not written.
    pub fn update_item(&self, item: &ItemRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE items SET title = ?3, content = ?4, url = ?5, folder_id = ?6,
                                  is_starred = ?7, updated_at = ?8
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    item.id.to_string(),
                    item.user_id.to_string(),
                    item.title,
                    item.content,
                    item.url,
                    item.folder_id().map(|id| id.to_string()),
                    item.is_starred,
                    timestamp(item.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_item(&self, user_id: Uuid, item_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let at = timestamp(at);
            let changed = conn.execute(
                "UPDATE items SET deleted_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
                (item_id.to_string(), user_id.to_string(), at),
            )?;
            Ok(changed == 1)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: Uuid) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], UserRow::from_row).optional()
}

pub(crate) fn insert_folder_row(conn: &Connection, folder: &FolderRow) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO folders (id, user_id, kind, name, is_private, is_starred, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (user_id, kind, name) DO NOTHING",
        params![
            folder.id.to_string(),
            folder.user_id.to_string(),
            folder.kind.as_str(),
            folder.name,
            folder.is_private,
            folder.is_starred,
            timestamp(folder.created_at),
            timestamp(folder.updated_at),
        ],
    )?;
    Ok(changed == 1)
}

fn query_items(conn: &Connection, clause: &str, args: &[String]) -> Result<Vec<ItemRow>> {
    let sql = format!("{ITEM_SELECT}{clause} ORDER BY i.updated_at DESC, i.rowid DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), ItemRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
