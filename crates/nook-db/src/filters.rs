//! Typed query filters for folder and item reads.
//!
//! Every listing goes through one of these values so the privacy predicate is
//! chosen by a variant, never assembled ad hoc by callers.

use uuid::Uuid;

use nook_types::ItemType;

/// Which side of the privacy partition a lookup may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// No privacy predicate. Callers must gate private rows themselves.
    Any,
    /// Unfiled rows and rows in non-private folders.
    Public,
    /// Only rows in private folders (or, for folders, private folders).
    Private,
}

/// Where listed items may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemScope {
    /// Items filed in one specific non-private folder.
    PublicFolder(Uuid),
    /// Unfiled items plus items in any non-private folder.
    PublicWithUnfiled,
    /// Items in any non-private folder; unfiled items excluded.
    PublicFiled,
    /// Items in private folders only.
    Private,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemFilter {
    pub user_id: Uuid,
    pub item_type: ItemType,
    pub scope: ItemScope,
    pub include_drafts: bool,
}

/// Substring search over the public partition. Drafts and soft-deleted items
/// never match.
#[derive(Debug, Clone, Copy)]
pub struct ItemSearch<'a> {
    pub user_id: Uuid,
    pub item_type: ItemType,
    pub term: &'a str,
}

impl Partition {
    /// Predicate over the `items i LEFT JOIN folders f` join.
    pub(crate) fn item_clause(self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Public => " AND (i.folder_id IS NULL OR f.is_private = 0)",
            Self::Private => " AND f.is_private = 1",
        }
    }

    /// Predicate over the `folders` table.
    pub(crate) fn folder_clause(self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Public => " AND is_private = 0",
            Self::Private => " AND is_private = 1",
        }
    }
}

impl ItemFilter {
    /// Builds the WHERE clause and its positional parameters. `?1` is the
    /// user id and `?2` the item type.
    pub(crate) fn to_sql(&self) -> (String, Vec<String>) {
        let mut sql = String::from(" WHERE i.user_id = ?1 AND i.type = ?2 AND i.deleted_at IS NULL");
        let mut params = vec![self.user_id.to_string(), self.item_type.as_str().to_string()];

        if !self.include_drafts {
            sql.push_str(" AND i.is_draft = 0");
        }

        match self.scope {
            ItemScope::PublicFolder(folder_id) => {
                sql.push_str(" AND i.folder_id = ?3 AND f.is_private = 0");
                params.push(folder_id.to_string());
            }
            ItemScope::PublicWithUnfiled => sql.push_str(Partition::Public.item_clause()),
            ItemScope::PublicFiled => sql.push_str(" AND i.folder_id IS NOT NULL AND f.is_private = 0"),
            ItemScope::Private => sql.push_str(Partition::Private.item_clause()),
        }

        (sql, params)
    }
}

impl ItemSearch<'_> {
    pub(crate) fn to_sql(&self) -> (String, Vec<String>) {
        let mut sql = String::from(
            " WHERE i.user_id = ?1 AND i.type = ?2 AND i.deleted_at IS NULL AND i.is_draft = 0",
        );
        sql.push_str(Partition::Public.item_clause());

        // instr() on folded text: a case-insensitive substring match with no
        // LIKE wildcards to escape. fold() is registered by Database::open.
        match self.item_type {
            ItemType::Note => sql.push_str(
                " AND (instr(fold(COALESCE(i.title, '')), fold(?3)) > 0
                       OR instr(fold(COALESCE(i.content, '')), fold(?3)) > 0)",
            ),
            ItemType::Url => sql.push_str(" AND instr(fold(COALESCE(i.url, '')), fold(?3)) > 0"),
        }

        let params = vec![
            self.user_id.to_string(),
            self.item_type.as_str().to_string(),
            self.term.to_string(),
        ];
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_scopes_always_exclude_private_folders() {
        let user_id = Uuid::new_v4();
        for scope in [
            ItemScope::PublicFolder(Uuid::new_v4()),
            ItemScope::PublicWithUnfiled,
            ItemScope::PublicFiled,
        ] {
            let filter = ItemFilter {
                user_id,
                item_type: ItemType::Note,
                scope,
                include_drafts: true,
            };
            let (sql, _) = filter.to_sql();
            assert!(sql.contains("f.is_private = 0"), "{scope:?}: {sql}");
            assert!(!sql.contains("is_private = 1"), "{scope:?}: {sql}");
        }
    }

    #[test]
    fn drafts_filtered_unless_requested() {
        let mut filter = ItemFilter {
            user_id: Uuid::new_v4(),
            item_type: ItemType::Note,
            scope: ItemScope::PublicFiled,
            include_drafts: false,
        };
        assert!(filter.to_sql().0.contains("is_draft = 0"));

        filter.include_drafts = true;
        assert!(!filter.to_sql().0.contains("is_draft"));
    }

    #[test]
    fn folder_scope_binds_third_param() {
        let folder_id = Uuid::new_v4();
        let filter = ItemFilter {
            user_id: Uuid::new_v4(),
            item_type: ItemType::Url,
            scope: ItemScope::PublicFolder(folder_id),
            include_drafts: false,
        };
        let (_, params) = filter.to_sql();
        assert_eq!(params.len(), 3);
        assert_eq!(params[2], folder_id.to_string());
    }
}
