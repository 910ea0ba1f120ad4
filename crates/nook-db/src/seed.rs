use anyhow::Result;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use nook_types::FolderKind;

use crate::Database;
use crate::models::FolderRow;
use crate::queries::insert_folder_row;

/// Starter folders every new account receives: `(kind, name, is_private)`.
/// The private partition is seeded here and nowhere else.
pub const DEFAULT_FOLDERS: &[(FolderKind, &str, bool)] = &[
    (FolderKind::Notes, "Private", true),
    (FolderKind::Notes, "Category 1", false),
    (FolderKind::Notes, "Category 2", false),
    (FolderKind::Urls, "Frequent", false),
    (FolderKind::Urls, "Shopping", false),
    (FolderKind::Urls, "Tools", false),
];

impl Database {
    /// Ensures the starter set exists for `user_id`. Folders already present
    /// (by kind and name) are left alone, so reruns are no-ops. Returns how
    /// many folders were created.
    pub fn seed_default_folders(&self, user_id: Uuid) -> Result<usize> {
        let created = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now();
            let mut created = 0;
            for &(kind, name, is_private) in DEFAULT_FOLDERS {
                let folder = FolderRow {
                    id: Uuid::new_v4(),
                    user_id,
                    kind,
                    name: name.to_string(),
                    is_private,
                    is_starred: false,
                    created_at: now,
                    updated_at: now,
                };
                if insert_folder_row(&tx, &folder)? {
                    created += 1;
                }
            }
            tx.commit()?;
            Ok(created)
        })?;

        if created > 0 {
            info!(%user_id, created, "Seeded default folders");
        }
        Ok(created)
    }
}
