//! Substring search over the public partition only. There is deliberately no
//! private variant: unlocked or not, private items never match.

use axum::{Extension, extract::State};
use uuid::Uuid;

use nook_db::{Database, ItemRow, ItemSearch};
use nook_types::ItemType;
use nook_types::api::{Claims, ItemResponse, SearchQuery};

use crate::error::{ApiResult, AppError, Success};
use crate::extract::Query;
use crate::items::{item_responses, parse_item_type};
use crate::state::{AppState, blocking};

pub fn search_items(db: &Database, user_id: Uuid, query: &str, item_type: ItemType) -> ApiResult<Vec<ItemRow>> {
    let term = query.trim();
    if term.is_empty() {
        return Err(AppError::validation("search query must not be empty"));
    }
    Ok(db.search_items(&ItemSearch {
        user_id,
        item_type,
        term,
    })?)
}

pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Success<Vec<ItemResponse>>> {
    let item_type = parse_item_type(query.item_type.as_deref())?;
    let q = query.q.unwrap_or_default();
    let items = blocking(&state, move |s| search_items(&s.db, claims.sub, &q, item_type)).await?;
    Ok(Success(item_responses(items)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use nook_types::FolderKind;
    use nook_types::api::{CreateItemRequest, CreatePrivateItemRequest};

    use super::*;
    use crate::folders::create_folder;
    use crate::items::{create_item, create_private_item};
    use crate::sessions::{MemoryUnlockStore, PrivateAccess};

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "search@example.com", Utc::now()).unwrap();
        db.seed_default_folders(user).unwrap();
        (db, user)
    }

    fn add(db: &Database, user: Uuid, req: CreateItemRequest) -> ItemRow {
        create_item(db, user, req).unwrap()
    }

    #[test]
    fn notes_match_title_or_content_case_insensitively() {
        let (db, user) = setup();
        let by_title = add(
            &db,
            user,
            CreateItemRequest {
                item_type: "NOTE".to_string(),
                title: Some("Recipes".to_string()),
                content: Some("flour".to_string()),
                ..Default::default()
            },
        );
        let by_content = add(
            &db,
            user,
            CreateItemRequest {
                item_type: "NOTE".to_string(),
                content: Some("grandma's RECIPE book".to_string()),
                ..Default::default()
            },
        );

        let ids: Vec<Uuid> = search_items(&db, user, "  recipe ", ItemType::Note)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&by_title.id) && ids.contains(&by_content.id));
    }

    #[test]
    fn urls_match_url_only() {
        let (db, user) = setup();
        let tools = create_folder(&db, user, FolderKind::Urls, "Docs").unwrap();
        let hit = add(
            &db,
            user,
            CreateItemRequest {
                item_type: "URL".to_string(),
                title: Some("rust".to_string()),
                url: Some("https://docs.rs/axum".to_string()),
                folder_id: Some(tools.id),
                ..Default::default()
            },
        );
        assert_eq!(search_items(&db, user, "AXUM", ItemType::Url).unwrap()[0].id, hit.id);
        assert!(search_items(&db, user, "rust", ItemType::Url).unwrap().is_empty());
    }

    #[test]
    fn private_and_draft_items_never_match() {
        let (db, user) = setup();
        create_private_item(
            &db,
            user,
            CreatePrivateItemRequest {
                title: None,
                content: Some("hidden treasure".to_string()),
            },
        )
        .unwrap();
        add(
            &db,
            user,
            CreateItemRequest {
                item_type: "NOTE".to_string(),
                content: Some("draft treasure".to_string()),
                is_draft: true,
                ..Default::default()
            },
        );

        // Unlocking changes nothing for search.
        let access = PrivateAccess::new(Arc::new(MemoryUnlockStore::new()), Duration::minutes(30));
        access.grant(user);
        assert!(search_items(&db, user, "treasure", ItemType::Note).unwrap().is_empty());
    }

    #[test]
    fn blank_query_is_rejected() {
        let (db, user) = setup();
        assert!(matches!(
            search_items(&db, user, "   ", ItemType::Note),
            Err(AppError::Validation(_))
        ));
    }
}
