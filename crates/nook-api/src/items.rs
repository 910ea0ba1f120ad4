//! Item visibility.
//!
//! An item is private exactly when its folder is. Public listings and search
//! exclude private folders outright. A single public item that turns out to be
//! private is answered with `PrivateLocked` while the user is locked: the
//! caller already holds its id, so the lock is disclosed rather than faked as
//! a miss. The private surface reports every miss as `Forbidden`.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use nook_db::{Database, FolderRef, FolderRow, ItemFilter, ItemRow, ItemScope, Partition};
use nook_types::api::{
    Claims, CreateItemRequest, CreatePrivateItemRequest, FolderSummary, ItemListQuery,
    ItemResponse, PrivateItemListQuery, UpdateItemRequest, UpdatePrivateItemRequest,
};
use nook_types::{FolderKind, ItemType};

use crate::error::{ApiResult, AppError, Success, done};
use crate::extract::{JsonBody, Path, Query};
use crate::folders::get_public_folder_by_id;
use crate::sessions::PrivateAccess;
use crate::state::{AppState, blocking};

pub const MAX_TITLE_LEN: usize = 10;

pub(crate) fn parse_item_type(raw: Option<&str>) -> ApiResult<ItemType> {
    let raw = raw.ok_or_else(|| AppError::validation("type is required (NOTE or URL)"))?;
    Ok(raw.parse()?)
}

/// Empty titles are stored as absent.
fn clean_title(title: Option<String>) -> ApiResult<Option<String>> {
    match title {
        Some(t) if t.chars().count() > MAX_TITLE_LEN => Err(AppError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        ))),
        Some(t) if t.is_empty() => Ok(None),
        other => Ok(other),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Resolves a filing target through the public lookup and checks that its
/// kind fits the item type.
fn filing_target(db: &Database, user_id: Uuid, item_type: ItemType, folder_id: Uuid) -> ApiResult<FolderRow> {
    let folder = get_public_folder_by_id(db, user_id, folder_id)?;
    ensure_kind_matches(&folder, item_type)?;
    Ok(folder)
}

fn ensure_kind_matches(folder: &FolderRow, item_type: ItemType) -> ApiResult<()> {
    let expected = item_type.folder_kind();
    if folder.kind != expected {
        return Err(AppError::validation(format!(
            "folder kind {} does not match item type {} (expected {})",
            folder.kind, item_type, expected
        )));
    }
    Ok(())
}

fn folder_ref(folder: &FolderRow) -> FolderRef {
    FolderRef {
        id: folder.id,
        name: folder.name.clone(),
        kind: folder.kind,
        is_private: folder.is_private,
    }
}

// -- Public surface --

pub fn list_public_items(
    db: &Database,
    user_id: Uuid,
    item_type: ItemType,
    folder_id: Option<Uuid>,
    include_unfiled: bool,
    include_draft: bool,
) -> ApiResult<Vec<ItemRow>> {
    let scope = match folder_id {
        Some(folder_id) => {
            let folder = filing_target(db, user_id, item_type, folder_id)?;
            ItemScope::PublicFolder(folder.id)
        }
        None if include_unfiled => ItemScope::PublicWithUnfiled,
        None => ItemScope::PublicFiled,
    };

    Ok(db.list_items(&ItemFilter {
        user_id,
        item_type,
        scope,
        include_drafts: include_draft,
    })?)
}

/// A live item owned by the caller. Items in private folders additionally
/// require an unlock.
pub fn get_public_item(
    db: &Database,
    access: &PrivateAccess,
    user_id: Uuid,
    item_id: Uuid,
) -> ApiResult<ItemRow> {
    let item = db
        .get_item(user_id, item_id, Partition::Any)?
        .ok_or_else(|| AppError::not_found("item not found"))?;
    if item.is_private() {
        access.ensure_unlocked(user_id)?;
    }
    Ok(item)
}

pub fn create_item(db: &Database, user_id: Uuid, req: CreateItemRequest) -> ApiResult<ItemRow> {
    let item_type = parse_item_type(Some(req.item_type.as_str()))?;
    let title = clean_title(req.title)?;

    let (content, url) = match item_type {
        ItemType::Note => {
            let content = non_empty(req.content)
                .ok_or_else(|| AppError::validation("content is required for NOTE items"))?;
            (Some(content), None)
        }
        ItemType::Url => {
            if req.is_draft {
                return Err(AppError::validation("only NOTE items can be drafts"));
            }
            let url = non_empty(req.url).ok_or_else(|| AppError::validation("url is required for URL items"))?;
            (None, Some(url))
        }
    };

    let folder = req
        .folder_id
        .map(|folder_id| filing_target(db, user_id, item_type, folder_id))
        .transpose()?;

    let now = Utc::now();
    let item = ItemRow {
        id: Uuid::new_v4(),
        user_id,
        item_type,
        title,
        content,
        url,
        folder: folder.as_ref().map(folder_ref),
        is_starred: false,
        is_draft: req.is_draft,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };
    db.insert_item(&item)?;
    Ok(item)
}

/// Applies only the supplied fields. `content` and `url` are ignored unless
/// they match the item's type; the draft flag never changes here.
pub fn update_item(
    db: &Database,
    access: &PrivateAccess,
    user_id: Uuid,
    item_id: Uuid,
    req: UpdateItemRequest,
) -> ApiResult<ItemRow> {
    let mut item = get_public_item(db, access, user_id, item_id)?;

    if let Some(title) = req.title {
        item.title = clean_title(title)?;
    }
    match item.item_type {
        ItemType::Note => {
            if let Some(content) = req.content {
                item.content = Some(content);
            }
        }
        ItemType::Url => {
            if let Some(url) = req.url {
                item.url = Some(url);
            }
        }
    }
    if let Some(folder_id) = req.folder_id {
        item.folder = match folder_id {
            Some(folder_id) => Some(folder_ref(&filing_target(db, user_id, item.item_type, folder_id)?)),
            None => None,
        };
    }
    if let Some(is_starred) = req.is_starred {
        item.is_starred = is_starred;
    }

    item.updated_at = Utc::now();
    db.update_item(&item)?;
    Ok(item)
}

pub fn delete_item(db: &Database, access: &PrivateAccess, user_id: Uuid, item_id: Uuid) -> ApiResult<()> {
    let item = get_public_item(db, access, user_id, item_id)?;
    db.soft_delete_item(user_id, item.id, Utc::now())?;
    Ok(())
}

// -- Private surface --
//
// Callers must already have passed the unlock guard.

pub fn list_private_items(db: &Database, user_id: Uuid, item_type: ItemType) -> ApiResult<Vec<ItemRow>> {
    if item_type != ItemType::Note {
        return Err(AppError::validation("private items are NOTE only"));
    }
    Ok(db.list_items(&ItemFilter {
        user_id,
        item_type,
        scope: ItemScope::Private,
        include_drafts: false,
    })?)
}

pub fn get_private_item(db: &Database, user_id: Uuid, item_id: Uuid) -> ApiResult<ItemRow> {
    db.get_item(user_id, item_id, Partition::Private)?
        .ok_or(AppError::Forbidden)
}

/// Files a new note into the user's first private NOTES folder.
pub fn create_private_item(db: &Database, user_id: Uuid, req: CreatePrivateItemRequest) -> ApiResult<ItemRow> {
    let content = non_empty(req.content).ok_or_else(|| AppError::validation("content is required for NOTE items"))?;
    let title = clean_title(req.title)?;
    let folder = db
        .first_private_folder(user_id, FolderKind::Notes)?
        .ok_or_else(|| AppError::validation("no private folder exists"))?;

    let now = Utc::now();
    let item = ItemRow {
        id: Uuid::new_v4(),
        user_id,
        item_type: ItemType::Note,
        title,
        content: Some(content),
        url: None,
        folder: Some(folder_ref(&folder)),
        is_starred: false,
        is_draft: false,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };
    db.insert_item(&item)?;
    Ok(item)
}

pub fn update_private_item(
    db: &Database,
    user_id: Uuid,
    item_id: Uuid,
    req: UpdatePrivateItemRequest,
) -> ApiResult<ItemRow> {
    let mut item = get_private_item(db, user_id, item_id)?;
    if let Some(title) = req.title {
        item.title = clean_title(title)?;
    }
    if let Some(content) = req.content {
        item.content = Some(content);
    }
    if let Some(is_starred) = req.is_starred {
        item.is_starred = is_starred;
    }
    item.updated_at = Utc::now();
    db.update_item(&item)?;
    Ok(item)
}

pub fn delete_private_item(db: &Database, user_id: Uuid, item_id: Uuid) -> ApiResult<()> {
    let item = get_private_item(db, user_id, item_id)?;
    db.soft_delete_item(user_id, item.id, Utc::now())?;
    Ok(())
}

pub(crate) fn item_response(item: ItemRow) -> ItemResponse {
    ItemResponse {
        id: item.id,
        item_type: item.item_type,
        folder_id: item.folder_id(),
        folder: item.folder.map(|f| FolderSummary {
            id: f.id,
            name: f.name,
            kind: f.kind,
        }),
        title: item.title,
        content: item.content,
        url: item.url,
        is_starred: item.is_starred,
        is_draft: item.is_draft,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

pub(crate) fn item_responses(items: Vec<ItemRow>) -> Vec<ItemResponse> {
    items.into_iter().map(item_response).collect()
}

// -- Handlers --

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ItemListQuery>,
) -> ApiResult<Success<Vec<ItemResponse>>> {
    let item_type = parse_item_type(query.item_type.as_deref())?;
    let items = blocking(&state, move |s| {
        list_public_items(
            &s.db,
            claims.sub,
            item_type,
            query.folder_id,
            query.include_unfiled,
            query.include_draft,
        )
    })
    .await?;
    Ok(Success(item_responses(items)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreateItemRequest>,
) -> ApiResult<(StatusCode, Success<ItemResponse>)> {
    let item = blocking(&state, move |s| create_item(&s.db, claims.sub, req)).await?;
    Ok((StatusCode::CREATED, Success(item_response(item))))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Success<ItemResponse>> {
    let item = blocking(&state, move |s| get_public_item(&s.db, &s.private, claims.sub, item_id)).await?;
    Ok(Success(item_response(item)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateItemRequest>,
) -> ApiResult<Success<ItemResponse>> {
    let item = blocking(&state, move |s| update_item(&s.db, &s.private, claims.sub, item_id, req)).await?;
    Ok(Success(item_response(item)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    blocking(&state, move |s| delete_item(&s.db, &s.private, claims.sub, item_id)).await?;
    Ok(done())
}

pub async fn list_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PrivateItemListQuery>,
) -> ApiResult<Success<Vec<ItemResponse>>> {
    let item_type = parse_item_type(query.item_type.as_deref())?;
    let items = blocking(&state, move |s| list_private_items(&s.db, claims.sub, item_type)).await?;
    Ok(Success(item_responses(items)))
}

pub async fn create_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreatePrivateItemRequest>,
) -> ApiResult<(StatusCode, Success<ItemResponse>)> {
    let item = blocking(&state, move |s| create_private_item(&s.db, claims.sub, req)).await?;
    Ok((StatusCode::CREATED, Success(item_response(item))))
}

pub async fn get_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Success<ItemResponse>> {
    let item = blocking(&state, move |s| get_private_item(&s.db, claims.sub, item_id)).await?;
    Ok(Success(item_response(item)))
}

pub async fn update_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdatePrivateItemRequest>,
) -> ApiResult<Success<ItemResponse>> {
    let item = blocking(&state, move |s| update_private_item(&s.db, claims.sub, item_id, req)).await?;
    Ok(Success(item_response(item)))
}

pub async fn delete_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    blocking(&state, move |s| delete_private_item(&s.db, claims.sub, item_id)).await?;
    Ok(done())
}
