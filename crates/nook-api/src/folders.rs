//! Folder visibility.
//!
//! The public surface only ever sees `is_private = 0` folders, whatever the
//! caller's unlock state. [`get_public_folder_by_id`] is the lookup every
//! other public path (items, moves, deletes) goes through. The private surface
//! sits behind the unlock guard and answers every miss with the same bare
//! `Forbidden`.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use nook_db::{Database, FolderRow, Partition};
use nook_types::FolderKind;
use nook_types::api::{
    Claims, CreateFolderRequest, FolderListQuery, FolderResponse, UpdateFolderRequest,
};

use crate::error::{ApiResult, AppError, Success, done};
use crate::extract::{JsonBody, Path, Query};
use crate::state::{AppState, blocking};

const NAME_TAKEN: &str = "folder name already exists";

pub(crate) fn parse_kind(raw: &str) -> ApiResult<FolderKind> {
    Ok(raw.parse()?)
}

fn clean_name(raw: &str) -> ApiResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("folder name must not be empty"));
    }
    Ok(name.to_string())
}

pub fn list_public_folders(db: &Database, user_id: Uuid, kind: FolderKind) -> ApiResult<Vec<FolderRow>> {
    Ok(db.list_folders(user_id, Some(kind), Partition::Public)?)
}

/// The canonical public folder lookup. Private folders behave exactly like
/// missing ones.
pub fn get_public_folder_by_id(db: &Database, user_id: Uuid, folder_id: Uuid) -> ApiResult<FolderRow> {
    db.get_folder(user_id, folder_id, Partition::Public)?
        .ok_or_else(|| AppError::not_found("folder not found"))
}

pub fn list_private_folders(
    db: &Database,
    user_id: Uuid,
    kind: Option<FolderKind>,
) -> ApiResult<Vec<FolderRow>> {
    Ok(db.list_folders(user_id, kind, Partition::Private)?)
}

pub fn get_private_folder(db: &Database, user_id: Uuid, folder_id: Uuid) -> ApiResult<FolderRow> {
    db.get_folder(user_id, folder_id, Partition::Private)?
        .ok_or(AppError::Forbidden)
}

/// Creates a public folder. There is no way to create a private one here.
pub fn create_folder(db: &Database, user_id: Uuid, kind: FolderKind, name: &str) -> ApiResult<FolderRow> {
    let name = clean_name(name)?;
    if db.find_folder_by_name(user_id, kind, &name)?.is_some() {
        return Err(AppError::validation(NAME_TAKEN));
    }

    let now = Utc::now();
    let folder = FolderRow {
        id: Uuid::new_v4(),
        user_id,
        kind,
        name,
        is_private: false,
        is_starred: false,
        created_at: now,
        updated_at: now,
    };
    if !db.insert_folder(&folder)? {
        return Err(AppError::validation(NAME_TAKEN));
    }
    Ok(folder)
}

pub fn update_folder(
    db: &Database,
    user_id: Uuid,
    folder_id: Uuid,
    name: Option<&str>,
    is_starred: Option<bool>,
) -> ApiResult<FolderRow> {
    let mut folder = get_public_folder_by_id(db, user_id, folder_id)?;

    if let Some(name) = name {
        let name = clean_name(name)?;
        if name != folder.name {
            if db.find_folder_by_name(user_id, folder.kind, &name)?.is_some() {
                return Err(AppError::validation(NAME_TAKEN));
            }
            folder.name = name;
        }
    }
    if let Some(is_starred) = is_starred {
        folder.is_starred = is_starred;
    }
    folder.updated_at = Utc::now();

    if !db.update_folder(&folder)? {
        return Err(AppError::validation(NAME_TAKEN));
    }
    Ok(folder)
}

/// Deletes an empty public folder. Soft-deleted items do not count.
pub fn delete_folder(db: &Database, user_id: Uuid, folder_id: Uuid) -> ApiResult<()> {
    let folder = get_public_folder_by_id(db, user_id, folder_id)?;
    if db.count_live_items_in_folder(folder.id)? > 0 {
        return Err(AppError::validation("folder not empty"));
    }
    db.delete_folder(user_id, folder.id)?;
    info!(%user_id, folder_id = %folder.id, "Folder deleted");
    Ok(())
}

pub(crate) fn folder_response(folder: FolderRow) -> FolderResponse {
    FolderResponse {
        id: folder.id,
        kind: folder.kind,
        name: folder.name,
        is_private: folder.is_private,
        is_starred: folder.is_starred,
        created_at: folder.created_at,
        updated_at: folder.updated_at,
    }
}

fn folder_responses(folders: Vec<FolderRow>) -> Vec<FolderResponse> {
    folders.into_iter().map(folder_response).collect()
}

// -- Handlers --

pub async fn list_folders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FolderListQuery>,
) -> ApiResult<Success<Vec<FolderResponse>>> {
    let kind = query
        .kind
        .as_deref()
        .ok_or_else(|| AppError::validation("kind is required (NOTES or URLS)"))
        .and_then(parse_kind)?;
    let folders = blocking(&state, move |s| list_public_folders(&s.db, claims.sub, kind)).await?;
    Ok(Success(folder_responses(folders)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreateFolderRequest>,
) -> ApiResult<(StatusCode, Success<FolderResponse>)> {
    let kind = parse_kind(&req.kind)?;
    let folder = blocking(&state, move |s| create_folder(&s.db, claims.sub, kind, &req.name)).await?;
    Ok((StatusCode::CREATED, Success(folder_response(folder))))
}

pub async fn get_folder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(folder_id): Path<Uuid>,
) -> ApiResult<Success<FolderResponse>> {
    let folder = blocking(&state, move |s| get_public_folder_by_id(&s.db, claims.sub, folder_id)).await?;
    Ok(Success(folder_response(folder)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(folder_id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateFolderRequest>,
) -> ApiResult<Success<FolderResponse>> {
    let folder = blocking(&state, move |s| {
        update_folder(&s.db, claims.sub, folder_id, req.name.as_deref(), req.is_starred)
    })
    .await?;
    Ok(Success(folder_response(folder)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(folder_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    blocking(&state, move |s| delete_folder(&s.db, claims.sub, folder_id)).await?;
    Ok(done())
}

pub async fn list_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FolderListQuery>,
) -> ApiResult<Success<Vec<FolderResponse>>> {
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;
    let folders = blocking(&state, move |s| list_private_folders(&s.db, claims.sub, kind)).await?;
    Ok(Success(folder_responses(folders)))
}

pub async fn get_private(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(folder_id): Path<Uuid>,
) -> ApiResult<Success<FolderResponse>> {
    let folder = blocking(&state, move |s| get_private_folder(&s.db, claims.sub, folder_id)).await?;
    Ok(Success(folder_response(folder)))
}
