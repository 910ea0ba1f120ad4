use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{FolderKind, ItemType};

// -- JWT Claims --

/// Identity token claims issued after a successful code verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

/// Distinguishes an absent field (outer `None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies. Use with `#[serde(default)]`.
fn explicit_null<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub access_token: String,
}

// -- Private partition --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupPinRequest {
    pub pin: String,
    pub confirm: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnlockRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChangePinRequest {
    pub old_pin: String,
    pub new_pin: String,
    pub confirm_new_pin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateStatus {
    pub has_password: bool,
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

// -- Folders --

/// `kind` stays a string so a bad value surfaces as a validation error
/// rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct FolderListQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFolderRequest {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateFolderRequest {
    pub name: Option<String>,
    pub is_starred: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    pub id: Uuid,
    pub kind: FolderKind,
    pub name: String,
    pub is_private: bool,
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The folder an item sits in, as embedded in item responses.
#[derive(Debug, Clone, Serialize)]
pub struct FolderSummary {
    pub id: Uuid,
    pub name: String,
    pub kind: FolderKind,
}

// -- Items --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemListQuery {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub include_unfiled: bool,
    #[serde(default)]
    pub include_draft: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrivateItemListQuery {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default, deserialize_with = "explicit_null")]
    pub title: Option<Option<String>>,
    pub content: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub folder_id: Option<Option<Uuid>>,
    pub is_starred: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePrivateItemRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdatePrivateItemRequest {
    #[serde(default, deserialize_with = "explicit_null")]
    pub title: Option<Option<String>>,
    pub content: Option<String>,
    pub is_starred: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub folder_id: Option<Uuid>,
    pub folder: Option<FolderSummary>,
    pub is_starred: bool,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Search --

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
}
