use axum::{
    Json, Router, middleware,
    routing::{get, post},
};

use crate::middleware::{require_auth, require_unlocked};
use crate::state::AppState;
use crate::{auth, folders, items, private, search};

/// The full HTTP surface. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/request-code", post(auth::request_code))
        .route("/auth/verify-code", post(auth::verify));

    let unlocked_routes = Router::new()
        .route("/private/folders/list", get(folders::list_private))
        .route("/private/folders/{id}", get(folders::get_private))
        .route("/private/items/list", get(items::list_private))
        .route("/private/items", post(items::create_private))
        .route(
            "/private/items/{id}",
            get(items::get_private)
                .patch(items::update_private)
                .delete(items::delete_private),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_unlocked));

    let protected_routes = Router::new()
        .route("/private/status", get(private::get_status))
        .route("/private/setup", post(private::setup))
        .route("/private/unlock", post(private::unlock))
        .route("/private/lock", post(private::lock))
        .route("/private/change-pin", post(private::change_pin))
        .route("/folders/list", get(folders::list_folders))
        .route("/folders", post(folders::create))
        .route(
            "/folders/{id}",
            get(folders::get_folder)
                .patch(folders::update)
                .delete(folders::delete),
        )
        .route("/items/list", get(items::list))
        .route("/items", post(items::create))
        .route(
            "/items/{id}",
            get(items::get).patch(items::update).delete(items::delete),
        )
        .route("/search", get(search::search))
        .merge(unlocked_routes)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
