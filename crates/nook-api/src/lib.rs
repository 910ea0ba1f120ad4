pub mod activity;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod folders;
pub mod items;
pub mod middleware;
pub mod pin;
pub mod private;
pub mod routes;
pub mod search;
pub mod sessions;
pub mod state;
pub mod sweep;

pub use config::Config;
pub use error::{ApiResult, AppError};
pub use routes::router;
pub use state::{AppState, AppStateInner};
