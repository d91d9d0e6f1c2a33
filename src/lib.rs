pub mod auth;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod routes;
pub mod state;
pub mod utils;

pub use auth::{AccessTokenIssuer, Authenticator};
pub use oauth::GrantServer;
pub use routes::create_app;
pub use state::AppState;
pub use utils::{ApiError, ApiResult, Config};
