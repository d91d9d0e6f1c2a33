//! OAuth2 password grant with opaque bearer tokens.
//!
//! Independent of the signed access tokens in `crate::auth::jwt`: its own
//! client registry, its own token store, its own gate.

pub mod clients;
pub mod models;
pub mod server;
pub mod store;

pub use clients::{Client, ClientStore};
pub use models::{OAuthError, RevokeRequest, TokenRequest, TokenResponse};
pub use server::GrantServer;
pub use store::{spawn_sweeper, OpaqueToken, TokenInfo, TokenStore};
