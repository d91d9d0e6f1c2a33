//! User persistence.
//!
//! Everything above this module talks to `dyn UserRepository`. The in-memory
//! backend is the default; the PostgREST backend is used when a Supabase URL
//! is configured.

pub mod memory;
pub mod postgrest;

use crate::models::{User, UserChanges};
use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::InMemoryUserRepository;
pub use self::postgrest::{Database, PostgrestUserRepository};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Page through users in creation order
    async fn fetch(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<User>>;

    async fn find_by_id(&self, id: &str) -> RepositoryResult<User>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<User>;

    /// Insert a new user; usernames are unique
    async fn store(&self, user: User) -> RepositoryResult<User>;

    async fn update(&self, changes: UserChanges) -> RepositoryResult<User>;

    async fn delete(&self, id: &str) -> RepositoryResult<()>;
}
