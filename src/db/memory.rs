use super::{RepositoryError, RepositoryResult, UserRepository};
use crate::models::{User, UserChanges};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

/// Process-local user table
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn fetch(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<User>> {
        Ok(self.users.read().iter().skip(offset).take(limit).cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn store(&self, user: User) -> RepositoryResult<User> {
        let mut users = self.users.write();
        if users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict(format!(
                "The username {} is already exist.",
                user.username
            )));
        }
        if users.iter().any(|u| u.id == user.id) {
            return Err(RepositoryError::Conflict(format!("The id {} is already exist.", user.id)));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, changes: UserChanges) -> RepositoryResult<User> {
        let mut users = self.users.write();
        if users
            .iter()
            .any(|u| u.username == changes.username && u.id != changes.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "The username {} is already exist.",
                changes.username
            )));
        }

        let user = users
            .iter_mut()
            .find(|u| u.id == changes.id)
            .ok_or(RepositoryError::NotFound)?;
        user.username = changes.username;
        if let Some(password) = changes.password {
            user.password = password;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        let mut users = self.users.write();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
