use super::{RepositoryError, RepositoryResult, UserRepository};
use crate::{
    models::{User, UserChanges},
    utils::config::DatabaseConfig,
};
use async_trait::async_trait;
use chrono::Utc;
use postgrest::Postgrest;
use serde_json::json;

const USERS: &str = "users";

/// Database client wrapper for Supabase PostgreSQL
#[derive(Clone)]
pub struct Database {
    client: Postgrest,
}

impl Database {
    /// Create a new database client
    pub fn new(config: &DatabaseConfig) -> Self {
        let client = Postgrest::new(format!("{}/rest/v1", config.supabase_url.trim_end_matches('/')))
            .insert_header("apikey", &config.supabase_key)
            .insert_header("Authorization", format!("Bearer {}", config.supabase_key));

        Self { client }
    }

    /// Get a reference to the PostgREST client
    pub fn client(&self) -> &Postgrest {
        &self.client
    }
}

/// `UserRepository` over the `users` table
#[derive(Clone)]
pub struct PostgrestUserRepository {
    db: Database,
}

impl PostgrestUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn rows(status: u16, body: &str) -> RepositoryResult<Vec<User>> {
        if status == 409 {
            return Err(RepositoryError::Conflict("The username is already exist.".to_string()));
        }
        if !(200..300).contains(&status) {
            return Err(RepositoryError::Backend(format!("{status}: {body}")));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(body).map_err(backend)
    }

    fn one(status: u16, body: &str) -> RepositoryResult<User> {
        Self::rows(status, body)?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
    }
}

/// Run a request, returning status and body
async fn send(builder: postgrest::Builder) -> RepositoryResult<(u16, String)> {
    let response = builder.execute().await.map_err(backend)?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(backend)?;
    Ok((status, body))
}

fn backend(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

#[async_trait]
impl UserRepository for PostgrestUserRepository {
    async fn fetch(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<User>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        // Inclusive end row; a window past `usize::MAX` just runs to the end.
        let last = offset.saturating_add(limit - 1);
        let (status, body) = send(
            self.db
                .client()
                .from(USERS)
                .select("*")
                .order("created_at.asc")
                .range(offset, last),
        )
        .await?;
        Self::rows(status, &body)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<User> {
        let (status, body) = send(
            self.db
                .client()
                .from(USERS)
                .select("*")
                .eq("id", id),
        )
        .await?;
        Self::one(status, &body)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<User> {
        let (status, body) = send(
            self.db
                .client()
                .from(USERS)
                .select("*")
                .eq("username", username),
        )
        .await?;
        Self::one(status, &body)
    }

    async fn store(&self, user: User) -> RepositoryResult<User> {
        let row = json!({
            "id": user.id,
            "username": user.username,
            "password": user.password,
            "created_at": user.created_at,
            "updated_at": user.updated_at,
        });
        let (status, body) = send(
            self.db
                .client()
                .from(USERS)
                .insert(row.to_string()),
        )
        .await?;
        // Representation may be suppressed by the server; fall back to what we sent.
        Ok(Self::rows(status, &body)?.into_iter().next().unwrap_or(user))
    }

    async fn update(&self, changes: UserChanges) -> RepositoryResult<User> {
        let mut row = json!({
            "username": changes.username,
            "updated_at": Utc::now(),
        });
        if let Some(password) = &changes.password {
            row["password"] = json!(password);
        }
        let (status, body) = send(
            self.db
                .client()
                .from(USERS)
                .eq("id", &changes.id)
                .update(row.to_string()),
        )
        .await?;
        Self::one(status, &body)
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        let (status, body) = send(
            self.db
                .client()
                .from(USERS)
                .eq("id", id)
                .delete(),
        )
        .await?;
        Self::one(status, &body).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn repo() -> (mockito::ServerGuard, PostgrestUserRepository) {
        let server = mockito::Server::new_async().await;
        let db = Database::new(&DatabaseConfig {
            supabase_url: server.url(),
            supabase_key: "test-service-key".to_string(),
        });
        (server, PostgrestUserRepository::new(db))
    }

    fn row(id: &str, username: &str) -> serde_json::Value {
        json!({
            "id": id,
            "username": username,
            "password": "$argon2id$stub",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        })
    }

    #[tokio::test]
    async fn find_by_username_reads_password_hash() {
        let (mut server, repo) = repo().await;
        let mock = server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("username".into(), "eq.alice".into()),
            ]))
            .match_header("apikey", "test-service-key")
            .with_status(200)
            .with_body(json!([row("u1", "alice")]).to_string())
            .create_async()
            .await;

        let user = repo.find_by_username("alice").await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.password, "$argon2id$stub");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_result_is_not_found() {
        let (mut server, repo) = repo().await;
        server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert_eq!(repo.find_by_id("missing").await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn server_error_is_backend_failure() {
        let (mut server, repo) = repo().await;
        server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        assert!(matches!(repo.find_by_username("alice").await, Err(RepositoryError::Backend(_))));
    }

    #[tokio::test]
    async fn huge_page_window_saturates() {
        let (mut server, repo) = repo().await;
        let mock = server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::Any)
            .match_header("range", format!("1-{}", usize::MAX).as_str())
            .with_status(200)
            .with_body(json!([row("u2", "bob")]).to_string())
            .create_async()
            .await;

        let users = repo.fetch(usize::MAX, 1).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bob");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unique_violation_is_conflict() {
        let (mut server, repo) = repo().await;
        server
            .mock("POST", "/rest/v1/users")
            .with_status(409)
            .with_body(r#"{"code":"23505"}"#)
            .create_async()
            .await;

        let result = repo.store(User::new("alice", "hash")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}
