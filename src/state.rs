use crate::{
    auth::{AccessTokenIssuer, Authenticator, CredentialVerifier},
    db::{Database, InMemoryUserRepository, PostgrestUserRepository, UserRepository},
    models::User,
    oauth::GrantServer,
    utils::Config,
};
use std::sync::Arc;
use tracing::info;

/// Everything a handler or gate needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserRepository>,
    pub authenticator: Arc<Authenticator>,
    pub issuer: Arc<AccessTokenIssuer>,
    pub grant_server: Arc<GrantServer>,
}

impl AppState {
    /// Wire up the token services around an existing repository
    pub fn new(config: Arc<Config>, users: Arc<dyn UserRepository>) -> anyhow::Result<Self> {
        let verifier = CredentialVerifier::new(config.password)?;
        let authenticator = Arc::new(Authenticator::new(users.clone(), verifier)?);
        let issuer = Arc::new(AccessTokenIssuer::new(&config.jwt)?);
        let grant_server = Arc::new(GrantServer::new(&config.oauth, authenticator.clone())?);

        Ok(Self {
            config,
            users,
            authenticator,
            issuer,
            grant_server,
        })
    }

    /// Pick the repository from config: PostgREST when a database is
    /// configured, otherwise in memory with `SEED_USERS` loaded.
    pub async fn build(config: Arc<Config>) -> anyhow::Result<Self> {
        let users: Arc<dyn UserRepository> = match &config.database {
            Some(database) => {
                info!(url = %database.supabase_url, "Using PostgREST user repository");
                Arc::new(PostgrestUserRepository::new(Database::new(database)))
            }
            None => {
                info!("No database configured, using in-memory user repository");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let state = Self::new(config, users)?;
        if state.config.database.is_none() {
            state.seed_users().await?;
        }
        Ok(state)
    }

    async fn seed_users(&self) -> anyhow::Result<()> {
        for seed in &self.config.seed_users {
            let hash = self
                .authenticator
                .verifier()
                .hash_blocking(seed.password.clone())
                .await?;
            self.users.store(User::new(seed.username.clone(), hash)).await?;
            info!(username = %seed.username, "Seeded user");
        }
        Ok(())
    }
}
