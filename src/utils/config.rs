use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration, absent when users live in memory
    pub database: Option<DatabaseConfig>,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Password hashing cost
    pub password: PasswordConfig,
    /// OAuth2 grant server configuration
    pub oauth: OAuthConfig,
    /// Users created at startup by the in-memory repository
    #[serde(skip_serializing)]
    pub seed_users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub supabase_url: String,
    #[serde(skip_serializing)]
    pub supabase_key: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    pub validity_secs: u64,
}

// Keep the secret out of `{:?}` output, the config is logged at startup.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("validity_secs", &self.validity_secs)
            .finish()
    }
}

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub clients: Vec<ClientConfig>,
    pub token_validity_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub id: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("id", &self.id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl OAuthConfig {
    /// Never zero, `tokio::time::interval` rejects that
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?;

        let database = match env::var("SUPABASE_URL") {
            Ok(supabase_url) if !supabase_url.is_empty() => Some(DatabaseConfig {
                supabase_url,
                supabase_key: env::var("SUPABASE_SERVICE_ROLE_KEY").map_err(|_| {
                    anyhow::anyhow!("SUPABASE_SERVICE_ROLE_KEY is required with SUPABASE_URL")
                })?,
            }),
            _ => None,
        };

        let config = Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("PORT", 8080)?,
                cors_origins: env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 30)?,
                shutdown_timeout_secs: parse_var("SHUTDOWN_TIMEOUT_SECS", 10)?,
            },
            database,
            jwt: JwtConfig {
                secret,
                validity_secs: parse_var("JWT_VALIDITY_SECS", 3600)?,
            },
            password: PasswordConfig {
                memory_kib: parse_var("PASSWORD_HASH_MEMORY_KIB", argon2::Params::DEFAULT_M_COST)?,
                iterations: parse_var("PASSWORD_HASH_ITERATIONS", argon2::Params::DEFAULT_T_COST)?,
                parallelism: parse_var("PASSWORD_HASH_PARALLELISM", argon2::Params::DEFAULT_P_COST)?,
            },
            oauth: OAuthConfig {
                clients: parse_clients(&env::var("OAUTH_CLIENTS").unwrap_or_default())?,
                token_validity_secs: parse_var("OAUTH_TOKEN_VALIDITY_SECS", 7200)?,
                sweep_interval_secs: parse_var("OAUTH_SWEEP_INTERVAL_SECS", 60)?,
            },
            seed_users: parse_seed_users(&env::var("SEED_USERS").unwrap_or_default())?,
        };

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {} value", name)),
        Err(_) => Ok(default),
    }
}

/// Parse `id:secret:redirect` entries separated by commas.
/// The redirect may itself contain colons (`http://host:port/cb`).
pub fn parse_clients(raw: &str) -> anyhow::Result<Vec<ClientConfig>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(secret), redirect) if !id.is_empty() && !secret.is_empty() => {
                    Ok(ClientConfig {
                        id: id.to_string(),
                        secret: secret.to_string(),
                        redirect_uri: redirect.unwrap_or_default().to_string(),
                    })
                }
                _ => Err(anyhow::anyhow!("Invalid OAUTH_CLIENTS entry: {}", entry)),
            }
        })
        .collect()
}

/// Parse `username:password` entries separated by commas
pub fn parse_seed_users(raw: &str) -> anyhow::Result<Vec<SeedUser>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((username, password)) if !username.is_empty() && !password.is_empty() => {
                Ok(SeedUser {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => Err(anyhow::anyhow!("Invalid SEED_USERS entry")),
        })
        .collect()
}
