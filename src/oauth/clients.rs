use crate::{
    auth::{AuthError, AuthResult},
    utils::config::ClientConfig,
};
use std::collections::HashMap;

/// A registered OAuth2 client
#[derive(Clone)]
pub struct Client {
    pub id: String,
    pub secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Client registry, filled once from configuration and read-only afterwards
#[derive(Debug, Default)]
pub struct ClientStore {
    clients: HashMap<String, Client>,
}

impl ClientStore {
    pub fn new(configs: &[ClientConfig]) -> Self {
        let clients = configs
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    Client {
                        id: c.id.clone(),
                        secret: c.secret.clone(),
                        redirect_uri: c.redirect_uri.clone(),
                    },
                )
            })
            .collect();
        Self { clients }
    }

    /// Exact match on both id and secret
    pub fn find(&self, id: &str, secret: &str) -> AuthResult<&Client> {
        self.clients
            .get(id)
            .filter(|client| client.secret == secret)
            .ok_or(AuthError::InvalidClient)
    }
}
