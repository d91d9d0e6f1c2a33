//! Route groups and how they are put together.
//!
//! Every group is bound to exactly one `GuardPolicy`. The same handler may
//! appear in several groups, each time behind that group's gate.

use crate::{
    auth::{
        guard_middleware, Gate, GuardPolicy, OpaqueTokenGate, RouteGuard, SignedTokenGate,
        SkipRule,
    },
    handlers::{auth as auth_handlers, oauth as oauth_handlers, users},
    middleware::{
        cors_layer, health_check, index, propagate_request_id_layer, request_id_layer,
        timeout_layer, trace_layer,
    },
    state::AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

pub const TOKEN_PATH: &str = "/api/v1/users/token";

/// A set of routes sharing one authentication policy
pub struct RouteGroup {
    name: &'static str,
    policy: GuardPolicy,
    skip: SkipRule,
    router: Router<AppState>,
}

impl RouteGroup {
    pub fn new(name: &'static str, policy: GuardPolicy, router: Router<AppState>) -> Self {
        Self {
            name,
            policy,
            skip: SkipRule::none(),
            router,
        }
    }

    /// Paths inside this group that bypass its gate
    pub fn skip(mut self, skip: SkipRule) -> Self {
        self.skip = skip;
        self
    }
}

fn gate_for(policy: GuardPolicy, state: &AppState) -> Option<Arc<dyn Gate>> {
    match policy {
        GuardPolicy::None => None,
        GuardPolicy::SignedTokenRequired => {
            Some(Arc::new(SignedTokenGate::new(state.issuer.clone())))
        }
        GuardPolicy::OpaqueTokenRequired => {
            Some(Arc::new(OpaqueTokenGate::new(state.grant_server.clone())))
        }
    }
}

/// Merge groups into one router, each behind its own gate.
///
/// The gate is a route layer, so unknown paths still get 404 rather than 401.
pub fn compose(state: &AppState, groups: Vec<RouteGroup>) -> Router<AppState> {
    groups.into_iter().fold(Router::new(), |app, group| {
        let router = match gate_for(group.policy, state) {
            Some(gate) => {
                let guard = Arc::new(RouteGuard::new(group.name, Some(gate), group.skip));
                group
                    .router
                    .route_layer(from_fn_with_state(guard, guard_middleware))
            }
            None => group.router,
        };
        tracing::debug!(group = group.name, policy = ?group.policy, "Mounted route group");
        app.merge(router)
    })
}

/// The groups this service exposes
pub fn route_groups() -> Vec<RouteGroup> {
    let public = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/oauth/token", post(oauth_handlers::token))
        .route("/oauth/revoke", post(oauth_handlers::revoke));

    let api_v1 = Router::new()
        .route(TOKEN_PATH, post(auth_handlers::request_token))
        .route(
            "/api/v1/users",
            get(users::fetch_users)
                .post(users::store_user)
                .put(users::update_user),
        )
        .route(
            "/api/v1/users/:id",
            get(users::get_user_by_id).delete(users::delete_user),
        )
        .route("/api/v1/me", get(auth_handlers::me));

    let api_oauth = Router::new()
        .route("/api/oauth/users", get(users::fetch_users))
        .route("/api/oauth/users/:id", get(users::get_user_by_id))
        .route("/api/oauth/me", get(auth_handlers::me));

    vec![
        RouteGroup::new("public", GuardPolicy::None, public),
        RouteGroup::new("api_v1", GuardPolicy::SignedTokenRequired, api_v1)
            .skip(SkipRule::paths([TOKEN_PATH])),
        RouteGroup::new("api_oauth", GuardPolicy::OpaqueTokenRequired, api_oauth),
    ]
}

/// Full application: route groups plus the outer middleware stack
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    compose(&state, route_groups())
        .layer(
            ServiceBuilder::new()
                // Request ID, set before the trace span is opened
                .layer(request_id_layer())
                // Request tracing
                .layer(trace_layer())
                .layer(propagate_request_id_layer())
                // CORS
                .layer(cors_layer(&config))
                // Request deadline
                .layer(timeout_layer(&config)),
        )
        .with_state(state)
}
