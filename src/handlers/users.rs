use crate::{
    models::{Envelope, FetchQuery, StoreRequest, UpdateRequest, User, UserChanges},
    state::AppState,
    utils::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use validator::Validate;

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(%rejection, "Unreadable request body");
        ApiError::bad_request("Bad Request")
    })
}

/// List users, `?limit=` (default 10) and `?offset=` (default 0)
pub async fn fetch_users(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let users = state.users.fetch(query.limit(), query.offset()).await?;
    Ok(Json(Envelope::ok(users)))
}

pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<User>>> {
    let user = state.users.find_by_id(&id).await?;
    Ok(Json(Envelope::ok(user)))
}

pub async fn store_user(
    State(state): State<AppState>,
    payload: Result<Json<StoreRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<()>>> {
    let request = read_body(payload)?;
    request.validate()?;

    let hash = state
        .authenticator
        .verifier()
        .hash_blocking(request.password)
        .await?;
    let user = state.users.store(User::new(request.username, hash)).await?;
    tracing::info!(user_id = %user.id, "Created user");

    Ok(Json(Envelope::message("save data success")))
}

/// Update username and, when a non-empty one is given, password
pub async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<()>>> {
    let request = read_body(payload)?;
    request.validate()?;

    state.users.find_by_id(&request.id).await?;

    let password = if request.password.is_empty() {
        None
    } else {
        Some(
            state
                .authenticator
                .verifier()
                .hash_blocking(request.password)
                .await?,
        )
    };

    let user = state
        .users
        .update(UserChanges {
            id: request.id,
            username: request.username,
            password,
        })
        .await?;
    tracing::info!(user_id = %user.id, "Updated user");

    Ok(Json(Envelope::message("update data success")))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    state.users.find_by_id(&id).await?;
    state.users.delete(&id).await?;
    tracing::info!(user_id = %id, "Deleted user");

    Ok(Json(Envelope::message("delete data success")))
}
