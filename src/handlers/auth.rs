use crate::{
    auth::Identity,
    models::{AccessTokenData, Envelope, Profile, TokenRequest},
    state::AppState,
    utils::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use validator::Validate;

/// Exchange username and password for a signed access token
pub async fn request_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<AccessTokenData>>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "Unreadable token request");
        ApiError::bad_request("Bad Request")
    })?;
    request.validate()?;

    let user = state
        .authenticator
        .authenticate(&request.username, &request.password)
        .await?;

    let (access_token, expires_at) = state.issuer.issue(&user.id, &user.username)?;
    tracing::info!(user_id = %user.id, exp = %expires_at, "Issued signed access token");

    Ok(Json(Envelope::ok(AccessTokenData {
        access_token,
        exp: expires_at.timestamp(),
    })))
}

/// Current caller, whichever scheme admitted them
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Envelope<Profile>>> {
    let user = state.users.find_by_id(identity.user_id()).await?;

    Ok(Json(Envelope::ok(Profile {
        user,
        auth: identity,
    })))
}
