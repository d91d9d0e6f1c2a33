use crate::{
    oauth::{Client, OAuthError, RevokeRequest, TokenRequest, TokenResponse},
    state::AppState,
};
use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};

const PASSWORD_GRANT: &str = "password";

/// Client id and secret from `Authorization: Basic` or, failing that, the form
fn client_credentials(
    headers: &HeaderMap,
    form_id: Option<&str>,
    form_secret: Option<&str>,
) -> Result<Option<(String, String)>, OAuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| OAuthError::invalid_client())?;
        let basic = value
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"));
        if let Some((_, encoded)) = basic {
            let decoded = STANDARD
                .decode(encoded.trim())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .ok_or_else(OAuthError::invalid_client)?;
            let (id, secret) = decoded
                .split_once(':')
                .ok_or_else(OAuthError::invalid_client)?;
            return Ok(Some((id.to_string(), secret.to_string())));
        }
    }

    match form_id.filter(|id| !id.is_empty()) {
        Some(id) => Ok(Some((id.to_string(), form_secret.unwrap_or_default().to_string()))),
        None => Ok(None),
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, OAuthError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::invalid_request(&format!("Missing {name} parameter")))
}

/// OAuth2 token endpoint, password grant only
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<impl IntoResponse, OAuthError> {
    let Form(request) =
        form.map_err(|_| OAuthError::invalid_request("Malformed token request"))?;

    if request.grant_type.is_empty() {
        return Err(OAuthError::invalid_request("Missing grant_type parameter"));
    }
    if request.grant_type != PASSWORD_GRANT {
        return Err(OAuthError::unsupported_grant_type());
    }

    let server = &state.grant_server;
    let client: Option<&Client> = match client_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )? {
        Some((id, secret)) => Some(server.find_client(&id, &secret)?),
        None => None,
    };

    let username = required(request.username.as_deref(), "username")?;
    let password = required(request.password.as_deref(), "password")?;

    let token = server.password_grant(username, password, client).await?;
    let expires_in = (token.info.expires_at - token.info.issued_at).num_seconds();

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(TokenResponse {
            access_token: token.value,
            token_type: "Bearer".to_string(),
            expires_in,
        }),
    ))
}

/// Token revocation. Always 200 for an authenticated client, whether or not
/// the token existed.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<RevokeRequest>, FormRejection>,
) -> Result<StatusCode, OAuthError> {
    let Form(request) =
        form.map_err(|_| OAuthError::invalid_request("Malformed revocation request"))?;

    let server = &state.grant_server;
    let (id, secret) = client_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?
    .ok_or_else(OAuthError::invalid_client)?;
    let client = server.find_client(&id, &secret)?;

    if request.token.is_empty() {
        return Err(OAuthError::invalid_request("Missing token parameter"));
    }

    // A client may only revoke its own tokens; tokens granted without a client
    // can be revoked by any registered one.
    match server.validate_token(&request.token) {
        Ok(info) if info.client_id.as_deref().is_some_and(|owner| owner != client.id) => {
            tracing::warn!(client_id = %client.id, "Refused to revoke another client's token");
        }
        _ => {
            server.revoke(&request.token);
        }
    }

    Ok(StatusCode::OK)
}
