use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ProfileResponse, RegisterRequest, TokenRequest, TokenResponse, UpdateProfileRequest,
        },
        extractors::CurrentUser,
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        repo::User,
        token,
    },
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(register))
        .route("/user/token", post(create_token))
        .route("/user/me", get(get_me).put(update_me).patch(update_me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim and lower-case the domain part; the local part keeps its casing.
fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), (StatusCode, String)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::BAD_REQUEST, "Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let user = User::create(&state.db, &payload.email, &hash, &payload.name)
        .await
        .map_err(|e| {
            error!(error = %e, "create user failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            email: user.email,
            name: user.name,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    Json(mut payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    payload.email = normalize_email(&payload.email);

    // One generic rejection for every failure mode; nothing leaks which
    // of email/password was wrong.
    let rejected = (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) if u.is_active => u,
        Ok(_) => {
            warn!(email = %payload.email, "login unknown or inactive user");
            return Err(rejected);
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(rejected);
    }

    let token = token::get_or_create(&state.db, user.id).await.map_err(|e| {
        error!(error = %e, "token issue failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        email: user.email,
        name: user.name,
    })
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let password_hash = match payload.password.as_deref() {
        Some(plain) if plain.len() < MIN_PASSWORD_LEN => {
            warn!(user_id = %user.id, "password too short");
            return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
        }
        Some(plain) => Some(hash_password(plain).map_err(|e| {
            error!(error = %e, "hash_password failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?),
        None => None,
    };

    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.name.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %user.id, "profile update failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(ProfileResponse {
        email: updated.email,
        name: updated.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
    }

    #[test]
    fn rejects_bad_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn normalize_lowercases_domain_only() {
        let cases = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("Test3@EXAMPLE.COM", "Test3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_email(raw), expected);
        }
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_email(" test@EXAMPLE.com "), "test@example.com");
    }

    #[test]
    fn profile_response_has_no_password_field() {
        let response = ProfileResponse {
            email: "test@example.com".into(),
            name: "Test Name".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.to_lowercase().contains("password"));
    }
}
