use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use shared::{AuthResponse, LoginRequest, RegisterRequest, Volunteer, SESSION_COOKIE_NAME};

use crate::{config::AuthConfig, db::StoreError, error::AppError, state::AppState};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // volunteer id
    pub exp: usize,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    let volunteer = state
        .db
        .create_volunteer(&email, &name, &password_hash)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => {
                AppError::Validation("Email already registered".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!("Registered volunteer {} ({}), awaiting approval", volunteer.id, email);
    session_response(jar, &volunteer, &state.config.auth)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let invalid = || AppError::Unauthenticated("Invalid email or password".to_string());

    let volunteer = state
        .db
        .get_volunteer_by_email(&req.email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid)?;
    let stored_hash = state
        .db
        .get_password_hash(&volunteer.id)
        .await?
        .ok_or_else(invalid)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&stored_hash).map_err(|e| AppError::Internal(e.to_string()))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    state.db.touch_last_seen(&volunteer.id).await?;

    session_response(jar, &volunteer, &state.config.auth)
}

fn session_response(
    jar: CookieJar,
    volunteer: &Volunteer,
    auth_config: &AuthConfig,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let token = generate_token(&volunteer.id, auth_config)?;
    let cookie = Cookie::build((SESSION_COOKIE_NAME, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            token,
            user_id: volunteer.id.clone(),
            approved: volunteer.approved,
            is_admin: volunteer.is_admin,
        }),
    ))
}

pub fn generate_token(volunteer_id: &str, auth_config: &AuthConfig) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(auth_config.token_expiry_hours as i64))
        .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: volunteer_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth_config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        AppError::Unauthenticated("Unauthorized - Invalid session".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_expiry_hours: 1,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = generate_token("vol-1", &auth_config("secret")).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "vol-1");
    }

    #[test]
    fn test_token_with_wrong_secret_is_unauthenticated() {
        let token = generate_token("vol-1", &auth_config("secret")).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            verify_token("garbage", "secret"),
            Err(AppError::Unauthenticated(_))
        ));
    }
}
