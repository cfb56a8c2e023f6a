//! Identity and authorization gate.
//!
//! [`Caller`] resolves who is calling from the session token. [`Gate`]
//! re-reads that volunteer's record on every privileged call, so approval and
//! admin status are never taken from the client.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::{Volunteer, SESSION_COOKIE_NAME};

use crate::{db::Database, error::AppError, routes::auth::verify_token, state::AppState};

/// Authenticated caller identity.
#[derive(Debug, Clone)]
pub struct Caller {
    pub volunteer_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let token = match bearer {
            Some(token) => token,
            None => CookieJar::from_headers(&parts.headers)
                .get(SESSION_COOKIE_NAME)
                .map(|cookie| cookie.value().to_string())
                .ok_or_else(|| {
                    AppError::Unauthenticated("Unauthorized - Please sign in".to_string())
                })?,
        };

        let claims = verify_token(&token, &state.config.auth.jwt_secret)?;
        Ok(Caller {
            volunteer_id: claims.sub,
        })
    }
}

#[derive(Clone)]
pub struct Gate {
    db: Database,
}

impl Gate {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The caller's record, provided it exists and is approved.
    pub async fn approved(&self, volunteer_id: &str) -> Result<Volunteer, AppError> {
        match self.db.get_volunteer(volunteer_id).await? {
            Some(v) if v.approved => Ok(v),
            _ => Err(AppError::Forbidden("Forbidden - Volunteer approval required".to_string())),
        }
    }

    /// The caller's record, provided it is an approved admin.
    pub async fn admin(&self, volunteer_id: &str) -> Result<Volunteer, AppError> {
        match self.db.get_volunteer(volunteer_id).await? {
            Some(v) if v.is_approved_admin() => Ok(v),
            _ => Err(AppError::Forbidden("Forbidden - Admin privileges required".to_string())),
        }
    }
}
