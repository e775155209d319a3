use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

use super::jwt::JwtKeys;
use super::password;
use super::repo::User;

/// Create a new user with a hashed password.
///
/// The `username_exists` lookup is a fast path; the unique constraint on
/// `users.username` remains authoritative under concurrent registration,
/// surfacing as [`AppError::Conflict`] through the insert.
pub async fn register(
    state: &AppState,
    username: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<User, AppError> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if password.len() < 8 {
        return Err(AppError::Validation("Password too short".into()));
    }

    if User::username_exists(&state.db, username).await? {
        warn!(username, "username already registered");
        return Err(AppError::Conflict("Username already registered".into()));
    }

    let hash = password::hash_password(password)?;
    let user = User::create(&state.db, username, &hash, full_name).await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Check credentials and record the login time.
///
/// Unknown username and wrong password are indistinguishable to the caller.
/// `last_login` is only touched after the password verifies.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = match User::find_by_username(&state.db, username).await? {
        Some(u) => u,
        None => {
            warn!(username, "login for unknown or inactive user");
            return Err(AppError::Unauthenticated);
        }
    };

    if !password::verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, username = %user.username, "login with invalid password");
        return Err(AppError::Unauthenticated);
    }

    let now = OffsetDateTime::now_utc();
    User::update_last_login(&state.db, username, now).await?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(User {
        last_login: Some(now),
        ..user
    })
}

/// Resolve a bearer token to the current user record.
///
/// The store is re-read on every call, so a deactivated account is rejected
/// even while its token is still unexpired.
pub async fn validate_token(state: &AppState, token: &str) -> Result<User, AppError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthenticated
    })?;

    User::find_by_username(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(username = %claims.sub, "token subject not found or inactive");
            AppError::Unauthenticated
        })
}
