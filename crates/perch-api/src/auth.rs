use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;

use perch_db::{Database, NewUser, Session, StoreError};
use perch_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Run one store unit of work off the async runtime. The transaction
/// commits when the closure returns Ok and rolls back when it returns Err;
/// the outer error is a failed join, which no handler can do anything
/// about beyond a 500.
pub(crate) async fn with_store<T: Send + 'static>(
    state: &AppState,
    f: impl FnOnce(&Session<'_>) -> Result<T, StoreError> + Send + 'static,
) -> Result<Result<T, StoreError>, StatusCode> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || state.db.with_session(f))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Integrity violations become 409; everything else from the store is a
/// 500. Absent rows never reach this: lookups return `Option` and the
/// handlers map None to 404 themselves.
pub(crate) fn store_error_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::Integrity { .. } => StatusCode::CONFLICT,
        err => {
            error!("store error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Hash up front; the store never sees the plaintext.
    let new = NewUser::signup(
        &req.username,
        &req.email,
        &req.password,
        req.image_url.as_deref(),
    )
    .map_err(|e| {
        error!("password hashing failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    // Duplicate username or email surfaces as an integrity violation at
    // commit; the session has already rolled back by the time we map it.
    let user = with_store(&state, move |s| s.create_user(&new))
        .await?
        .map_err(store_error_status)?;

    let token = create_token(&state.jwt_secret, user.id, &user.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Unknown username and wrong password are the same negative outcome
    // from the store, never an error.
    let user = with_store(&state, move |s| {
        s.authenticate(&req.username, &req.password)
    })
    .await?
    .map_err(store_error_status)?
    .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = create_token(&state.jwt_secret, user.id, &user.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
    }))
}

fn create_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
