use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use perch_db::{MessageRow, NewMessage, models::MAX_MESSAGE_LEN};
use perch_types::api::{Claims, MessageResponse, NewMessageRequest};

use crate::auth::{AppState, store_error_status, with_store};
use crate::convert;

fn message_response(row: MessageRow, like_count: i64, liked_by: Vec<i64>) -> MessageResponse {
    MessageResponse {
        id: row.id,
        text: row.text,
        user_id: row.user_id,
        created_at: convert::parse_timestamp(&row.created_at),
        like_count,
        liked_by,
    }
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Length checks here; the schema CHECK is the backstop.
    if req.text.is_empty() || req.text.chars().count() > MAX_MESSAGE_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let new = NewMessage::new(&req.text, claims.sub);
    let row = with_store(&state, move |s| s.create_message(&new))
        .await?
        .map_err(store_error_status)?;

    Ok((
        StatusCode::CREATED,
        Json(message_response(row, 0, vec![])),
    ))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let found = with_store(&state, move |s| {
        let Some(row) = s.message(id)? else {
            return Ok(None);
        };
        let count = s.like_count(id)?;
        let likers = s.likers(id)?;
        Ok(Some((row, count, likers)))
    })
    .await?
    .map_err(store_error_status)?;

    let (row, count, likers) = found.ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(message_response(row, count, likers)))
}

/// Delete a message, owner only. Like edges on it cascade.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let author = claims.sub;
    // None: no such message. Some(false): exists, not the caller's.
    let deleted = with_store(&state, move |s| {
        let Some(row) = s.message(id)? else {
            return Ok(None);
        };
        if row.user_id != author {
            return Ok(Some(false));
        }
        s.delete_message(id)?;
        Ok(Some(true))
    })
    .await?
    .map_err(store_error_status)?;

    match deleted {
        Some(true) => Ok(StatusCode::NO_CONTENT),
        Some(false) => Err(StatusCode::FORBIDDEN),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Toggle the caller's like on a message. Responds with whether the
/// message is liked after the call.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = claims.sub;
    let liked = with_store(&state, move |s| {
        if s.message(id)?.is_none() {
            return Ok(None);
        }
        s.toggle_like(user, id).map(Some)
    })
    .await?
    .map_err(store_error_status)?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(serde_json::json!({ "liked": liked })))
}
