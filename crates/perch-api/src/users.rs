use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use perch_types::api::{Claims, UserDetailResponse};

use crate::auth::{AppState, store_error_status, with_store};
use crate::convert;

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let rows = with_store(&state, |s| s.users())
        .await?
        .map_err(store_error_status)?;

    Ok(Json(
        rows.into_iter().map(convert::user).collect::<Vec<_>>(),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let found = with_store(&state, move |s| {
        let Some(user) = s.user(id)? else {
            return Ok(None);
        };
        let messages = s.messages_for_user(id)?;
        Ok(Some((user, messages)))
    })
    .await?
    .map_err(store_error_status)?;

    let (user, messages) = found.ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(UserDetailResponse {
        user: convert::user(user),
        messages: messages.into_iter().map(convert::message).collect(),
    }))
}

/// Users `{id}` follows. Auth-gated: the router only reaches this through
/// [`crate::middleware::require_auth`].
pub async fn following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = with_store(&state, move |s| {
        if s.user(id)?.is_none() {
            return Ok(None);
        }
        s.following(id).map(Some)
    })
    .await?
    .map_err(store_error_status)?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(
        rows.into_iter().map(convert::user).collect::<Vec<_>>(),
    ))
}

/// Users following `{id}`: the same edge set read from the other side.
pub async fn followers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = with_store(&state, move |s| {
        if s.user(id)?.is_none() {
            return Ok(None);
        }
        s.followers(id).map(Some)
    })
    .await?
    .map_err(store_error_status)?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(
        rows.into_iter().map(convert::user).collect::<Vec<_>>(),
    ))
}

/// Current user follows `{id}`. A repeat follow violates the edge's
/// primary key and maps to 409.
pub async fn follow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let follower = claims.sub;
    let created = with_store(&state, move |s| {
        if s.user(id)?.is_none() {
            return Ok(None);
        }
        s.follow(follower, id)?;
        Ok(Some(()))
    })
    .await?;

    match created {
        Ok(Some(())) => Ok(StatusCode::NO_CONTENT),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(err) => Err(store_error_status(err)),
    }
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let follower = claims.sub;
    let removed = with_store(&state, move |s| s.unfollow(follower, id))
        .await?
        .map_err(store_error_status)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// Messages `{id}` has liked.
pub async fn likes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = with_store(&state, move |s| {
        if s.user(id)?.is_none() {
            return Ok(None);
        }
        s.liked_messages(id).map(Some)
    })
    .await?
    .map_err(store_error_status)?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(
        rows.into_iter().map(convert::message).collect::<Vec<_>>(),
    ))
}

/// Account deletion, self-service only. The store cascades messages, both
/// directions of follow edges, and likes.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    if claims.sub != id {
        return Err(StatusCode::FORBIDDEN);
    }

    let existed = with_store(&state, move |s| s.delete_user(id))
        .await?
        .map_err(store_error_status)?;

    if existed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
