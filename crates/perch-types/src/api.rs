use serde::{Deserialize, Serialize};

use crate::models::{Message, User};

// -- JWT Claims --

/// JWT claims shared across perch-api (token issuance in the auth handlers
/// and verification in the middleware). Canonical definition lives here in
/// perch-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    pub user: User,
    pub messages: Vec<Message>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub text: String,
    pub user_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub like_count: i64,
    pub liked_by: Vec<i64>,
}
