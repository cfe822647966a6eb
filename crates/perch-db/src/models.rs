//! Row types mapping one-to-one onto SQLite rows. The API layer assembles
//! its response models from these, which is how the password hash stays out
//! of everything serialized.

use std::fmt;

use crate::credentials;
use crate::error::StoreError;

/// Profile image applied when a signup carries no (or an empty) URL.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

/// Upper bound on message text, also enforced by a schema CHECK.
pub const MAX_MESSAGE_LEN: usize = 140;

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// PHC-format argon2 string, never the plaintext.
    pub password: String,
    pub image_url: String,
    pub created_at: String,
}

impl fmt::Display for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub user_id: i64,
    pub created_at: String,
}

impl fmt::Display for MessageRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Message {}>", self.id)
    }
}

/// A user staged for insertion. [`NewUser::signup`] hashes the password up
/// front; uniqueness is *not* checked here. The store rejects duplicates
/// when [`crate::Session::create_user`] writes the row.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Explicit id, or None to let SQLite assign the next rowid.
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    /// Already hashed when built through [`NewUser::signup`].
    pub password: String,
    /// None falls back to [`DEFAULT_IMAGE_URL`] at insert time.
    pub image_url: Option<String>,
}

impl NewUser {
    /// Stage a signup: hash the password, keep the image URL only when it
    /// is non-empty.
    pub fn signup(
        username: &str,
        email: &str,
        password: &str,
        image_url: Option<&str>,
    ) -> Result<Self, StoreError> {
        let image_url = match image_url {
            Some(url) if !url.is_empty() => Some(url.to_string()),
            _ => None,
        };
        Ok(Self {
            id: None,
            username: username.to_string(),
            email: email.to_string(),
            password: credentials::hash(password)?,
            image_url,
        })
    }

    /// Pin the row id instead of letting SQLite assign one.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// A message staged for insertion for `user_id`.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Option<i64>,
    pub text: String,
    pub user_id: i64,
}

impl NewMessage {
    pub fn new(text: &str, user_id: i64) -> Self {
        Self {
            id: None,
            text: text.to_string(),
            user_id,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_display_shows_id_username_email() {
        let user = UserRow {
            id: 7,
            username: "testuser".into(),
            email: "test@test.com".into(),
            password: "$argon2id$stub".into(),
            image_url: DEFAULT_IMAGE_URL.into(),
            created_at: "2024-01-01 00:00:00".into(),
        };
        assert_eq!(user.to_string(), "<User #7: testuser, test@test.com>");
    }

    #[test]
    fn message_display_shows_id() {
        let message = MessageRow {
            id: 42,
            text: "hello".into(),
            user_id: 7,
            created_at: "2024-01-01 00:00:00".into(),
        };
        assert_eq!(message.to_string(), "<Message 42>");
    }

    #[test]
    fn signup_hashes_and_defaults() {
        let new = NewUser::signup("testuser", "test@test.com", "HASHED_PASSWORD", None).unwrap();
        assert_ne!(new.password, "HASHED_PASSWORD");
        assert!(new.password.starts_with("$argon2"));
        assert_eq!(new.image_url, None);

        let new = NewUser::signup("testuser", "test@test.com", "pw123456", Some("")).unwrap();
        assert_eq!(new.image_url, None);

        let new =
            NewUser::signup("testuser", "test@test.com", "pw123456", Some("/pic.png")).unwrap();
        assert_eq!(new.image_url.as_deref(), Some("/pic.png"));
    }

    #[test]
    fn with_id_pins_the_row_id() {
        let new = NewUser::signup("u", "u@test.com", "pw123456", None)
            .unwrap()
            .with_id(111111);
        assert_eq!(new.id, Some(111111));

        let msg = NewMessage::new("a warble", 111111).with_id(11111);
        assert_eq!(msg.id, Some(11111));
        assert_eq!(msg.user_id, 111111);
    }
}
