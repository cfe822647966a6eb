//! Entity operations on an open [`Session`]. Everything here runs inside
//! the session's transaction; nothing becomes visible to other sessions
//! until [`crate::Database::with_session`] commits.

use rusqlite::{Connection, OptionalExtension, params};

use crate::Session;
use crate::credentials;
use crate::error::StoreError;
use crate::models::{DEFAULT_IMAGE_URL, MessageRow, NewMessage, NewUser, UserRow};

impl Session<'_> {
    // -- Users --

    /// Persist a staged signup and return the stored row. Duplicate
    /// username or email surfaces as [`StoreError::Integrity`] and the
    /// surrounding unit of work rolls back.
    pub fn create_user(&self, new: &NewUser) -> Result<UserRow, StoreError> {
        self.tx.execute(
            "INSERT INTO users (id, username, email, password, image_url) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.id,
                new.username,
                new.email,
                new.password,
                new.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
            ],
        )?;

        let id = match new.id {
            Some(id) => id,
            None => self.tx.last_insert_rowid(),
        };
        let row = self.tx.query_row(
            "SELECT id, username, email, password, image_url, created_at FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password: row.get(3)?,
                    image_url: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )?;
        Ok(row)
    }

    pub fn user(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        query_user_by_id(&self.tx, id)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        query_user_by_username(&self.tx, username)
    }

    /// Every user, ordered by id. Callers treat the result as a set.
    pub fn users(&self) -> Result<Vec<UserRow>, StoreError> {
        query_users(
            &self.tx,
            "SELECT id, username, email, password, image_url, created_at
             FROM users ORDER BY id",
            [],
        )
    }

    /// Look up by username and verify the password. Unknown username and
    /// wrong password are the same expected outcome, `Ok(None)`; Err is
    /// reserved for store failures.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRow>, StoreError> {
        match query_user_by_username(&self.tx, username)? {
            Some(user) if credentials::verify(password, &user.password) => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    /// Delete a user. Their messages, follow edges, and likes cascade.
    /// Returns whether the user existed.
    pub fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let n = self.tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    // -- Follows --

    /// Create the directed edge follower -> followed. A duplicate edge
    /// violates the composite primary key, a dangling id the foreign keys;
    /// both surface as [`StoreError::Integrity`].
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
            params![follower_id, followed_id],
        )?;
        Ok(())
    }

    /// Remove the edge; returns whether it existed.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        let n = self.tx.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
            params![follower_id, followed_id],
        )?;
        Ok(n > 0)
    }

    /// Drop every outgoing edge for `follower_id` in one statement.
    /// Returns how many edges were removed.
    pub fn clear_following(&self, follower_id: i64) -> Result<usize, StoreError> {
        let n = self
            .tx
            .execute("DELETE FROM follows WHERE follower_id = ?1", [follower_id])?;
        Ok(n)
    }

    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        let exists = self.tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
            params![follower_id, followed_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// The reverse view of the same edge set: true iff `other` follows
    /// `user`.
    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool, StoreError> {
        self.is_following(other_id, user_id)
    }

    /// Users this user follows.
    pub fn following(&self, user_id: i64) -> Result<Vec<UserRow>, StoreError> {
        query_users(
            &self.tx,
            "SELECT u.id, u.username, u.email, u.password, u.image_url, u.created_at
             FROM users u
             JOIN follows f ON f.followed_id = u.id
             WHERE f.follower_id = ?1
             ORDER BY u.id",
            [user_id],
        )
    }

    /// Users following this user, read off the same edges from the other
    /// side.
    pub fn followers(&self, user_id: i64) -> Result<Vec<UserRow>, StoreError> {
        query_users(
            &self.tx,
            "SELECT u.id, u.username, u.email, u.password, u.image_url, u.created_at
             FROM users u
             JOIN follows f ON f.follower_id = u.id
             WHERE f.followed_id = ?1
             ORDER BY u.id",
            [user_id],
        )
    }

    // -- Messages --

    /// Persist a staged message and return the stored row. Text over the
    /// length bound trips the schema CHECK, a dangling user_id the foreign
    /// key; both surface as [`StoreError::Integrity`].
    pub fn create_message(&self, new: &NewMessage) -> Result<MessageRow, StoreError> {
        self.tx.execute(
            "INSERT INTO messages (id, text, user_id) VALUES (?1, ?2, ?3)",
            params![new.id, new.text, new.user_id],
        )?;

        let id = match new.id {
            Some(id) => id,
            None => self.tx.last_insert_rowid(),
        };
        let row = self.tx.query_row(
            "SELECT id, text, user_id, created_at FROM messages WHERE id = ?1",
            [id],
            |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    user_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )?;
        Ok(row)
    }

    pub fn message(&self, id: i64) -> Result<Option<MessageRow>, StoreError> {
        let mut stmt = self
            .tx
            .prepare("SELECT id, text, user_id, created_at FROM messages WHERE id = ?1")?;

        let row = stmt
            .query_row([id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    user_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .optional()?;

        Ok(row)
    }

    /// A user's messages, newest first.
    pub fn messages_for_user(&self, user_id: i64) -> Result<Vec<MessageRow>, StoreError> {
        query_messages(
            &self.tx,
            "SELECT id, text, user_id, created_at FROM messages
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
            [user_id],
        )
    }

    /// Delete a message; its like edges cascade. Returns whether it
    /// existed.
    pub fn delete_message(&self, id: i64) -> Result<bool, StoreError> {
        let n = self.tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    // -- Likes --

    /// Like a message. Idempotent: a fresh edge returns true, re-liking is
    /// a no-op returning false. Dangling ids still fail, conflict
    /// resolution never applies to foreign keys.
    pub fn like(&self, user_id: i64, message_id: i64) -> Result<bool, StoreError> {
        let n = self.tx.execute(
            "INSERT OR IGNORE INTO likes (user_id, message_id) VALUES (?1, ?2)",
            params![user_id, message_id],
        )?;
        Ok(n > 0)
    }

    /// Remove the like edge; returns whether it existed.
    pub fn unlike(&self, user_id: i64, message_id: i64) -> Result<bool, StoreError> {
        let n = self.tx.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
            params![user_id, message_id],
        )?;
        Ok(n > 0)
    }

    /// Toggle a like: removes if present, inserts if not. Returns true when
    /// the message is liked after the call.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool, StoreError> {
        if self.unlike(user_id, message_id)? {
            return Ok(false);
        }
        self.like(user_id, message_id)?;
        Ok(true)
    }

    /// Remove every like belonging to `user_id`. Other users' likes on the
    /// same messages are untouched. Returns how many were removed.
    pub fn clear_likes(&self, user_id: i64) -> Result<usize, StoreError> {
        let n = self
            .tx
            .execute("DELETE FROM likes WHERE user_id = ?1", [user_id])?;
        Ok(n)
    }

    /// Ids of the users who liked a message.
    pub fn likers(&self, message_id: i64) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .tx
            .prepare("SELECT user_id FROM likes WHERE message_id = ?1 ORDER BY user_id")?;

        let ids = stmt
            .query_map([message_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    pub fn like_count(&self, message_id: i64) -> Result<i64, StoreError> {
        let n = self.tx.query_row(
            "SELECT COUNT(*) FROM likes WHERE message_id = ?1",
            [message_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Messages the user has liked.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>, StoreError> {
        query_messages(
            &self.tx,
            "SELECT m.id, m.text, m.user_id, m.created_at
             FROM messages m
             JOIN likes l ON l.message_id = m.id
             WHERE l.user_id = ?1
             ORDER BY m.id",
            [user_id],
        )
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password, image_url, created_at FROM users WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                image_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password, image_url, created_at FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                image_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_users<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<UserRow>, StoreError> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(params, |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                image_url: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_messages<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<MessageRow>, StoreError> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(params, |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                text: row.get(1)?,
                user_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
