use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::auth::password::verify_password;
use crate::auth::users::{find_by_email, find_by_id};
use crate::error::{AppError, Result};
use crate::models::{LoginInput, SessionToken, User};

const TOKEN_BYTES: usize = 32;

/// Bearer tokens are random; only their SHA-256 is stored.
fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn login(conn: &Connection, input: LoginInput, ttl_hours: i64) -> Result<SessionToken> {
    // Same answer for unknown email and wrong password
    let user = find_by_email(conn, &input.email)?.ok_or(AppError::Unauthorized)?;
    if !verify_password(&input.password, &user.password_hash)? {
        log::warn!("Failed login for user {}", user.id);
        return Err(AppError::Unauthorized);
    }

    let now = Utc::now().timestamp();
    let expires_at = now + ttl_hours.max(1) * 3600;
    let token = new_token();

    conn.execute("DELETE FROM sessions WHERE expires_at <= ?", [now])?;
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        params![token_digest(&token), user.id, now, expires_at],
    )?;

    log::info!("User {} logged in", user.id);
    Ok(SessionToken {
        token,
        expires_at,
        user,
    })
}

/// Resolve a bearer token to its user. Expired or unknown tokens are rejected.
pub fn authenticate(conn: &Connection, token: &str) -> Result<User> {
    let session: Option<(i64, i64)> = conn
        .query_row(
            "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?",
            [token_digest(token)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((user_id, expires_at)) = session else {
        return Err(AppError::Unauthorized);
    };
    if expires_at <= Utc::now().timestamp() {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?", [token_digest(token)])?;
        return Err(AppError::Unauthorized);
    }

    find_by_id(conn, user_id)?.ok_or(AppError::Unauthorized)
}

pub fn logout(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token_hash = ?", [token_digest(token)])?;
    Ok(())
}
