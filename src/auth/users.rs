use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::password::{hash_password, MIN_PASSWORD_LEN};
use crate::error::{AppError, Result};
use crate::models::{RegisterInput, User};

fn map_row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, password_hash, name, created_at FROM users WHERE email = ?",
            [normalize_email(email)],
            map_row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, password_hash, name, created_at FROM users WHERE id = ?",
            [id],
            map_row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn register(conn: &Connection, input: RegisterInput) -> Result<User> {
    let email = normalize_email(&input.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if find_by_email(conn, &email)?.is_some() {
        return Err(AppError::Conflict(format!("user {} already exists", email)));
    }

    let hash = hash_password(&input.password)?;
    let name = input.name.map(|n| n.trim().to_string()).unwrap_or_default();
    conn.execute(
        "INSERT INTO users (email, password_hash, name, created_at) VALUES (?, ?, ?, ?)",
        params![email, hash, name, Utc::now().timestamp()],
    )?;

    let id = conn.last_insert_rowid();
    log::info!("Registered user {}", id);
    find_by_id(conn, id)?.ok_or_else(|| AppError::Internal("user vanished after insert".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn input(email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: password.to_string(),
            name: Some(" Marco ".to_string()),
        }
    }

    #[test]
    fn test_register_and_find() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();

        let user = register(&conn, input(" Trader@Example.com", "long enough")).unwrap();
        assert_eq!(user.email, "trader@example.com");
        assert_eq!(user.name, "Marco");
        assert_ne!(user.password_hash, "long enough");

        let found = find_by_email(&conn, "TRADER@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn test_register_rejects_duplicates_and_weak_input() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();

        register(&conn, input("a@b.it", "long enough")).unwrap();
        assert!(matches!(register(&conn, input("A@B.it", "long enough")), Err(AppError::Conflict(_))));
        assert!(matches!(register(&conn, input("nobody", "long enough")), Err(AppError::Validation(_))));
        assert!(matches!(register(&conn, input("c@d.it", "short")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let user = register(&conn, input("a@b.it", "long enough")).unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "a@b.it");
    }
}
