//! Account store operations.

use chrono::Utc;
use rusqlite::Connection;
use zr_core::{AccountId, Error, Result};

use crate::models::Account;

/// Message returned when an email is already registered.
pub const ACCOUNT_EXISTS: &str = "User already exists. Please login.";

/// Create a new account and return it.
pub fn create_account(conn: &Connection, email: &str, password_hash: &str) -> Result<Account> {
    let id = AccountId::new();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO accounts (id, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.to_string(), email, password_hash, created_at],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(ACCOUNT_EXISTS.into())
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(Account {
        id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at,
    })
}

/// Get an account by email.
pub fn get_account_by_email(conn: &Connection, email: &str) -> Result<Option<Account>> {
    let result = conn.query_row(
        "SELECT id, email, password_hash, created_at FROM accounts WHERE email = ?1",
        [email],
        Account::from_row,
    );
    match result {
        Ok(a) => Ok(Some(a)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}
