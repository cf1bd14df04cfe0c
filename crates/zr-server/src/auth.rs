//! Account registration, login and session tokens.
//!
//! Passwords are stored as bcrypt hashes. Sessions are stateless HS256 JWTs
//! carrying the account id and email; verification checks signature and
//! expiry only, so there is no revocation.

use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use zr_core::config::AuthConfig;
use zr_core::{Error, Result};
use zr_db::models::Account;
use zr_db::DbPool;

pub const CREDENTIALS_REQUIRED: &str = "Email & password required";
pub const INVALID_EMAIL: &str = "Invalid email format";
pub const INVALID_CREDENTIALS: &str = "Invalid Email or Password";
pub const NO_TOKEN: &str = "No token";
pub const TOKEN_INVALID: &str = "Token invalid";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email regex is valid"));

/// Check an address against the accepted `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Generate a random 32-byte hex secret suitable for signing tokens.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Session token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

pub struct AuthService {
    db: DbPool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_secs: u64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(db: DbPool, secret: &str, token_ttl_secs: u64, bcrypt_cost: u32) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            db,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_ttl_secs,
            bcrypt_cost,
        }
    }

    /// Build from config, generating an ephemeral secret when none is set.
    pub fn from_config(db: DbPool, config: &AuthConfig) -> Self {
        let secret = match config.jwt_secret {
            Some(ref s) if !s.is_empty() => s.clone(),
            _ => {
                tracing::warn!(
                    "No JWT secret configured; using a random one. Sessions end on restart."
                );
                generate_secret()
            }
        };
        Self::new(db, &secret, config.token_ttl_secs, config.bcrypt_cost)
    }

    /// Create an account. Duplicate emails fail with [`Error::Conflict`].
    pub async fn register(&self, email: &str, password: &str) -> Result<Account> {
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation(CREDENTIALS_REQUIRED.into()));
        }
        if !is_valid_email(email) {
            return Err(Error::Validation(INVALID_EMAIL.into()));
        }

        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| Error::Internal(format!("bcrypt error: {e}")))?;

        let conn = zr_db::pool::get_conn(&self.db)?;
        let account = zr_db::queries::accounts::create_account(&conn, email, &hash)?;
        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Check credentials and issue a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let invalid = || Error::Unauthorized(INVALID_CREDENTIALS.into());

        if email.is_empty() || password.is_empty() {
            return Err(invalid());
        }

        let account = {
            let conn = zr_db::pool::get_conn(&self.db)?;
            zr_db::queries::accounts::get_account_by_email(&conn, email)?
        };
        let Some(account) = account else {
            tracing::debug!("Login for unknown email");
            return Err(invalid());
        };

        let password = password.to_string();
        let hash = account.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
            .unwrap_or(false);

        if !valid {
            tracing::debug!(account_id = %account.id, "Login with wrong password");
            return Err(invalid());
        }

        self.issue(&account)
    }

    /// Issue a token for `account` valid from now.
    pub fn issue(&self, account: &Account) -> Result<String> {
        self.issue_at(&account.id.to_string(), &account.email, unix_now())
    }

    /// Issue a token as if at unix time `now`.
    pub fn issue_at(&self, sub: &str, email: &str, now: u64) -> Result<String> {
        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("token encode failed: {e}")))
    }

    /// Validate signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        if token.is_empty() {
            return Err(Error::Unauthorized(NO_TOKEN.into()));
        }
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {e}");
                Error::Unauthorized(TOKEN_INVALID.into())
            })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
