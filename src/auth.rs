//! Password login, registration and the in-memory session.
//!
//! Users are looked up by username or email and verified against the bcrypt
//! hash stored in the `users` table. There is a single session per process;
//! the console starts logged out.

use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::db::DbState;
use crate::error::{require, AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("ADMIN") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }
}

/// A console account as returned to callers. Never carries the password.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub short_name: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub birth_date: String,
    pub phone: String,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub(crate) const USER_COLUMNS: &str = "id, username, email, name, short_name, paternal_surname, \
     maternal_surname, birth_date, phone, role";

pub(crate) fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        short_name: row.get(4)?,
        paternal_surname: row.get(5)?,
        maternal_surname: row.get(6)?,
        birth_date: row.get(7)?,
        phone: row.get(8)?,
        role: UserRole::parse(&row.get::<_, String>(9)?),
    })
}

/// Self-service registration form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "nombreCorto", alias = "short_name")]
    pub short_name: String,
    #[serde(default, alias = "apellidoPaterno", alias = "paternal_surname")]
    pub paternal_surname: String,
    #[serde(default, alias = "apellidoMaterno", alias = "maternal_surname")]
    pub maternal_surname: String,
    #[serde(default, alias = "fechaNacimiento", alias = "birth_date")]
    pub birth_date: String,
    #[serde(default, alias = "celular")]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Session holder shared by all commands.
pub struct AuthState {
    current: Mutex<Option<User>>,
}

impl AuthState {
    /// Starts logged out; the console opens on the login screen.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Option<User>>> {
        self.current
            .lock()
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify credentials and open the session.
pub fn login(db: &DbState, auth: &AuthState, identifier: &str, password: &str) -> AppResult<User> {
    let identifier = identifier.trim();
    require(identifier, "usuario")?;
    require(password, "contraseña")?;

    let found = {
        let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users
                 WHERE username = ?1 OR email = ?1 ORDER BY rowid LIMIT 1"
            ),
            [identifier],
            |row| Ok((user_from_row(row)?, row.get::<_, String>(10)?)),
        )
        .optional()?
    };

    let Some((user, hash)) = found else {
        warn!(identifier = %identifier, "login failed: unknown user");
        return Err(AppError::InvalidCredentials);
    };
    if !bcrypt::verify(password, &hash).unwrap_or(false) {
        warn!(user_id = %user.id, "login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let mut current = auth.lock()?;
    *current = Some(user.clone());
    info!(user_id = %user.id, role = user.role.as_str(), "login successful");
    Ok(user)
}

/// Close the session. Returns whether a user was logged in.
pub fn logout(auth: &AuthState) -> AppResult<bool> {
    let mut current = auth.lock()?;
    Ok(match current.take() {
        Some(user) => {
            info!(user_id = %user.id, "session logged out");
            true
        }
        None => false,
    })
}

pub fn current_user(auth: &AuthState) -> AppResult<Option<User>> {
    Ok(auth.lock()?.clone())
}

/// Refresh the session copy after the logged-in account was edited.
pub(crate) fn refresh_session(auth: &AuthState, updated: &User) -> AppResult<()> {
    let mut current = auth.lock()?;
    if current.as_ref().is_some_and(|u| u.id == updated.id) {
        *current = Some(updated.clone());
    }
    Ok(())
}

pub fn require_user(auth: &AuthState) -> AppResult<User> {
    current_user(auth)?.ok_or(AppError::NotLoggedIn)
}

pub fn require_admin(auth: &AuthState) -> AppResult<User> {
    let user = require_user(auth)?;
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// Create a standard account from the public registration form.
///
/// The username is the local part of the email address.
pub fn register(db: &DbState, hash_cost: u32, form: Registration) -> AppResult<User> {
    require(&form.name, "nombre")?;
    require(&form.short_name, "nombre corto")?;
    require(&form.paternal_surname, "apellido paterno")?;
    require(&form.maternal_surname, "apellido materno")?;
    require(&form.birth_date, "fecha de nacimiento")?;
    require(&form.phone, "celular")?;
    require(&form.email, "email")?;
    require(&form.password, "contraseña")?;

    let email = form.email.trim().to_string();
    let username = email.split('@').next().unwrap_or_default().to_string();

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        email,
        name: form.name.trim().to_string(),
        short_name: form.short_name.trim().to_string(),
        paternal_surname: form.paternal_surname.trim().to_string(),
        maternal_surname: form.maternal_surname.trim().to_string(),
        birth_date: form.birth_date.trim().to_string(),
        phone: form.phone.trim().to_string(),
        role: UserRole::User,
    };
    let hash = bcrypt::hash(&form.password, hash_cost)?;
    insert_user(db, &user, &hash)?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub(crate) fn insert_user(db: &DbState, user: &User, password_hash: &str) -> AppResult<()> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, name, short_name,
            paternal_surname, maternal_surname, birth_date, phone, role)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            user.id,
            user.username,
            user.email,
            password_hash,
            user.name,
            user.short_name,
            user.paternal_surname,
            user.maternal_surname,
            user.birth_date,
            user.phone,
            user.role.as_str(),
        ],
    )?;
    Ok(())
}

/// Accept a password-reset request. No mail is sent; the request always
/// reports success once the email field is filled in.
pub fn request_password_reset(email: &str) -> AppResult<()> {
    require(email, "email")?;
    info!(email = %email.trim(), "password reset link requested");
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
