//! Administrator-managed user accounts.

use rusqlite::params;
use serde::Deserialize;
use tracing::info;

use crate::auth::{self, user_from_row, User, UserRole, USER_COLUMNS};
use crate::db::DbState;
use crate::error::{require, AppError, AppResult};

/// Account form used by both "new user" and "manage user".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "usuario")]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
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
    pub role: Option<UserRole>,
}

impl UserForm {
    fn to_user(&self, id: String) -> User {
        User {
            id,
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            name: self.name.trim().to_string(),
            short_name: self.short_name.trim().to_string(),
            paternal_surname: self.paternal_surname.trim().to_string(),
            maternal_surname: self.maternal_surname.trim().to_string(),
            birth_date: self.birth_date.trim().to_string(),
            phone: self.phone.trim().to_string(),
            role: self.role.unwrap_or(UserRole::User),
        }
    }
}

pub fn list_users(db: &DbState) -> AppResult<Vec<User>> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))?;
    let rows = stmt.query_map([], user_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_user(db: &DbState, id: &str) -> AppResult<User> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .map_err(|_| AppError::NotFound {
        entity: "Usuario",
        id: id.to_string(),
    })
}

/// Create an account. Username, email and password are mandatory.
pub fn add_user(db: &DbState, hash_cost: u32, form: &UserForm) -> AppResult<User> {
    require(&form.username, "usuario")?;
    require(&form.email, "email")?;
    require(&form.password, "contraseña")?;

    let user = form.to_user(uuid::Uuid::new_v4().to_string());
    let hash = bcrypt::hash(&form.password, hash_cost)?;
    auth::insert_user(db, &user, &hash)?;
    info!(user_id = %user.id, role = user.role.as_str(), "user created");
    Ok(user)
}

/// Replace an account by id. A blank password keeps the current one.
pub fn update_user(db: &DbState, hash_cost: u32, form: &UserForm) -> AppResult<User> {
    require(&form.id, "id")?;
    require(&form.username, "usuario")?;
    require(&form.email, "email")?;

    let existing = get_user(db, form.id.trim())?;
    let mut user = form.to_user(existing.id);
    if form.role.is_none() {
        user.role = existing.role;
    }

    let new_hash = if form.password.trim().is_empty() {
        None
    } else {
        Some(bcrypt::hash(&form.password, hash_cost)?)
    };

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE users SET username = ?2, email = ?3, name = ?4, short_name = ?5,
            paternal_surname = ?6, maternal_surname = ?7, birth_date = ?8, phone = ?9,
            role = ?10, password_hash = COALESCE(?11, password_hash)
         WHERE id = ?1",
        params![
            user.id,
            user.username,
            user.email,
            user.name,
            user.short_name,
            user.paternal_surname,
            user.maternal_surname,
            user.birth_date,
            user.phone,
            user.role.as_str(),
            new_hash,
        ],
    )?;
    info!(user_id = %user.id, "user updated");
    Ok(user)
}
