//! Domain error type shared by every module.
//!
//! The `Display` text of each variant is the message shown to the operator,
//! so command handlers can forward `err.to_string()` unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required form field was left empty.
    #[error("Por favor completa los campos obligatorios: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("{entity} no encontrado: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Credenciales incorrectas. Verifica tu usuario y contraseña.")]
    InvalidCredentials,

    #[error("Debes iniciar sesión para continuar.")]
    NotLoggedIn,

    #[error("No tienes permiso para acceder a esta sección.")]
    Forbidden,

    #[error("Error: Monto inválido o vendedor no seleccionado.")]
    SaleRejected,

    #[error("Error de almacenamiento: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Storage(format!("json: {e}"))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Storage(format!("password hash: {e}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Reject blank required fields.
pub(crate) fn require(value: &str, field: &'static str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::MissingField(field));
    }
    Ok(())
}

impl From<AppError> for String {
    fn from(e: AppError) -> Self {
        e.to_string()
    }
}
