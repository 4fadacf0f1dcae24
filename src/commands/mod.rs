//! Command handlers, one file per console screen.
//!
//! Every handler takes the raw `arg0`/`arg1` payloads, checks the session
//! and screen access, calls into the domain modules and returns JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::User;
use crate::error::AppError;
use crate::permissions::View;
use crate::{parse_channel_payload, AppState};

pub(crate) mod appointments;
pub(crate) mod assistant;
pub(crate) mod auth;
pub(crate) mod customers;
pub(crate) mod permissions;
pub(crate) mod sales;
pub(crate) mod schema;
pub(crate) mod sellers;
pub(crate) mod services;
pub(crate) mod users;

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize response: {e}"))
}

/// Deserialize a form from `arg0` (merged with `arg1` when both are objects).
pub(crate) fn parse_form<T: DeserializeOwned>(
    arg0: Option<Value>,
    arg1: Option<Value>,
    what: &str,
) -> Result<T, String> {
    let payload = parse_channel_payload(arg0, arg1);
    serde_json::from_value(payload).map_err(|e| format!("Invalid {what} payload: {e}"))
}

/// Edit forms: `(id, { ...fields })` or a single object that carries `id`.
pub(crate) fn parse_edit_form<T: DeserializeOwned>(
    arg0: Option<Value>,
    arg1: Option<Value>,
    what: &str,
) -> Result<T, String> {
    match (arg0, arg1) {
        (Some(Value::String(id)), Some(Value::Object(mut fields))) => {
            fields.insert("id".into(), Value::String(id));
            parse_form(Some(Value::Object(fields)), None, what)
        }
        (arg0, arg1) => parse_form(arg0, arg1, what),
    }
}

/// Accept either a bare string id or an object carrying one of `keys`.
pub(crate) fn parse_id_payload(
    arg0: Option<Value>,
    keys: &[&str],
    err_msg: &str,
) -> Result<String, String> {
    let id = match arg0 {
        Some(Value::String(id)) => Some(id.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(v @ Value::Object(_)) => crate::value_str(&v, keys),
        _ => None,
    };
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| err_msg.to_string())
}

/// Free-text query from a string or `{ "query": ... }`; missing means empty.
pub(crate) fn parse_query_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(q)) => q.trim().to_string(),
        Some(v @ Value::Object(_)) => {
            crate::value_str(&v, &["query", "q", "search", "term"]).unwrap_or_default()
        }
        _ => String::new(),
    }
}

pub(crate) fn ensure_session(state: &AppState) -> Result<User, String> {
    Ok(crate::auth::require_user(&state.auth)?)
}

/// The logged-in user, provided they may open `view`.
pub(crate) fn ensure_view(state: &AppState, view: View) -> Result<User, String> {
    let user = crate::auth::current_user(&state.auth)?;
    let flags = crate::permissions::load(&state.db)?;
    crate::permissions::ensure_access(user.as_ref(), &flags, view)?;
    Ok(user.ok_or(AppError::NotLoggedIn)?)
}
