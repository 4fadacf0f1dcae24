use serde::Deserialize;
use serde_json::Value;

use crate::auth::{self, Registration};
use crate::AppState;

use super::{parse_form, to_json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(default, alias = "username", alias = "usuario", alias = "email", alias = "user")]
    identifier: String,
    #[serde(default, alias = "contrasena", alias = "pin")]
    password: String,
}

/// `("user", "pass")` or `{ "username": ..., "password": ... }`.
fn parse_login_payload(arg0: Option<Value>, arg1: Option<Value>) -> Result<LoginPayload, String> {
    match (arg0, arg1) {
        (Some(Value::String(identifier)), Some(Value::String(password))) => Ok(LoginPayload {
            identifier,
            password,
        }),
        (Some(Value::String(identifier)), None) => Ok(LoginPayload {
            identifier,
            password: String::new(),
        }),
        (arg0, arg1) => parse_form(arg0, arg1, "login"),
    }
}

fn parse_email_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(email)) => email.trim().to_string(),
        Some(v @ Value::Object(_)) => {
            crate::value_str(&v, &["email", "correo", "mail"]).unwrap_or_default()
        }
        _ => String::new(),
    }
}

pub async fn auth_login(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    let payload = parse_login_payload(arg0, arg1)?;
    tokio::time::sleep(state.config.auth_delay).await;
    let user = auth::login(&state.db, &state.auth, &payload.identifier, &payload.password)?;
    Ok(serde_json::json!({
        "success": true,
        "user": to_json(&user)?,
    }))
}

pub async fn auth_logout(state: &AppState) -> Result<Value, String> {
    let was_logged_in = auth::logout(&state.auth)?;
    Ok(serde_json::json!({ "success": true, "wasLoggedIn": was_logged_in }))
}

pub async fn auth_get_current_session(state: &AppState) -> Result<Value, String> {
    match auth::current_user(&state.auth)? {
        Some(user) => to_json(&user),
        None => Ok(Value::Null),
    }
}

pub async fn auth_register(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    let form: Registration = parse_form(arg0, None, "registration")?;
    tokio::time::sleep(state.config.auth_delay).await;
    let user = auth::register(&state.db, state.config.hash_cost, form)?;
    Ok(serde_json::json!({
        "success": true,
        "user": to_json(&user)?,
    }))
}

pub async fn auth_request_password_reset(
    arg0: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    let email = parse_email_payload(arg0);
    auth::request_password_reset(&email)?;
    tokio::time::sleep(state.config.reset_delay).await;
    Ok(serde_json::json!({
        "success": true,
        "email": email,
        "message": format!(
            "Si existe una cuenta para {email}, recibirás instrucciones para restablecer tu contraseña pronto."
        ),
    }))
}

#[cfg(test)]
mod dto_tests {
    use super::{parse_email_payload, parse_login_payload};

    #[test]
    fn parse_login_payload_supports_pair_and_object_aliases() {
        let pair = parse_login_payload(
            Some(serde_json::json!("admin")),
            Some(serde_json::json!("admin1234")),
        )
        .unwrap();
        assert_eq!(pair.identifier, "admin");
        assert_eq!(pair.password, "admin1234");

        let spanish = parse_login_payload(
            Some(serde_json::json!({ "usuario": "betty", "contrasena": "123" })),
            None,
        )
        .unwrap();
        assert_eq!(spanish.identifier, "betty");
        assert_eq!(spanish.password, "123");

        let email = parse_login_payload(
            Some(serde_json::json!({ "email": "admin@mentaverde.com" })),
            Some(serde_json::json!({ "password": "x" })),
        )
        .unwrap();
        assert_eq!(email.identifier, "admin@mentaverde.com");
        assert_eq!(email.password, "x");
    }

    #[test]
    fn parse_email_payload_supports_string_and_object() {
        assert_eq!(parse_email_payload(Some(serde_json::json!(" a@b.mx "))), "a@b.mx");
        assert_eq!(
            parse_email_payload(Some(serde_json::json!({ "correo": "c@d.mx" }))),
            "c@d.mx"
        );
        assert_eq!(parse_email_payload(None), "");
    }
}
