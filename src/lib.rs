//! Menta Verde - spa administration backend
//!
//! This crate holds the console's state (accounts, catalogs, the sale draft,
//! the appointment calendar, the schema designer and the assistant chat) and
//! exposes it through [`invoke`], a command router that takes the same
//! `arg0`/`arg1` JSON payloads the console front end sends. Command names are
//! snake_case (`sale_submit`, `customers_search`, ...).

use serde_json::Value;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod appointments;
pub mod assistant;
pub mod auth;
pub mod cart;
mod commands;
pub mod config;
pub mod customers;
pub mod db;
pub mod error;
pub mod permissions;
pub mod sales;
pub mod schema_designer;
pub mod sellers;
pub mod services;
pub mod users;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Everything the commands operate on.
pub struct AppState {
    pub config: AppConfig,
    pub db: db::DbState,
    pub auth: auth::AuthState,
    pub sales: sales::SalesState,
    pub designer: Mutex<schema_designer::SchemaDesigner>,
    pub assistant: assistant::AssistantState,
}

impl AppState {
    /// Build a fresh, seeded, logged-out state.
    pub fn new(config: AppConfig) -> Result<Self, String> {
        let db = db::init_in_memory(config.hash_cost)?;
        let assistant = assistant::AssistantState::new(config.assistant.clone())
            .map_err(|e| format!("assistant client: {e}"))?;
        info!(
            model = %config.assistant.model,
            ai_configured = config.assistant.api_key.is_some(),
            "application state ready"
        );
        Ok(Self {
            config,
            db,
            auth: auth::AuthState::new(),
            sales: sales::SalesState::new(),
            designer: Mutex::new(schema_designer::SchemaDesigner::new()),
            assistant,
        })
    }
}

/// Install the global subscriber: `RUST_LOG` filter, console output on
/// stderr, and a daily rolling file when `log_dir` is set.
///
/// Keep the returned guard alive until exit so buffered file logs flush.
pub fn init_tracing(config: &AppConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,menta_verde_lib=debug"));

    let (file_layer, guard) = match config.log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "menta-verde");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Merge `arg1` into `arg0` when both are objects; otherwise take whichever
/// is present.
pub(crate) fn parse_channel_payload(arg0: Option<Value>, arg1: Option<Value>) -> Value {
    match (arg0, arg1) {
        (Some(Value::Object(mut obj0)), Some(Value::Object(obj1))) => {
            for (k, v) in obj1 {
                obj0.insert(k, v);
            }
            Value::Object(obj0)
        }
        (Some(v), _) => v,
        (None, Some(v)) => v,
        _ => serde_json::json!({}),
    }
}

pub(crate) fn value_str(v: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Numbers may arrive as JSON numbers or as the text of a form input.
pub(crate) fn value_f64(v: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match v.get(*key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return s.trim().parse::<f64>().ok();
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn value_i64(v: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match v.get(*key) {
            Some(Value::Number(n)) => return n.as_i64(),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return s.trim().parse::<i64>().ok();
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Command router
// ---------------------------------------------------------------------------

/// Run one console command.
pub async fn invoke(
    state: &AppState,
    command: &str,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    debug!(command = %command, "invoke");
    match command {
        // auth
        "auth_login" => commands::auth::auth_login(arg0, arg1, state).await,
        "auth_logout" => commands::auth::auth_logout(state).await,
        "auth_get_current_session" => commands::auth::auth_get_current_session(state).await,
        "auth_register" => commands::auth::auth_register(arg0, state).await,
        "auth_request_password_reset" => commands::auth::auth_request_password_reset(arg0, state).await,

        // users
        "users_list" => commands::users::users_list(state).await,
        "users_get" => commands::users::users_get(arg0, state).await,
        "users_add" => commands::users::users_add(arg0, state).await,
        "users_update" => commands::users::users_update(arg0, arg1, state).await,

        // permissions
        "permissions_get" => commands::permissions::permissions_get(state).await,
        "permissions_set" => commands::permissions::permissions_set(arg0, state).await,
        "permissions_toggle" => commands::permissions::permissions_toggle(arg0, state).await,
        "permissions_can_access" => commands::permissions::permissions_can_access(arg0, state).await,
        "dashboard_get" => commands::permissions::dashboard_get(state).await,

        // sellers
        "sellers_list" => commands::sellers::sellers_list(arg0, state).await,
        "sellers_add" => commands::sellers::sellers_add(arg0, state).await,
        "sellers_update" => commands::sellers::sellers_update(arg0, arg1, state).await,
        "sellers_toggle" => commands::sellers::sellers_toggle(arg0, state).await,

        // customers
        "customers_list" => commands::customers::customers_list(state).await,
        "customers_search" => commands::customers::customers_search(arg0, state).await,
        "customers_pick" => commands::customers::customers_pick(arg0, state).await,
        "customers_add" => commands::customers::customers_add(arg0, state).await,
        "customers_update" => commands::customers::customers_update(arg0, arg1, state).await,
        "customers_toggle" => commands::customers::customers_toggle(arg0, state).await,

        // services
        "services_list" => commands::services::services_list(arg0, state).await,
        "services_search" => commands::services::services_search(arg0, state).await,
        "services_add" => commands::services::services_add(arg0, state).await,
        "services_update" => commands::services::services_update(arg0, arg1, state).await,
        "services_toggle" => commands::services::services_toggle(arg0, state).await,

        // sales
        "sale_get_draft" => commands::sales::sale_get_draft(state).await,
        "sale_select_seller" => commands::sales::sale_select_seller(arg0, state).await,
        "sale_select_customer" => commands::sales::sale_select_customer(arg0, state).await,
        "sale_set_date" => commands::sales::sale_set_date(arg0, state).await,
        "sale_get_next_folio" => commands::sales::sale_get_next_folio(state).await,
        "sale_set_folio" => commands::sales::sale_set_folio(arg0, state).await,
        "sale_set_payment" => commands::sales::sale_set_payment(arg0, arg1, state).await,
        "sale_set_terminal_amount" => commands::sales::sale_set_terminal_amount(arg0, state).await,
        "sale_add_service" => commands::sales::sale_add_service(arg0, state).await,
        "sale_set_quantity" => commands::sales::sale_set_quantity(arg0, arg1, state).await,
        "sale_quick_customer" => commands::sales::sale_quick_customer(arg0, state).await,
        "sale_submit" => commands::sales::sale_submit(state).await,
        "sales_history" => commands::sales::sales_history(arg0, state).await,

        // appointments
        "appointments_list_for_date" => commands::appointments::appointments_list_for_date(arg0, state).await,
        "appointments_add" => commands::appointments::appointments_add(arg0, arg1, state).await,
        "appointments_update" => commands::appointments::appointments_update(arg0, state).await,
        "appointments_month_grid" => commands::appointments::appointments_month_grid(arg0, arg1, state).await,
        "appointments_reminder_link" => {
            commands::appointments::appointments_reminder_link(arg0, state).await
        }

        // schema designer
        "schema_get" => commands::schema::schema_get(state).await,
        "schema_select_table" => commands::schema::schema_select_table(arg0, state).await,
        "schema_add_table" => commands::schema::schema_add_table(arg0, state).await,
        "schema_delete_table" => commands::schema::schema_delete_table(arg0, state).await,
        "schema_add_column" => commands::schema::schema_add_column(state).await,
        "schema_update_column" => commands::schema::schema_update_column(arg0, arg1, state).await,
        "schema_delete_column" => commands::schema::schema_delete_column(arg0, state).await,
        "schema_ai_suggest" => commands::schema::schema_ai_suggest(state).await,

        // assistant
        "assistant_get_transcript" => commands::assistant::assistant_get_transcript(state).await,
        "assistant_send" => commands::assistant::assistant_send(arg0, state).await,
        "assistant_generate" => commands::assistant::assistant_generate(arg0, arg1, state).await,

        other => Err(format!("Unknown command: {other}")),
    }
}


// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_support::test_state;

    #[test]
    fn test_parse_channel_payload_merges_objects() {
        let merged = parse_channel_payload(Some(json!({ "id": "1" })), Some(json!({ "name": "x" })));
        assert_eq!(merged, json!({ "id": "1", "name": "x" }));
        assert_eq!(parse_channel_payload(None, Some(json!("a"))), json!("a"));
        assert_eq!(parse_channel_payload(None, None), json!({}));
    }

    #[test]
    fn test_value_helpers_accept_text_numbers() {
        let v = json!({ "monto": "150.5", "cantidad": 3, "nombre": "  " });
        assert_eq!(value_f64(&v, &["amount", "monto"]), Some(150.5));
        assert_eq!(value_i64(&v, &["quantity", "cantidad"]), Some(3));
        assert_eq!(value_str(&v, &["nombre"]), None);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let state = test_state();
        let err = invoke(&state, "print_receipt", None, None).await.unwrap_err();
        assert_eq!(err, "Unknown command: print_receipt");
    }

    #[tokio::test]
    async fn test_screens_require_login() {
        let state = test_state();
        let err = invoke(&state, "sale_get_draft", None, None).await.unwrap_err();
        assert_eq!(err, AppError::NotLoggedIn.to_string());
        assert_eq!(
            invoke(&state, "auth_get_current_session", None, None).await.unwrap(),
            Value::Null
        );
    }

    #[tokio::test]
    async fn test_sale_flow_through_router() {
        let state = test_state();
        invoke(
            &state,
            "auth_login",
            Some(json!({ "identifier": "admin", "password": "admin1234" })),
            None,
        )
        .await
        .unwrap();

        invoke(&state, "sale_add_service", Some(json!("1")), None).await.unwrap();
        invoke(&state, "sale_add_service", Some(json!({ "serviceId": "1" })), None)
            .await
            .unwrap();
        let rejected = invoke(&state, "sale_submit", None, None).await.unwrap_err();
        assert_eq!(rejected, "Error: Monto inválido o vendedor no seleccionado.");

        invoke(
            &state,
            "sale_set_payment",
            Some(json!("efectivo")),
            Some(json!(1700)),
        )
        .await
        .unwrap();
        let sale = invoke(&state, "sale_submit", None, None).await.unwrap();
        assert_eq!(sale["grossAmount"], 1700.0);
        assert_eq!(sale["paymentMethod"], "EFECTIVO");
        assert_eq!(sale["items"][0]["quantity"], 2);

        let next = invoke(&state, "sale_get_next_folio", None, None).await.unwrap();
        assert_eq!(next["nextFolio"], 2);
        let history = invoke(&state, "sales_history", Some(json!({ "query": "admin" })), None)
            .await
            .unwrap();
        assert_eq!(history["count"], 1);
        assert_eq!(history["totalAmount"], 1700.0);
    }
}
