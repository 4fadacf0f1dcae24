use serde_json::Value;
use tracing::info;

use crate::assistant::Persona;
use crate::error::AppError;
use crate::permissions::View;
use crate::schema_designer::{ColumnField, SchemaDesigner};
use crate::{value_i64, value_str, AppState};

use super::{ensure_view, to_json};

fn lock_designer(state: &AppState) -> Result<std::sync::MutexGuard<'_, SchemaDesigner>, String> {
    state
        .designer
        .lock()
        .map_err(|e| AppError::Storage(e.to_string()).to_string())
}

/// A bare index or `{ "index": n }` under one of `keys`.
fn parse_index_payload(arg0: Option<Value>, keys: &[&str]) -> Result<usize, String> {
    let raw = match arg0 {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(v @ Value::Object(_)) => value_i64(&v, keys),
        _ => None,
    };
    raw.and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| "Missing or invalid index".to_string())
}

#[derive(Debug)]
struct ColumnUpdatePayload {
    index: usize,
    field: ColumnField,
    value: String,
}

/// `(index, { "field": "type", "value": "INT" })` or one object with all three.
fn parse_column_update_payload(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<ColumnUpdatePayload, String> {
    let payload = match (arg0, arg1) {
        (Some(Value::Number(index)), Some(Value::Object(mut rest))) => {
            rest.insert("index".into(), Value::Number(index));
            Value::Object(rest)
        }
        (arg0, arg1) => crate::parse_channel_payload(arg0, arg1),
    };
    let index = parse_index_payload(Some(payload.clone()), &["index", "colIndex", "columnIndex"])?;
    let field = payload
        .get("field")
        .cloned()
        .ok_or("Missing column field")
        .and_then(|f| serde_json::from_value(f).map_err(|_| "Invalid column field"))?;
    let value = payload
        .get("value")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(ColumnUpdatePayload {
        index,
        field,
        value,
    })
}

pub async fn schema_get(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let view = lock_designer(state)?.view();
    to_json(&view)
}

pub async fn schema_select_table(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let index = parse_index_payload(arg0, &["index", "tableIndex"])?;
    let mut designer = lock_designer(state)?;
    designer.select_table(index)?;
    to_json(&designer.view())
}

pub async fn schema_add_table(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let name = match arg0 {
        Some(Value::String(name)) => name,
        Some(v @ Value::Object(_)) => value_str(&v, &["name", "tableName", "nombre"]).unwrap_or_default(),
        _ => String::new(),
    };
    let mut designer = lock_designer(state)?;
    designer.add_table(&name)?;
    to_json(&designer.view())
}

pub async fn schema_delete_table(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let index = parse_index_payload(arg0, &["index", "tableIndex"])?;
    let mut designer = lock_designer(state)?;
    let deleted = designer.delete_table(index);
    let mut view = to_json(&designer.view())?;
    view["deleted"] = Value::Bool(deleted);
    Ok(view)
}

pub async fn schema_add_column(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let mut designer = lock_designer(state)?;
    designer.add_column()?;
    to_json(&designer.view())
}

pub async fn schema_update_column(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let payload = parse_column_update_payload(arg0, arg1)?;
    let mut designer = lock_designer(state)?;
    designer.update_column(payload.index, payload.field, &payload.value)?;
    to_json(&designer.view())
}

pub async fn schema_delete_column(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let index = parse_index_payload(arg0, &["index", "colIndex", "columnIndex"])?;
    let mut designer = lock_designer(state)?;
    designer.delete_column(index)?;
    to_json(&designer.view())
}

/// Ask the SQL persona for one more table and append it to the script.
pub async fn schema_ai_suggest(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Database)?;
    let prompt = lock_designer(state)?.suggestion_prompt()?;
    let suggestion = state.assistant.client.generate(&prompt, Persona::Sql).await;
    let mut designer = lock_designer(state)?;
    designer.append_suggestion(&suggestion);
    info!(chars = suggestion.len(), "schema suggestion appended");
    to_json(&designer.view())
}
