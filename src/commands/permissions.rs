use serde_json::Value;

use crate::permissions::{self, AppPermissions, View};
use crate::{auth, sales, AppState};

use super::{ensure_session, ensure_view, to_json};

fn parse_flag_payload(arg0: Option<Value>) -> Option<String> {
    match arg0? {
        Value::String(key) => Some(key.trim().to_string()).filter(|k| !k.is_empty()),
        v @ Value::Object(_) => crate::value_str(&v, &["key", "flag", "permission", "name"]),
        _ => None,
    }
}

fn parse_view_payload(arg0: Option<Value>) -> Result<View, String> {
    let raw = match arg0 {
        Some(v @ Value::Object(_)) => v.get("view").cloned().unwrap_or(Value::Null),
        Some(v) => v,
        None => Value::Null,
    };
    serde_json::from_value(raw).map_err(|e| format!("Invalid view payload: {e}"))
}

/// Overlay the provided flags on the current ones so partial updates work.
fn merge_flags(current: &AppPermissions, patch: Option<Value>) -> Result<AppPermissions, String> {
    let merged = crate::parse_channel_payload(Some(to_json(current)?), patch);
    serde_json::from_value(merged).map_err(|e| format!("Invalid permissions payload: {e}"))
}

pub async fn permissions_get(state: &AppState) -> Result<Value, String> {
    ensure_session(state)?;
    to_json(&permissions::load(&state.db)?)
}

pub async fn permissions_set(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Permissions)?;
    let current = permissions::load(&state.db)?;
    let updated = merge_flags(&current, arg0)?;
    permissions::save(&state.db, &updated)?;
    to_json(&updated)
}

pub async fn permissions_toggle(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Permissions)?;
    let key = parse_flag_payload(arg0).ok_or("Missing permission key")?;
    to_json(&permissions::toggle(&state.db, &key)?)
}

pub async fn permissions_can_access(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    let view = parse_view_payload(arg0)?;
    let user = auth::current_user(&state.auth)?;
    let flags = permissions::load(&state.db)?;
    Ok(serde_json::json!({
        "view": view,
        "allowed": permissions::can_access(user.as_ref(), &flags, view),
    }))
}

/// Dashboard menu for the current user, with today's sales totals when
/// analytics are visible to them.
pub async fn dashboard_get(state: &AppState) -> Result<Value, String> {
    let user = ensure_view(state, View::Dashboard)?;
    let flags = permissions::load(&state.db)?;
    let analytics = if permissions::analytics_visible(&user, &flags) {
        let today = sales::day_summary(&state.db, sales::today())?;
        serde_json::json!({ "count": today.count, "totalAmount": today.total_amount })
    } else {
        Value::Null
    };
    Ok(serde_json::json!({
        "user": to_json(&user)?,
        "views": permissions::dashboard_views(&user, &flags),
        "assistantVisible": permissions::assistant_visible(Some(&user), &flags),
        "analytics": analytics,
    }))
}
