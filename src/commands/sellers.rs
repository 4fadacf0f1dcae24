use serde_json::Value;

use crate::permissions::View;
use crate::sellers::{self, SellerForm};
use crate::AppState;

use super::{ensure_session, ensure_view, parse_edit_form, parse_form, parse_id_payload, to_json};

/// `true`, `{ "onlyActive": true }` or nothing (all records).
pub(super) fn parse_only_active(arg0: Option<&Value>) -> bool {
    match arg0 {
        Some(Value::Bool(flag)) => *flag,
        Some(v @ Value::Object(_)) => ["onlyActive", "only_active", "activeOnly", "activo"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_bool))
            .unwrap_or(false),
        _ => false,
    }
}

pub async fn sellers_list(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_session(state)?;
    to_json(&sellers::list_sellers(&state.db, parse_only_active(arg0.as_ref()))?)
}

pub async fn sellers_add(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SellersManager)?;
    let form: SellerForm = parse_form(arg0, None, "seller")?;
    to_json(&sellers::add_seller(&state.db, state.config.hash_cost, &form)?)
}

pub async fn sellers_update(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::SellersManager)?;
    let form: SellerForm = parse_edit_form(arg0, arg1, "seller")?;
    to_json(&sellers::update_seller(&state.db, &form)?)
}

pub async fn sellers_toggle(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SellersManager)?;
    let id = parse_id_payload(arg0, &["id", "sellerId", "seller_id"], "Missing seller id")?;
    to_json(&sellers::toggle_seller(&state.db, &id)?)
}
