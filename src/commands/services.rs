use serde_json::Value;

use crate::permissions::View;
use crate::services::{self, ServiceForm};
use crate::AppState;

use super::sellers::parse_only_active;
use super::{
    ensure_session, ensure_view, parse_edit_form, parse_form, parse_id_payload,
    parse_query_payload, to_json,
};

pub async fn services_list(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_session(state)?;
    to_json(&services::list_services(&state.db, parse_only_active(arg0.as_ref()))?)
}

pub async fn services_search(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_session(state)?;
    let only_active = parse_only_active(arg0.as_ref());
    let query = parse_query_payload(arg0);
    to_json(&services::search_services(&state.db, &query, only_active)?)
}

pub async fn services_add(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::ServicesManager)?;
    let form: ServiceForm = parse_form(arg0, None, "service")?;
    to_json(&services::add_service(&state.db, &form)?)
}

pub async fn services_update(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::ServicesManager)?;
    let form: ServiceForm = parse_edit_form(arg0, arg1, "service")?;
    to_json(&services::update_service(&state.db, &form)?)
}

pub async fn services_toggle(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::ServicesManager)?;
    let id = parse_id_payload(arg0, &["id", "serviceId", "service_id"], "Missing service id")?;
    to_json(&services::toggle_service(&state.db, &id)?)
}
