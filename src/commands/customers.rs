use serde_json::Value;

use crate::customers::{self, CustomerForm};
use crate::permissions::View;
use crate::AppState;

use super::{
    ensure_session, ensure_view, parse_edit_form, parse_form, parse_id_payload,
    parse_query_payload, to_json,
};

const CUSTOMER_ID_KEYS: &[&str] = &["id", "customerId", "customer_id", "clienteId"];

pub async fn customers_list(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::CustomersManager)?;
    to_json(&customers::list_customers(&state.db)?)
}

pub async fn customers_search(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::CustomersManager)?;
    let query = parse_query_payload(arg0);
    to_json(&customers::search_customers(&state.db, &query)?)
}

/// Picker used by the sales and calendar screens.
pub async fn customers_pick(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_session(state)?;
    let query = parse_query_payload(arg0);
    to_json(&customers::pick_customers(&state.db, &query)?)
}

pub async fn customers_add(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::CustomersManager)?;
    let form: CustomerForm = parse_form(arg0, None, "customer")?;
    to_json(&customers::add_customer(&state.db, &form)?)
}

pub async fn customers_update(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::CustomersManager)?;
    let form: CustomerForm = parse_edit_form(arg0, arg1, "customer")?;
    to_json(&customers::update_customer(&state.db, &form)?)
}

pub async fn customers_toggle(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::CustomersManager)?;
    let id = parse_id_payload(arg0, CUSTOMER_ID_KEYS, "Missing customer id")?;
    to_json(&customers::toggle_customer(&state.db, &id)?)
}


#[cfg(test)]
mod tests {
    use crate::invoke;
    use crate::test_support::test_state;
    use serde_json::json;

    #[tokio::test]
    async fn test_customer_search_and_picker() {
        let state = test_state();
        invoke(&state, "auth_login", Some(json!("admin")), Some(json!("admin1234")))
            .await
            .unwrap();
        invoke(
            &state,
            "customers_add",
            Some(json!({ "nombre": "Ana López", "telefono": "5500001111", "email": "ana@correo.mx" })),
            None,
        )
        .await
        .unwrap();

        let by_email = invoke(&state, "customers_search", Some(json!("correo.mx")), None)
            .await
            .unwrap();
        assert_eq!(by_email.as_array().map(Vec::len), Some(1));
        let picked = invoke(&state, "customers_pick", Some(json!({ "query": "correo.mx" })), None)
            .await
            .unwrap();
        assert_eq!(picked.as_array().map(Vec::len), Some(0));

        let toggled = invoke(&state, "customers_toggle", Some(json!({ "customerId": "1" })), None)
            .await
            .unwrap();
        assert_eq!(toggled["active"], false);
    }
}
