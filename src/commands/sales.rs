use chrono::NaiveDate;
use serde_json::Value;

use crate::cart::PaymentMethod;
use crate::permissions::View;
use crate::sales::{self, HistoryFilter, QuickCustomerForm};
use crate::{value_f64, value_i64, value_str, AppState};

use super::{ensure_view, parse_form, parse_id_payload, to_json};

#[derive(Debug)]
struct PaymentPayload {
    method: PaymentMethod,
    amount: f64,
}

#[derive(Debug)]
struct QuantityPayload {
    service_id: String,
    quantity: i64,
}

/// `("efectivo", 100)` or `{ "method": "card", "amount": 50 }`.
fn parse_payment_payload(arg0: Option<Value>, arg1: Option<Value>) -> Result<PaymentPayload, String> {
    let (method, amount) = match (arg0, arg1) {
        (Some(method @ Value::String(_)), amount) => (method, amount),
        (Some(obj @ Value::Object(_)), _) => {
            let method = ["method", "metodo", "bucket", "type"]
                .iter()
                .find_map(|key| obj.get(*key).cloned())
                .unwrap_or(Value::Null);
            let amount = value_f64(&obj, &["amount", "monto", "value"]).map(Value::from);
            (method, amount)
        }
        _ => return Err("Missing payment method".into()),
    };
    let method: PaymentMethod = serde_json::from_value(method)
        .map_err(|e| format!("Invalid payment method: {e}"))?;
    let amount = match amount {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(PaymentPayload { method, amount })
}

/// A bare number (or numeric text) or an object carrying one of `keys`.
fn parse_number_payload(arg0: Option<Value>, keys: &[&str]) -> Option<f64> {
    match arg0? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        v @ Value::Object(_) => value_f64(&v, keys),
        _ => None,
    }
}

/// Whole numbers only, and only those that fit an `i64`.
fn parse_folio_payload(arg0: Option<Value>) -> Result<i64, String> {
    if let Some(Value::Number(n)) = &arg0 {
        if let Some(folio) = n.as_i64() {
            return Ok(folio);
        }
    }
    let folio = parse_number_payload(arg0, &["folio", "nextFolio", "value"])
        .filter(|f| f.fract() == 0.0)
        .ok_or("Invalid folio")?;
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if folio < i64::MIN as f64 || folio >= i64::MAX as f64 {
        return Err("Invalid folio".into());
    }
    Ok(folio as i64)
}

fn parse_quantity_payload(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<QuantityPayload, String> {
    match (arg0, arg1) {
        (Some(Value::String(service_id)), Some(quantity)) => {
            let quantity = match quantity {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or("Invalid quantity")?;
            Ok(QuantityPayload {
                service_id: service_id.trim().to_string(),
                quantity,
            })
        }
        (Some(obj @ Value::Object(_)), _) => Ok(QuantityPayload {
            service_id: value_str(&obj, &["serviceId", "service_id", "id"])
                .ok_or("Missing service id")?,
            quantity: value_i64(&obj, &["quantity", "cantidad", "qty"])
                .ok_or("Invalid quantity")?,
        }),
        _ => Err("Missing service id".into()),
    }
}

fn parse_date_payload(arg0: Option<Value>) -> Result<NaiveDate, String> {
    let raw = match arg0 {
        Some(Value::String(s)) => s,
        Some(v @ Value::Object(_)) => value_str(&v, &["date", "fecha"]).unwrap_or_default(),
        _ => String::new(),
    };
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| format!("Fecha inválida: {raw}"))
}

/// No payload (or a bare query) filters on today, like the form on first
/// open. An object sets the bounds explicitly.
fn parse_history_filter(arg0: Option<Value>) -> Result<HistoryFilter, String> {
    let today = sales::today();
    match arg0 {
        None | Some(Value::Null) => Ok(HistoryFilter {
            start: Some(today),
            end: Some(today),
            ..HistoryFilter::default()
        }),
        Some(Value::String(query)) => Ok(HistoryFilter {
            start: Some(today),
            end: Some(today),
            query,
        }),
        Some(mut v) => {
            // empty date inputs mean "no bound"
            if let Value::Object(map) = &mut v {
                map.retain(|_, value| !matches!(value, Value::String(s) if s.trim().is_empty()));
            }
            serde_json::from_value(v).map_err(|e| format!("Invalid history filter: {e}"))
        }
    }
}

pub async fn sale_get_draft(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    to_json(&sales::draft_view(&state.db, &state.sales)?)
}

pub async fn sale_select_seller(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let id = parse_id_payload(arg0, &["sellerId", "seller_id", "id"], "Missing seller id")?;
    to_json(&sales::select_seller(&state.db, &state.sales, &id)?)
}

/// A customer id selects; null or an empty id clears the selection.
pub async fn sale_select_customer(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let id = parse_id_payload(arg0, &["customerId", "customer_id", "id"], "").ok();
    to_json(&sales::select_customer(&state.db, &state.sales, id.as_deref())?)
}

pub async fn sale_set_date(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let date = parse_date_payload(arg0)?;
    to_json(&sales::set_date(&state.db, &state.sales, date)?)
}

pub async fn sale_get_next_folio(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    Ok(serde_json::json!({ "nextFolio": sales::next_folio(&state.db)? }))
}

pub async fn sale_set_folio(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let folio = parse_folio_payload(arg0)?;
    to_json(&sales::set_folio(&state.db, &state.sales, folio)?)
}

pub async fn sale_set_payment(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let payload = parse_payment_payload(arg0, arg1)?;
    to_json(&sales::set_payment(
        &state.db,
        &state.sales,
        payload.method,
        payload.amount,
    )?)
}

pub async fn sale_set_terminal_amount(
    arg0: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let amount =
        parse_number_payload(arg0, &["amount", "terminalAmount", "montoTerminal"]).unwrap_or(0.0);
    to_json(&sales::set_terminal_amount(&state.db, &state.sales, amount)?)
}

pub async fn sale_add_service(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let id = parse_id_payload(arg0, &["serviceId", "service_id", "id"], "Missing service id")?;
    to_json(&sales::add_service_to_cart(&state.db, &state.sales, &id)?)
}

pub async fn sale_set_quantity(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let payload = parse_quantity_payload(arg0, arg1)?;
    to_json(&sales::set_item_quantity(
        &state.db,
        &state.sales,
        &payload.service_id,
        payload.quantity,
    )?)
}

pub async fn sale_quick_customer(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let form: QuickCustomerForm = parse_form(arg0, None, "customer")?;
    to_json(&sales::quick_create_customer(&state.db, &state.sales, &form)?)
}

pub async fn sale_submit(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    to_json(&sales::submit_sale(&state.db, &state.sales)?)
}

pub async fn sales_history(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::SalesForm)?;
    let filter = parse_history_filter(arg0)?;
    to_json(&sales::filter_history(&state.db, &filter)?)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_payment_payload_supports_pair_and_object() {
        let pair =
            parse_payment_payload(Some(serde_json::json!("tarjeta")), Some(serde_json::json!("75.5")))
                .unwrap();
        assert_eq!(pair.method, PaymentMethod::Card);
        assert_eq!(pair.amount, 75.5);

        let obj = parse_payment_payload(
            Some(serde_json::json!({ "method": "transfer", "amount": 20 })),
            None,
        )
        .unwrap();
        assert_eq!(obj.method, PaymentMethod::Transfer);
        assert_eq!(obj.amount, 20.0);

        let blank = parse_payment_payload(Some(serde_json::json!("efectivo")), None).unwrap();
        assert_eq!(blank.amount, 0.0);
        assert!(parse_payment_payload(Some(serde_json::json!("cheque")), None).is_err());
    }

    #[test]
    fn parse_quantity_payload_supports_pair_and_object() {
        let pair =
            parse_quantity_payload(Some(serde_json::json!("1")), Some(serde_json::json!(3))).unwrap();
        assert_eq!(pair.service_id, "1");
        assert_eq!(pair.quantity, 3);

        let obj = parse_quantity_payload(
            Some(serde_json::json!({ "serviceId": "2", "cantidad": "0" })),
            None,
        )
        .unwrap();
        assert_eq!(obj.service_id, "2");
        assert_eq!(obj.quantity, 0);
        assert!(parse_quantity_payload(Some(serde_json::json!("2")), Some(serde_json::json!("x"))).is_err());
    }

    #[test]
    fn parse_history_filter_treats_blank_dates_as_open() {
        let filter = parse_history_filter(Some(serde_json::json!({
            "startDate": "2026-10-01",
            "endDate": "",
            "query": "betty"
        })))
        .unwrap();
        assert_eq!(filter.start, NaiveDate::from_ymd_opt(2026, 10, 1));
        assert_eq!(filter.end, None);
        assert_eq!(filter.query, "betty");

        let today = sales::today();
        let default = parse_history_filter(None).unwrap();
        assert_eq!((default.start, default.end), (Some(today), Some(today)));
        assert_eq!(default.query, "");
        let query = parse_history_filter(Some(serde_json::json!("42"))).unwrap();
        assert_eq!(query.query, "42");
        assert_eq!(query.start, Some(today));
    }

    #[test]
    fn parse_folio_payload_rejects_out_of_range_numbers() {
        assert_eq!(parse_folio_payload(Some(serde_json::json!(100))), Ok(100));
        assert_eq!(parse_folio_payload(Some(serde_json::json!({ "folio": "7" }))), Ok(7));
        assert!(parse_folio_payload(Some(serde_json::json!(1e19))).is_err());
        assert!(parse_folio_payload(Some(serde_json::json!("9223372036854775808"))).is_err());
        assert!(parse_folio_payload(Some(serde_json::json!(2.5))).is_err());
        assert!(parse_folio_payload(None).is_err());
    }

    #[test]
    fn parse_date_payload_requires_iso_dates() {
        assert_eq!(
            parse_date_payload(Some(serde_json::json!({ "fecha": "2026-02-28" }))).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert!(parse_date_payload(Some(serde_json::json!("28/02/2026"))).is_err());
    }
}
