use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::appointments::{self, Appointment, AppointmentForm};
use crate::permissions::View;
use crate::sales::today;
use crate::{value_i64, value_str, AppState};

use super::{ensure_view, parse_form, parse_id_payload, to_json};

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| format!("Fecha inválida: {raw}"))
}

/// Selected calendar day; defaults to today.
fn parse_date_payload(arg0: Option<Value>) -> Result<NaiveDate, String> {
    match arg0 {
        Some(Value::String(raw)) if !raw.trim().is_empty() => parse_day(&raw),
        Some(v @ Value::Object(_)) => match value_str(&v, &["date", "fecha", "selectedDate"]) {
            Some(raw) => parse_day(&raw),
            None => Ok(today()),
        },
        _ => Ok(today()),
    }
}

/// `(2026, 10)`, `{ "year": 2026, "month": 10 }` or nothing for the current month.
fn parse_month_payload(arg0: Option<Value>, arg1: Option<Value>) -> Result<(i32, u32), String> {
    let now = today();
    let (year, month) = match (arg0, arg1) {
        (Some(Value::Number(y)), Some(Value::Number(m))) => (y.as_i64(), m.as_i64()),
        (Some(v @ Value::Object(_)), _) => (
            value_i64(&v, &["year", "anio"]),
            value_i64(&v, &["month", "mes"]),
        ),
        _ => (None, None),
    };
    let year = year.unwrap_or(i64::from(now.year()));
    let month = month.unwrap_or(i64::from(now.month()));
    let year = i32::try_from(year).map_err(|_| format!("Año inválido: {year}"))?;
    let month = u32::try_from(month).map_err(|_| format!("Mes inválido: {month}"))?;
    Ok((year, month))
}

pub async fn appointments_list_for_date(
    arg0: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::Calendar)?;
    let date = parse_date_payload(arg0)?;
    to_json(&appointments::list_for_date(&state.db, date)?)
}

/// Book an appointment. `arg1` may carry the selected date separately.
pub async fn appointments_add(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::Calendar)?;
    let arg1 = match arg1 {
        Some(Value::String(date)) => Some(serde_json::json!({ "date": date })),
        other => other,
    };
    let mut payload = crate::parse_channel_payload(arg0, arg1);
    if let Value::Object(map) = &mut payload {
        if !["date", "fecha", "selectedDate"].iter().any(|k| map.contains_key(*k)) {
            map.insert("date".into(), Value::String(today().format("%Y-%m-%d").to_string()));
        }
    }
    let form: AppointmentForm = parse_form(Some(payload), None, "appointment")?;
    to_json(&appointments::add_appointment(&state.db, &form)?)
}

pub async fn appointments_update(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::Calendar)?;
    let appointment: Appointment = parse_form(arg0, None, "appointment")?;
    to_json(&appointments::update_appointment(&state.db, &appointment)?)
}

pub async fn appointments_month_grid(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::Calendar)?;
    let (year, month) = parse_month_payload(arg0, arg1)?;
    to_json(&appointments::month_grid(&state.db, year, month)?)
}

pub async fn appointments_reminder_link(
    arg0: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::Calendar)?;
    let id = parse_id_payload(
        arg0,
        &["id", "appointmentId", "appointment_id"],
        "Missing appointment id",
    )?;
    let appointment = appointments::get_appointment(&state.db, &id)?;
    Ok(serde_json::json!({
        "url": appointments::reminder_link(&appointment)?,
        "message": appointments::reminder_message(&appointment),
    }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_month_payload_supports_pair_object_and_default() {
        assert_eq!(
            parse_month_payload(Some(serde_json::json!(2026)), Some(serde_json::json!(2))).unwrap(),
            (2026, 2)
        );
        assert_eq!(
            parse_month_payload(Some(serde_json::json!({ "anio": 2027, "mes": 12 })), None)
                .unwrap(),
            (2027, 12)
        );
        let now = today();
        assert_eq!(parse_month_payload(None, None).unwrap(), (now.year(), now.month()));
        assert!(parse_month_payload(Some(serde_json::json!({ "month": -1 })), None).is_err());
    }

    #[test]
    fn parse_date_payload_defaults_to_today() {
        assert_eq!(parse_date_payload(None).unwrap(), today());
        assert_eq!(
            parse_date_payload(Some(serde_json::json!({ "fecha": "2026-10-31" }))).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 31).unwrap()
        );
        assert!(parse_date_payload(Some(serde_json::json!("31-10-2026"))).is_err());
    }
}
