//! Appointment calendar: booking, per-day listing, the month grid and the
//! WhatsApp reminder link.

use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::DbState;
use crate::error::{require, AppError, AppResult};
use crate::{customers, services};

pub const DEFAULT_TIME: &str = "09:00";
const UNKNOWN_SERVICE: &str = "Servicio desconocido";
const REMINDER_BASE: &str = "https://wa.me/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[default]
    Pendiente,
    Confirmada,
    Cancelada,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pendiente => "PENDIENTE",
            AppointmentStatus::Confirmada => "CONFIRMADA",
            AppointmentStatus::Cancelada => "CANCELADA",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "CONFIRMADA" => AppointmentStatus::Confirmada,
            "CANCELADA" => AppointmentStatus::Cancelada,
            _ => AppointmentStatus::Pendiente,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default)]
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub phone: String,
    pub date: NaiveDate,
    pub time: String,
    pub service_id: String,
    pub service_name: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Booking form. Customer name and phone come from the customer record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentForm {
    #[serde(default, alias = "customer_id", alias = "clienteId")]
    pub customer_id: String,
    #[serde(default, alias = "service_id", alias = "servicioId")]
    pub service_id: String,
    #[serde(alias = "fecha", alias = "selectedDate")]
    pub date: NaiveDate,
    #[serde(default, alias = "hora")]
    pub time: String,
    #[serde(default, alias = "notas")]
    pub notes: Option<String>,
}

/// One day of the month grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub day: u32,
    pub date: NaiveDate,
    pub count: usize,
    pub has_appointments: bool,
}

/// Month layout with Sunday as the first column. Leading `None` cells pad
/// the first week up to the weekday of the 1st.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<Option<DayCell>>,
}

/// Accepts `H:MM` or `HH:MM` and returns the zero-padded form.
fn normalize_time(raw: &str) -> AppResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_TIME.to_string());
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| AppError::Invalid(format!("Hora inválida: {raw} (usa HH:MM)")))
}

const APPOINTMENT_COLUMNS: &str = "id, customer_id, customer_name, phone, appointment_date, \
     appointment_time, service_id, service_name, status, notes";

fn appointment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    let date: String = row.get(4)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Appointment {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        customer_name: row.get(2)?,
        phone: row.get(3)?,
        date,
        time: row.get(5)?,
        service_id: row.get(6)?,
        service_name: row.get(7)?,
        status: AppointmentStatus::parse(&row.get::<_, String>(8)?),
        notes: row.get(9)?,
    })
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn add_appointment(db: &DbState, form: &AppointmentForm) -> AppResult<Appointment> {
    require(&form.customer_id, "cliente")?;
    require(&form.service_id, "servicio")?;
    let time = normalize_time(&form.time)?;
    let customer = customers::get_customer(db, form.customer_id.trim())?;
    let service_name = services::get_service(db, form.service_id.trim())
        .map(|s| s.name)
        .unwrap_or_else(|_| UNKNOWN_SERVICE.to_string());

    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer.id,
        customer_name: customer.name,
        phone: customer.phone,
        date: form.date,
        time,
        service_id: form.service_id.trim().to_string(),
        service_name,
        status: AppointmentStatus::Pendiente,
        notes: form
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from),
    };
    write_appointment(db, &appointment, true)?;
    info!(
        appointment_id = %appointment.id,
        date = %appointment.date,
        time = %appointment.time,
        "appointment booked"
    );
    Ok(appointment)
}

/// Replace the stored appointment with the same id.
pub fn update_appointment(db: &DbState, appointment: &Appointment) -> AppResult<Appointment> {
    require(&appointment.id, "id")?;
    get_appointment(db, &appointment.id)?;
    let updated = Appointment {
        time: normalize_time(&appointment.time)?,
        ..appointment.clone()
    };
    write_appointment(db, &updated, false)?;
    info!(appointment_id = %updated.id, status = updated.status.as_str(), "appointment updated");
    Ok(updated)
}

fn write_appointment(db: &DbState, appt: &Appointment, insert: bool) -> AppResult<()> {
    let sql = if insert {
        "INSERT INTO appointments (id, customer_id, customer_name, phone, appointment_date,
            appointment_time, service_id, service_name, status, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    } else {
        "UPDATE appointments SET customer_id = ?2, customer_name = ?3, phone = ?4,
            appointment_date = ?5, appointment_time = ?6, service_id = ?7,
            service_name = ?8, status = ?9, notes = ?10
         WHERE id = ?1"
    };
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        sql,
        params![
            appt.id,
            appt.customer_id,
            appt.customer_name,
            appt.phone,
            date_key(appt.date),
            appt.time,
            appt.service_id,
            appt.service_name,
            appt.status.as_str(),
            appt.notes,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(db: &DbState, id: &str) -> AppResult<Appointment> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id],
        appointment_from_row,
    )
    .map_err(|_| AppError::NotFound {
        entity: "Cita",
        id: id.to_string(),
    })
}

/// Appointments booked on `date`, in time order.
pub fn list_for_date(db: &DbState, date: NaiveDate) -> AppResult<Vec<Appointment>> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE appointment_date = ?1
         ORDER BY appointment_time, rowid"
    ))?;
    let rows = stmt.query_map(params![date_key(date)], appointment_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn month_grid(db: &DbState, year: i32, month: u32) -> AppResult<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Invalid(format!("Mes inválido: {year}-{month}")))?;
    let days_in_month = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31);

    let counts: HashMap<String, usize> = {
        let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT appointment_date, COUNT(*) FROM appointments
             WHERE appointment_date LIKE ?1
             GROUP BY appointment_date",
        )?;
        let rows = stmt.query_map(params![format!("{}%", first.format("%Y-%m-"))], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let counts = rows
            .map(|r| r.map(|(date, n)| (date, usize::try_from(n).unwrap_or(0))))
            .collect::<Result<HashMap<_, _>, _>>()?;
        counts
    };

    let leading = first.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<Option<DayCell>> = vec![None; leading];
    for day in 1..=days_in_month {
        let Some(date) = first.with_day(day) else {
            continue;
        };
        let count = counts.get(&date_key(date)).copied().unwrap_or(0);
        cells.push(Some(DayCell {
            day,
            date,
            count,
            has_appointments: count > 0,
        }));
    }
    debug!(year, month, leading, days_in_month, "month grid built");
    Ok(MonthGrid { year, month, cells })
}

/// Reminder text sent to the customer.
pub fn reminder_message(appt: &Appointment) -> String {
    format!(
        "Hola {}, te recordamos tu cita en Menta Verde el día {} a las {} para el servicio de {}. ¡Te esperamos!",
        appt.customer_name,
        date_key(appt.date),
        appt.time,
        appt.service_name
    )
}

/// `https://wa.me/<digits>?text=<message>` for the appointment's phone.
pub fn reminder_link(appt: &Appointment) -> AppResult<String> {
    let digits: String = appt.phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(AppError::Invalid(
            "El cliente no tiene un teléfono registrado.".into(),
        ));
    }
    let url = reqwest::Url::parse_with_params(
        &format!("{REMINDER_BASE}{digits}"),
        &[("text", reminder_message(appt))],
    )
    .map_err(|e| AppError::Invalid(format!("Enlace inválido: {e}")))?;
    Ok(url.to_string())
}
