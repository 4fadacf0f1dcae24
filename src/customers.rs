//! Customer directory with soft-delete and phone/name search.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{bool_to_int, DbState};
use crate::error::{require, AppError, AppResult};

/// Results shown by the sales-screen customer picker.
pub const PICKER_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub birth_date: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "telefono")]
    pub phone: String,
    #[serde(default, alias = "direccion")]
    pub address: String,
    #[serde(default, alias = "fechaNacimiento", alias = "birth_date")]
    pub birth_date: String,
    #[serde(default, alias = "activo")]
    pub active: Option<bool>,
}

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, birth_date, active";

fn customer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        birth_date: row.get(5)?,
        active: row.get::<_, i64>(6)? != 0,
    })
}

pub fn list_customers(db: &DbState) -> AppResult<Vec<Customer>> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY rowid"
    ))?;
    let rows = stmt.query_map([], customer_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_customer(db: &DbState, id: &str) -> AppResult<Customer> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
        params![id],
        customer_from_row,
    )
    .map_err(|_| AppError::NotFound {
        entity: "Cliente",
        id: id.to_string(),
    })
}

fn matches_query(customer: &Customer, query: &str, include_email: bool) -> bool {
    let needle = query.to_lowercase();
    customer.phone.contains(query)
        || customer.name.to_lowercase().contains(&needle)
        || (include_email && customer.email.to_lowercase().contains(&needle))
}

/// Management-screen search over phone, name and email.
pub fn search_customers(db: &DbState, query: &str) -> AppResult<Vec<Customer>> {
    let query = query.trim();
    Ok(list_customers(db)?
        .into_iter()
        .filter(|c| matches_query(c, query, true))
        .collect())
}

/// Sales/calendar picker: active customers by phone or name, first few hits.
pub fn pick_customers(db: &DbState, query: &str) -> AppResult<Vec<Customer>> {
    let query = query.trim();
    Ok(list_customers(db)?
        .into_iter()
        .filter(|c| c.active && matches_query(c, query, false))
        .take(PICKER_LIMIT)
        .collect())
}

pub fn add_customer(db: &DbState, form: &CustomerForm) -> AppResult<Customer> {
    require(&form.name, "nombre")?;
    let customer = Customer {
        id: uuid::Uuid::new_v4().to_string(),
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        birth_date: form.birth_date.trim().to_string(),
        active: form.active.unwrap_or(true),
    };

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "INSERT INTO customers (id, name, email, phone, address, birth_date, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            customer.id,
            customer.name,
            customer.email,
            customer.phone,
            customer.address,
            customer.birth_date,
            bool_to_int(customer.active),
        ],
    )?;
    info!(customer_id = %customer.id, "customer created");
    Ok(customer)
}

pub fn update_customer(db: &DbState, form: &CustomerForm) -> AppResult<Customer> {
    require(&form.id, "id")?;
    require(&form.name, "nombre")?;
    let existing = get_customer(db, form.id.trim())?;
    let updated = Customer {
        id: existing.id,
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        birth_date: form.birth_date.trim().to_string(),
        active: form.active.unwrap_or(existing.active),
    };

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE customers SET name = ?2, email = ?3, phone = ?4, address = ?5,
            birth_date = ?6, active = ?7
         WHERE id = ?1",
        params![
            updated.id,
            updated.name,
            updated.email,
            updated.phone,
            updated.address,
            updated.birth_date,
            bool_to_int(updated.active),
        ],
    )?;
    info!(customer_id = %updated.id, "customer updated");
    Ok(updated)
}

pub fn toggle_customer(db: &DbState, id: &str) -> AppResult<Customer> {
    let customer = get_customer(db, id)?;
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE customers SET active = ?2 WHERE id = ?1",
        params![customer.id, bool_to_int(!customer.active)],
    )?;
    info!(customer_id = %customer.id, active = !customer.active, "customer toggled");
    Ok(Customer {
        active: !customer.active,
        ..customer
    })
}
