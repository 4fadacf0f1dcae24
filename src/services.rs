//! Service catalog (treatments and their prices).

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{bool_to_int, DbState};
use crate::error::{require, AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceForm {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "precio")]
    pub price: f64,
    #[serde(default, alias = "descripcion")]
    pub description: String,
    #[serde(default, alias = "activo")]
    pub active: Option<bool>,
}

const SERVICE_COLUMNS: &str = "id, name, price, description, active";

fn service_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        description: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
    })
}

pub fn list_services(db: &DbState, only_active: bool) -> AppResult<Vec<Service>> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE (?1 = 0 OR active = 1) ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![bool_to_int(only_active)], service_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_service(db: &DbState, id: &str) -> AppResult<Service> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.query_row(
        &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
        params![id],
        service_from_row,
    )
    .map_err(|_| AppError::NotFound {
        entity: "Servicio",
        id: id.to_string(),
    })
}

/// Case-insensitive match on name or description.
pub fn search_services(db: &DbState, query: &str, only_active: bool) -> AppResult<Vec<Service>> {
    let needle = query.trim().to_lowercase();
    Ok(list_services(db, only_active)?
        .into_iter()
        .filter(|s| {
            s.name.to_lowercase().contains(&needle)
                || s.description.to_lowercase().contains(&needle)
        })
        .collect())
}

fn validate(form: &ServiceForm) -> AppResult<()> {
    require(&form.name, "nombre")?;
    if form.price <= 0.0 || !form.price.is_finite() {
        return Err(AppError::Invalid("El precio debe ser mayor a cero.".into()));
    }
    Ok(())
}

pub fn add_service(db: &DbState, form: &ServiceForm) -> AppResult<Service> {
    validate(form)?;
    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        name: form.name.trim().to_string(),
        price: form.price,
        description: form.description.trim().to_string(),
        active: form.active.unwrap_or(true),
    };

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "INSERT INTO services (id, name, price, description, active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.name,
            service.price,
            service.description,
            bool_to_int(service.active)
        ],
    )?;
    info!(service_id = %service.id, price = service.price, "service created");
    Ok(service)
}

pub fn update_service(db: &DbState, form: &ServiceForm) -> AppResult<Service> {
    require(&form.id, "id")?;
    validate(form)?;
    let existing = get_service(db, form.id.trim())?;
    let updated = Service {
        id: existing.id,
        name: form.name.trim().to_string(),
        price: form.price,
        description: form.description.trim().to_string(),
        active: form.active.unwrap_or(existing.active),
    };

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE services SET name = ?2, price = ?3, description = ?4, active = ?5 WHERE id = ?1",
        params![
            updated.id,
            updated.name,
            updated.price,
            updated.description,
            bool_to_int(updated.active)
        ],
    )?;
    info!(service_id = %updated.id, "service updated");
    Ok(updated)
}

pub fn toggle_service(db: &DbState, id: &str) -> AppResult<Service> {
    let service = get_service(db, id)?;
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE services SET active = ?2 WHERE id = ?1",
        params![service.id, bool_to_int(!service.active)],
    )?;
    info!(service_id = %service.id, active = !service.active, "service toggled");
    Ok(Service {
        active: !service.active,
        ..service
    })
}
