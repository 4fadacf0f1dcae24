//! Sales staff catalog.
//!
//! Sellers are never deleted; toggling `active` hides them from the sales
//! screen.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{bool_to_int, DbState};
use crate::error::{require, AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub username: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerForm {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "nombreCorto", alias = "short_name")]
    pub short_name: String,
    #[serde(default, alias = "usuario")]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl SellerForm {
    fn validate(&self) -> AppResult<()> {
        require(&self.name, "nombre")?;
        require(&self.short_name, "nombre corto")?;
        require(&self.username, "usuario")
    }
}

const SELLER_COLUMNS: &str = "id, name, short_name, username, active";

fn seller_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Seller> {
    Ok(Seller {
        id: row.get(0)?,
        name: row.get(1)?,
        short_name: row.get(2)?,
        username: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
    })
}

pub fn list_sellers(db: &DbState, only_active: bool) -> AppResult<Vec<Seller>> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELLER_COLUMNS} FROM sellers WHERE (?1 = 0 OR active = 1) ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![bool_to_int(only_active)], seller_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_seller(db: &DbState, id: &str) -> AppResult<Seller> {
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.query_row(
        &format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE id = ?1"),
        params![id],
        seller_from_row,
    )
    .map_err(|_| AppError::NotFound {
        entity: "Vendedor",
        id: id.to_string(),
    })
}

pub fn add_seller(db: &DbState, hash_cost: u32, form: &SellerForm) -> AppResult<Seller> {
    form.validate()?;
    let password_hash = match form.password.trim() {
        "" => None,
        pw => Some(bcrypt::hash(pw, hash_cost)?),
    };
    let seller = Seller {
        id: uuid::Uuid::new_v4().to_string(),
        name: form.name.trim().to_string(),
        short_name: form.short_name.trim().to_string(),
        username: form.username.trim().to_string(),
        active: true,
    };

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "INSERT INTO sellers (id, name, short_name, username, password_hash, active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![
            seller.id,
            seller.name,
            seller.short_name,
            seller.username,
            password_hash
        ],
    )?;
    info!(seller_id = %seller.id, username = %seller.username, "seller created");
    Ok(seller)
}

/// Replace name, short name and username. The active flag is left as is.
pub fn update_seller(db: &DbState, form: &SellerForm) -> AppResult<Seller> {
    require(&form.id, "id")?;
    form.validate()?;
    let existing = get_seller(db, form.id.trim())?;

    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE sellers SET name = ?2, short_name = ?3, username = ?4 WHERE id = ?1",
        params![
            existing.id,
            form.name.trim(),
            form.short_name.trim(),
            form.username.trim()
        ],
    )?;
    info!(seller_id = %existing.id, "seller updated");
    Ok(Seller {
        name: form.name.trim().to_string(),
        short_name: form.short_name.trim().to_string(),
        username: form.username.trim().to_string(),
        ..existing
    })
}

pub fn toggle_seller(db: &DbState, id: &str) -> AppResult<Seller> {
    let seller = get_seller(db, id)?;
    let conn = db.conn.lock().map_err(|e| AppError::Storage(e.to_string()))?;
    conn.execute(
        "UPDATE sellers SET active = ?2 WHERE id = ?1",
        params![seller.id, bool_to_int(!seller.active)],
    )?;
    info!(seller_id = %seller.id, active = !seller.active, "seller toggled");
    Ok(Seller {
        active: !seller.active,
        ..seller
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    fn form(name: &str, short: &str, user: &str) -> SellerForm {
        SellerForm {
            name: name.into(),
            short_name: short.into(),
            username: user.into(),
            ..SellerForm::default()
        }
    }

    #[test]
    fn test_add_and_list() {
        let state = test_state();
        let added = add_seller(&state.db, 4, &form("Juan Pérez", "Juan", "juan_ventas")).unwrap();
        assert!(added.active);
        let all = list_sellers(&state.db, false).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, added.id);
    }

    #[test]
    fn test_add_requires_short_name() {
        let state = test_state();
        assert!(matches!(
            add_seller(&state.db, 4, &form("Juan", " ", "juan")),
            Err(AppError::MissingField("nombre corto"))
        ));
    }

    #[test]
    fn test_toggle_twice_restores_record() {
        let state = test_state();
        let before = get_seller(&state.db, "2").unwrap();
        let once = toggle_seller(&state.db, "2").unwrap();
        assert!(!once.active);
        assert_eq!(list_sellers(&state.db, true).unwrap().len(), 1);
        toggle_seller(&state.db, "2").unwrap();
        assert_eq!(get_seller(&state.db, "2").unwrap(), before);
    }

    #[test]
    fn test_update_keeps_active_flag() {
        let state = test_state();
        toggle_seller(&state.db, "2").unwrap();
        let mut edit = form("Beatriz Solís", "Bety", "betty_01");
        edit.id = "2".into();
        let updated = update_seller(&state.db, &edit).unwrap();
        assert_eq!(updated.short_name, "Bety");
        assert!(!updated.active);
        assert_eq!(get_seller(&state.db, "2").unwrap(), updated);
    }
}
