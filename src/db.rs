//! In-memory SQLite store for Menta Verde.
//!
//! Every collection the console works with (users, sellers, customers,
//! services, appointments, sales) lives in a single in-memory connection that
//! is dropped with the process. Provides schema migrations, first-run seed
//! data, and the category/key settings helpers.

use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::{error, info};

use crate::error::AppResult;

/// Shared state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Open a fresh in-memory database, migrate it and load the seed records.
pub fn init_in_memory(hash_cost: u32) -> Result<DbState, String> {
    let conn = Connection::open_in_memory().map_err(|e| format!("sqlite open: {e}"))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| format!("pragma setup: {e}"))?;

    run_migrations(&conn)?;
    seed_defaults(&conn, hash_cost).map_err(|e| format!("seed: {e}"))?;

    info!("In-memory database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
    })
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: settings, accounts and catalogs.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_settings (
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now')),
            PRIMARY KEY (setting_category, setting_key)
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            short_name TEXT NOT NULL DEFAULT '',
            paternal_surname TEXT NOT NULL DEFAULT '',
            maternal_surname TEXT NOT NULL DEFAULT '',
            birth_date TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT 'USER',
            created_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sellers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            short_name TEXT NOT NULL,
            username TEXT NOT NULL,
            password_hash TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            birth_date TEXT NOT NULL DEFAULT '',
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS services (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price REAL NOT NULL DEFAULT 0,
            description TEXT NOT NULL DEFAULT '',
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now'))
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        format!("migration v1: {e}")
    })?;

    info!("Applied migration v1 (settings, accounts, catalogs)");
    Ok(())
}

/// Migration v2: appointments and the append-only sales history.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            customer_name TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            appointment_date TEXT NOT NULL,
            appointment_time TEXT NOT NULL,
            service_id TEXT NOT NULL,
            service_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDIENTE',
            notes TEXT,
            created_at TEXT DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(appointment_date);

        CREATE TABLE IF NOT EXISTS sales (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            folio INTEGER NOT NULL,
            sale_date TEXT NOT NULL,
            seller_name TEXT NOT NULL,
            seller_short TEXT NOT NULL,
            customer_name TEXT,
            gross_amount REAL NOT NULL,
            terminal_amount REAL NOT NULL DEFAULT 0,
            cash REAL NOT NULL DEFAULT 0,
            transfer REAL NOT NULL DEFAULT 0,
            card REAL NOT NULL DEFAULT 0,
            payment_method TEXT NOT NULL,
            items TEXT NOT NULL DEFAULT '[]',
            created_at TEXT DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_sales_date ON sales(sale_date);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        format!("migration v2: {e}")
    })?;

    info!("Applied migration v2 (appointments, sales)");
    Ok(())
}

/// Load the records a fresh console starts with.
fn seed_defaults(conn: &Connection, hash_cost: u32) -> AppResult<()> {
    let seeded: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if seeded > 0 {
        return Ok(());
    }

    let admin_hash = bcrypt::hash("admin1234", hash_cost)?;
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, name, short_name,
            paternal_surname, maternal_surname, birth_date, phone, role)
         VALUES ('1', 'admin', 'admin@mentaverde.com', ?1, 'Administrador', 'Admin',
            'Principal', 'Menta', '1990-01-01', '5512345678', 'ADMIN')",
        params![admin_hash],
    )?;

    let seller_hash = bcrypt::hash("123", hash_cost)?;
    conn.execute(
        "INSERT INTO sellers (id, name, short_name, username, password_hash, active) VALUES
            ('1', 'Admin Principal', 'Admin', 'admin_sales', ?1, 1),
            ('2', 'Beatriz Solis', 'Betty', 'betty_01', ?1, 1)",
        params![seller_hash],
    )?;

    conn.execute_batch(
        "
        INSERT INTO customers (id, name, email, phone, address, birth_date, active) VALUES
            ('1', 'Tecnologías Globales S.A.', 'contacto@tglobals.com', '5544332211',
             'Av. Reforma 100, CDMX', '1985-05-15', 1);

        INSERT INTO services (id, name, price, description, active) VALUES
            ('1', 'Limpieza Facial Profunda', 850,
             'Tratamiento completo con exfoliación y mascarilla hidratante.', 1),
            ('2', 'Masaje Relajante 60min', 1200,
             'Masaje corporal completo con aceites esenciales de menta.', 1);
        ",
    )?;

    set_setting(conn, "sales", "next_folio", "1")?;

    info!("Seed data loaded (1 user, 2 sellers, 1 customer, 2 services)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Get a single setting value.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(conn: &Connection, category: &str, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )?;
    Ok(())
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare table list");
        stmt.query_map([], |row| row.get(0))
            .expect("query tables")
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_migrations_create_all_tables() {
        let db = init_in_memory(4).expect("init");
        let conn = db.conn.lock().unwrap();
        let tables = table_names(&conn);
        for expected in [
            "appointments",
            "customers",
            "local_settings",
            "sales",
            "sellers",
            "services",
            "users",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = init_in_memory(4).expect("init");
        let conn = db.conn.lock().unwrap();
        run_migrations(&conn).expect("second run should be a no-op");
        seed_defaults(&conn, 4).expect("second seed should be a no-op");
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn test_seed_data_matches_console_defaults() {
        let db = init_in_memory(4).expect("init");
        let conn = db.conn.lock().unwrap();
        let hash: String = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(bcrypt::verify("admin1234", &hash).unwrap());
        let active_sellers: i64 = conn
            .query_row("SELECT COUNT(*) FROM sellers WHERE active = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(active_sellers, 2);
        assert_eq!(
            get_setting(&conn, "sales", "next_folio").as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_set_setting_upserts() {
        let db = init_in_memory(4).expect("init");
        let conn = db.conn.lock().unwrap();
        set_setting(&conn, "sales", "next_folio", "7").unwrap();
        set_setting(&conn, "sales", "next_folio", "8").unwrap();
        assert_eq!(
            get_setting(&conn, "sales", "next_folio").as_deref(),
            Some("8")
        );
        assert!(get_setting(&conn, "sales", "missing").is_none());
    }
}
