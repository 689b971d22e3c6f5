// SQLite store for the combined customer table

use crate::dates::normalize_date;
use crate::error::ImportError;
use crate::merge::MergedEntity;
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use tracing::{debug, warn};

/// Final shape of one persisted customer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRow {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub device_payment_plan: bool,
    pub credit_card: Option<String>,
    pub credit_card_type: Option<String>,
    pub account_last_payment_date: Option<String>,
    pub address: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Outcome of one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    pub inserted: usize,
    pub updated: usize,
}

pub fn setup_database(conn: &Connection) -> Result<(), ImportError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS combined_data (
            ID TEXT PRIMARY KEY,
            name TEXT,
            email TEXT,
            device_payment_plan INTEGER NOT NULL DEFAULT 0,
            credit_card TEXT,
            credit_card_type TEXT,
            account_last_payment_date TEXT,
            address TEXT,
            state TEXT,
            postal_code TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_combined_name_email
         ON combined_data(name, email)",
        [],
    )?;

    Ok(())
}

/// Apply the merged entity set inside a single transaction.
///
/// Each entity is checked by ID and either updated in place or inserted.
/// The first store failure rolls the whole batch back, so rows only become
/// visible once every entity has been applied.
pub fn apply_entities(
    conn: &mut Connection,
    entities: &[MergedEntity],
) -> Result<ApplyStats, ImportError> {
    let tx = conn.transaction()?;
    let mut stats = ApplyStats::default();

    for entity in entities {
        if upsert_entity(&tx, entity)? {
            stats.updated += 1;
        } else {
            stats.inserted += 1;
        }
    }

    tx.commit()?;
    debug!(inserted = stats.inserted, updated = stats.updated, "batch committed");

    Ok(stats)
}

/// Returns true when an existing row was updated, false on insert.
fn upsert_entity(tx: &Transaction, entity: &MergedEntity) -> Result<bool, ImportError> {
    let record = &entity.record;

    // Malformed dates must not abort the batch: log and persist null.
    let payment_date = match normalize_date(record.last_payment_date.as_deref()) {
        Ok(date) => date,
        Err(err) => {
            warn!(id = %entity.id, error = %err, "dropping unparseable payment date");
            None
        }
    };
    let device_payment_plan = parse_flag(record.device_payment_plan.as_deref());
    let now = Utc::now().to_rfc3339();

    let existing: i64 = tx.query_row(
        "SELECT COUNT(*) FROM combined_data WHERE ID = ?1",
        params![entity.id],
        |row| row.get(0),
    )?;

    if existing > 0 {
        tx.execute(
            "UPDATE combined_data SET
                name = ?2,
                email = ?3,
                device_payment_plan = ?4,
                credit_card = ?5,
                credit_card_type = ?6,
                account_last_payment_date = ?7,
                address = ?8,
                state = ?9,
                postal_code = ?10,
                updated_at = ?11
             WHERE ID = ?1",
            params![
                entity.id,
                record.name,
                record.email,
                device_payment_plan,
                record.credit_card,
                record.credit_card_type,
                payment_date,
                record.address,
                record.state,
                record.postal_code,
                now,
            ],
        )?;
        Ok(true)
    } else {
        tx.execute(
            "INSERT INTO combined_data (
                ID, name, email, device_payment_plan, credit_card,
                credit_card_type, account_last_payment_date, address,
                state, postal_code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                entity.id,
                record.name,
                record.email,
                device_payment_plan,
                record.credit_card,
                record.credit_card_type,
                payment_date,
                record.address,
                record.state,
                record.postal_code,
                now,
            ],
        )?;
        Ok(false)
    }
}

/// Permissive boolean coercion for the device payment plan column.
/// Anything unrecognized (including absent) counts as false.
fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("y")
    )
}

/// Fetch every persisted row, ordered by ID for stable output.
pub fn get_all_rows(conn: &Connection) -> Result<Vec<CustomerRow>, ImportError> {
    let mut stmt = conn.prepare(
        "SELECT ID, name, email, device_payment_plan, credit_card,
                credit_card_type, account_last_payment_date, address,
                state, postal_code
         FROM combined_data
         ORDER BY ID",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(CustomerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                device_payment_plan: row.get(3)?,
                credit_card: row.get(4)?,
                credit_card_type: row.get(5)?,
                account_last_payment_date: row.get(6)?,
                address: row.get(7)?,
                state: row.get(8)?,
                postal_code: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
