// Parking Vecinal - SQLite store
// Three tables (neighbors, vehicles, payments) behind parameterized
// prepared statements. Referential integrity lives here: vehicles and
// payments cascade away with their neighbor.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::entities::{Neighbor, NeighborSummary, Payment, Vehicle};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; foreign keys must be switched on per
    // connection or the cascades silently do nothing.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS neighbors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            address TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            neighbor_id INTEGER NOT NULL REFERENCES neighbors(id) ON DELETE CASCADE,
            license_plate TEXT NOT NULL,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            control_number TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            neighbor_id INTEGER NOT NULL REFERENCES neighbors(id) ON DELETE CASCADE,
            method TEXT NOT NULL,
            amount REAL NOT NULL,
            deposit_account TEXT,
            receipt_file TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vehicles_neighbor ON vehicles(neighbor_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payments_neighbor ON payments(neighbor_id)",
        [],
    )?;

    Ok(())
}

/// Parse an RFC 3339 timestamp column.
fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidQuery)
}

fn neighbor_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<Neighbor, rusqlite::Error> {
    let created_at: String = row.get(4)?;
    Ok(Neighbor {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        address: row.get(3)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

// ============================================================================
// Neighbors
// ============================================================================

pub fn insert_neighbor(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    address: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO neighbors (first_name, last_name, address, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![first_name, last_name, address, Utc::now().to_rfc3339()],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Dashboard listing: newest neighbors first, with vehicle/payment counts.
pub fn list_neighbors_dashboard(conn: &Connection) -> Result<Vec<NeighborSummary>> {
    let mut stmt = conn.prepare(
        "SELECT n.id, n.first_name, n.last_name, n.address, n.created_at,
                (SELECT COUNT(*) FROM vehicles v WHERE v.neighbor_id = n.id),
                (SELECT COUNT(*) FROM payments p WHERE p.neighbor_id = n.id)
         FROM neighbors n
         ORDER BY n.created_at DESC",
    )?;

    let summaries = stmt
        .query_map([], |row| {
            Ok(NeighborSummary {
                neighbor: neighbor_from_row(row)?,
                vehicle_count: row.get(5)?,
                payment_count: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(summaries)
}

/// Admin selector listing: alphabetical by last then first name.
pub fn list_neighbors_alpha(conn: &Connection) -> Result<Vec<Neighbor>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, address, created_at
         FROM neighbors
         ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
    )?;

    let neighbors = stmt
        .query_map([], neighbor_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(neighbors)
}

pub fn get_neighbor(conn: &Connection, neighbor_id: i64) -> Result<Option<Neighbor>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, address, created_at
         FROM neighbors
         WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map(params![neighbor_id], neighbor_from_row)?;

    match rows.next() {
        Some(neighbor) => Ok(Some(neighbor?)),
        None => Ok(None),
    }
}

/// Portal search: case-insensitive substring match against first name,
/// last name and address. `%`/`_` in the query match literally.
pub fn search_neighbors(conn: &Connection, query: &str) -> Result<Vec<NeighborSummary>> {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{escaped}%");

    let mut stmt = conn.prepare(
        "SELECT n.id, n.first_name, n.last_name, n.address, n.created_at,
                (SELECT COUNT(*) FROM vehicles v WHERE v.neighbor_id = n.id),
                (SELECT COUNT(*) FROM payments p WHERE p.neighbor_id = n.id)
         FROM neighbors n
         WHERE LOWER(n.first_name) LIKE ?1 ESCAPE '\\'
            OR LOWER(n.last_name) LIKE ?1 ESCAPE '\\'
            OR LOWER(n.address) LIKE ?1 ESCAPE '\\'
         ORDER BY n.last_name COLLATE NOCASE, n.first_name COLLATE NOCASE",
    )?;

    let summaries = stmt
        .query_map(params![pattern], |row| {
            Ok(NeighborSummary {
                neighbor: neighbor_from_row(row)?,
                vehicle_count: row.get(5)?,
                payment_count: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(summaries)
}

/// Stored receipt filenames for every payment of a neighbor.
/// Callers delete these files before deleting the neighbor row.
pub fn neighbor_receipt_files(conn: &Connection, neighbor_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT receipt_file FROM payments
         WHERE neighbor_id = ?1 AND receipt_file IS NOT NULL",
    )?;

    let files = stmt
        .query_map(params![neighbor_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(files)
}

/// Delete a neighbor; vehicles and payments go with it via cascade.
/// Returns false when the id did not resolve.
pub fn delete_neighbor(conn: &Connection, neighbor_id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM neighbors WHERE id = ?1", params![neighbor_id])?;

    Ok(affected > 0)
}

// ============================================================================
// Vehicles
// ============================================================================

pub fn insert_vehicle(
    conn: &Connection,
    neighbor_id: i64,
    license_plate: &str,
    make: &str,
    model: &str,
    control_number: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO vehicles (neighbor_id, license_plate, make, model, control_number, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            neighbor_id,
            license_plate,
            make,
            model,
            control_number,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn list_vehicles(conn: &Connection, neighbor_id: i64) -> Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(
        "SELECT id, neighbor_id, license_plate, make, model, control_number, created_at
         FROM vehicles
         WHERE neighbor_id = ?1
         ORDER BY created_at DESC",
    )?;

    let vehicles = stmt
        .query_map(params![neighbor_id], |row| {
            let created_at: String = row.get(6)?;
            Ok(Vehicle {
                id: row.get(0)?,
                neighbor_id: row.get(1)?,
                license_plate: row.get(2)?,
                make: row.get(3)?,
                model: row.get(4)?,
                control_number: row.get(5)?,
                created_at: parse_timestamp(&created_at)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(vehicles)
}

/// Delete a vehicle only when it belongs to the given neighbor, so a
/// manipulated path cannot remove another neighbor's vehicle.
pub fn delete_vehicle(conn: &Connection, neighbor_id: i64, vehicle_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM vehicles WHERE id = ?1 AND neighbor_id = ?2",
        params![vehicle_id, neighbor_id],
    )?;

    Ok(affected > 0)
}

// ============================================================================
// Payments
// ============================================================================

pub fn insert_payment(
    conn: &Connection,
    neighbor_id: i64,
    method: &str,
    amount: f64,
    deposit_account: Option<&str>,
    receipt_file: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO payments (neighbor_id, method, amount, deposit_account, receipt_file, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            neighbor_id,
            method,
            amount,
            deposit_account,
            receipt_file,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn payment_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<Payment, rusqlite::Error> {
    let created_at: String = row.get(6)?;
    Ok(Payment {
        id: row.get(0)?,
        neighbor_id: row.get(1)?,
        method: row.get(2)?,
        amount: row.get(3)?,
        deposit_account: row.get(4)?,
        receipt_file: row.get(5)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub fn list_payments(conn: &Connection, neighbor_id: i64) -> Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, neighbor_id, method, amount, deposit_account, receipt_file, created_at
         FROM payments
         WHERE neighbor_id = ?1
         ORDER BY created_at DESC",
    )?;

    let payments = stmt
        .query_map(params![neighbor_id], payment_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(payments)
}

/// Look up a payment scoped to its neighbor.
pub fn get_payment(conn: &Connection, neighbor_id: i64, payment_id: i64) -> Result<Option<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, neighbor_id, method, amount, deposit_account, receipt_file, created_at
         FROM payments
         WHERE id = ?1 AND neighbor_id = ?2",
    )?;

    let mut rows = stmt.query_map(params![payment_id, neighbor_id], payment_from_row)?;

    match rows.next() {
        Some(payment) => Ok(Some(payment?)),
        None => Ok(None),
    }
}

pub fn delete_payment(conn: &Connection, neighbor_id: i64, payment_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM payments WHERE id = ?1 AND neighbor_id = ?2",
        params![payment_id, neighbor_id],
    )?;

    Ok(affected > 0)
}

pub fn count_neighbors(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM neighbors", [], |row| row.get(0))?;

    Ok(count)
}

pub fn count_payments(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_list_neighbors() {
        let conn = test_conn();

        insert_neighbor(&conn, "Ana", "Pérez", "Calle 1").unwrap();
        insert_neighbor(&conn, "Bruno", "Aguilar", "Calle 2").unwrap();

        let alpha = list_neighbors_alpha(&conn).unwrap();
        assert_eq!(alpha.len(), 2);
        assert_eq!(alpha[0].last_name, "Aguilar");
        assert_eq!(alpha[1].full_name(), "Ana Pérez");

        let dashboard = list_neighbors_dashboard(&conn).unwrap();
        assert_eq!(dashboard.len(), 2);
        assert_eq!(dashboard[0].vehicle_count, 0);
        assert_eq!(dashboard[0].payment_count, 0);
    }

    #[test]
    fn test_delete_neighbor_cascades() {
        let conn = test_conn();

        let ana = insert_neighbor(&conn, "Ana", "Pérez", "Calle 1").unwrap();
        insert_vehicle(&conn, ana, "ABC123", "Toyota", "Corolla", "CTRL-1").unwrap();
        insert_payment(&conn, ana, "efectivo", 150.0, None, Some("r1.png")).unwrap();
        insert_payment(&conn, ana, "deposito", 300.0, Some("BBVA 1234"), None).unwrap();

        let files = neighbor_receipt_files(&conn, ana).unwrap();
        assert_eq!(files, vec!["r1.png".to_string()]);

        assert!(delete_neighbor(&conn, ana).unwrap());
        assert!(get_neighbor(&conn, ana).unwrap().is_none());
        assert!(list_vehicles(&conn, ana).unwrap().is_empty());
        assert!(list_payments(&conn, ana).unwrap().is_empty());

        // Unknown id reports failure instead of erroring
        assert!(!delete_neighbor(&conn, ana).unwrap());
    }

    #[test]
    fn test_delete_vehicle_requires_owner() {
        let conn = test_conn();

        let ana = insert_neighbor(&conn, "Ana", "Pérez", "Calle 1").unwrap();
        let bruno = insert_neighbor(&conn, "Bruno", "Aguilar", "Calle 2").unwrap();
        let vehicle = insert_vehicle(&conn, ana, "ABC123", "Toyota", "Corolla", "CTRL-1").unwrap();

        assert!(!delete_vehicle(&conn, bruno, vehicle).unwrap());
        assert_eq!(list_vehicles(&conn, ana).unwrap().len(), 1);

        assert!(delete_vehicle(&conn, ana, vehicle).unwrap());
        assert!(list_vehicles(&conn, ana).unwrap().is_empty());
    }

    #[test]
    fn test_payment_scoping() {
        let conn = test_conn();

        let ana = insert_neighbor(&conn, "Ana", "Pérez", "Calle 1").unwrap();
        let bruno = insert_neighbor(&conn, "Bruno", "Aguilar", "Calle 2").unwrap();
        let payment = insert_payment(&conn, ana, "efectivo", 150.0, None, None).unwrap();

        assert!(get_payment(&conn, bruno, payment).unwrap().is_none());
        assert!(!delete_payment(&conn, bruno, payment).unwrap());
        assert_eq!(count_payments(&conn).unwrap(), 1);

        let found = get_payment(&conn, ana, payment).unwrap().unwrap();
        assert_eq!(found.method, "efectivo");
        assert_eq!(found.amount, 150.0);

        assert!(delete_payment(&conn, ana, payment).unwrap());
        assert_eq!(count_payments(&conn).unwrap(), 0);
    }

    #[test]
    fn test_search_case_insensitive_substring() {
        let conn = test_conn();

        insert_neighbor(&conn, "Ana", "Pérez", "Calle Robles 12").unwrap();
        insert_neighbor(&conn, "Bruno", "Aguilar", "Avenida Sur 4").unwrap();

        let by_last = search_neighbors(&conn, "PéR").unwrap();
        assert_eq!(by_last.len(), 1);
        assert_eq!(by_last[0].neighbor.first_name, "Ana");

        let by_address = search_neighbors(&conn, "robles").unwrap();
        assert_eq!(by_address.len(), 1);

        let none = search_neighbors(&conn, "zzz").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let conn = test_conn();

        insert_neighbor(&conn, "Ana", "Pérez", "Calle 1").unwrap();
        insert_neighbor(&conn, "100%", "Sánchez", "Calle 2").unwrap();

        assert!(search_neighbors(&conn, "%").unwrap().len() == 1);
        assert_eq!(search_neighbors(&conn, "100%").unwrap().len(), 1);
        assert!(search_neighbors(&conn, "_").unwrap().is_empty());
    }

    #[test]
    fn test_dashboard_counts_and_order() {
        let conn = test_conn();

        let ana = insert_neighbor(&conn, "Ana", "Pérez", "Calle 1").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let bruno = insert_neighbor(&conn, "Bruno", "Aguilar", "Calle 2").unwrap();

        insert_vehicle(&conn, ana, "ABC123", "Toyota", "Corolla", "CTRL-1").unwrap();
        insert_vehicle(&conn, ana, "XYZ987", "Nissan", "Versa", "CTRL-2").unwrap();
        insert_payment(&conn, bruno, "efectivo", 150.0, None, None).unwrap();

        let rows = list_neighbors_dashboard(&conn).unwrap();
        // Newest first
        assert_eq!(rows[0].neighbor.id, bruno);
        assert_eq!(rows[0].payment_count, 1);
        assert_eq!(rows[1].neighbor.id, ana);
        assert_eq!(rows[1].vehicle_count, 2);
    }
}
