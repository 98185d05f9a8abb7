use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Error, Result};

/// Handle to the catalog database. Each operation opens its own connection
/// and releases it when done; nothing is shared between calls.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductType {
    pub id: String,
    pub name: String,
    pub price_per_kg: f64,
    pub color: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub orange_id: String,
    pub height_cm: f64,
    pub radius_cm: f64,
    pub diameter_cm: f64,
    pub weight_avg_g: f64,
}

/// A calculation about to be recorded; id and date are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    pub orange_id: String,
    pub weight_kg: f64,
    pub price_per_kg: f64,
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationRecord {
    pub id: i64,
    pub orange_id: String,
    pub weight_kg: f64,
    pub price_per_kg: f64,
    pub total_price: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCount {
    pub orange_id: String,
    pub count: i64,
}

pub enum SeedOutcome {
    Seeded { products: usize, measurements: usize },
    AlreadySeeded(ProductType),
}

// ── Reference data ──

pub const SEED_PRODUCTS: &[(&str, &str, f64, &str, &str)] = &[
    ("tangerine", "Tangerine", 45.0, "Orange", "A+"),
    ("green-sweet", "Green Sweet Orange", 35.0, "Green", "A"),
    ("mandarin", "Mandarin Orange", 55.0, "Light Orange", "A+"),
];

const SEED_MEASUREMENTS: &[(&str, f64, f64, f64, f64)] = &[
    ("tangerine", 7.5, 3.8, 7.6, 120.0),
    ("green-sweet", 8.2, 4.1, 8.2, 150.0),
    ("mandarin", 6.8, 3.5, 7.0, 100.0),
];

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }

    pub fn init_schema(&self) -> Result<()> {
        self.connect()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS orange_types (
                id           INTEGER PRIMARY KEY,
                orange_id    TEXT UNIQUE NOT NULL,
                name         TEXT NOT NULL,
                price_per_kg REAL NOT NULL CHECK(price_per_kg >= 0),
                color        TEXT,
                grade        TEXT
            );

            CREATE TABLE IF NOT EXISTS orange_measurements (
                id           INTEGER PRIMARY KEY,
                orange_id    TEXT NOT NULL REFERENCES orange_types(orange_id),
                height_cm    REAL NOT NULL,
                radius_cm    REAL NOT NULL,
                diameter_cm  REAL NOT NULL,
                weight_avg_g REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_measurements_orange ON orange_measurements(orange_id);

            CREATE TABLE IF NOT EXISTS price_calculations (
                id           INTEGER PRIMARY KEY,
                orange_id    TEXT NOT NULL REFERENCES orange_types(orange_id),
                weight_kg    REAL NOT NULL CHECK(weight_kg > 0),
                price_per_kg REAL NOT NULL,
                total_price  REAL NOT NULL,
                date         TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_calculations_date ON price_calculations(date);
            ",
        )?;
        Ok(())
    }

    /// Insert the reference products and measurements. Existing data is left
    /// alone unless `force`, which wipes the catalog and its history first.
    pub fn seed(&self, force: bool) -> Result<SeedOutcome> {
        let conn = self.connect()?;
        let tx = conn.unchecked_transaction()?;

        if !force {
            let existing = tx
                .query_row(
                    "SELECT orange_id, name, price_per_kg, color, grade
                     FROM orange_types ORDER BY id LIMIT 1",
                    [],
                    product_from_row,
                )
                .optional()?;
            if let Some(p) = existing {
                return Ok(SeedOutcome::AlreadySeeded(p));
            }
        } else {
            tx.execute_batch(
                "DELETE FROM price_calculations;
                 DELETE FROM orange_measurements;
                 DELETE FROM orange_types;",
            )?;
        }

        {
            let mut p_stmt = tx.prepare(
                "INSERT INTO orange_types (orange_id, name, price_per_kg, color, grade)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (id, name, price, color, grade) in SEED_PRODUCTS {
                p_stmt.execute(rusqlite::params![id, name, price, color, grade])?;
            }

            let mut m_stmt = tx.prepare(
                "INSERT INTO orange_measurements
                 (orange_id, height_cm, radius_cm, diameter_cm, weight_avg_g)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (id, height, radius, diameter, weight) in SEED_MEASUREMENTS {
                m_stmt.execute(rusqlite::params![id, height, radius, diameter, weight])?;
            }
        }
        tx.commit()?;

        Ok(SeedOutcome::Seeded {
            products: SEED_PRODUCTS.len(),
            measurements: SEED_MEASUREMENTS.len(),
        })
    }

    // ── Product types ──

    pub fn list_product_types(&self) -> Result<Vec<ProductType>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT orange_id, name, price_per_kg, color, grade FROM orange_types ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], product_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_product_type(&self, orange_id: &str) -> Result<Option<ProductType>> {
        let conn = self.connect()?;
        let product = conn
            .query_row(
                "SELECT orange_id, name, price_per_kg, color, grade
                 FROM orange_types WHERE orange_id = ?1",
                [orange_id],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    /// Returns whether a product was updated; unknown ids are a no-op.
    pub fn update_unit_price(&self, orange_id: &str, price_per_kg: f64) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE orange_types SET price_per_kg = ?2 WHERE orange_id = ?1",
            rusqlite::params![orange_id, price_per_kg],
        )?;
        Ok(changed > 0)
    }

    pub fn count_product_types(&self) -> Result<i64> {
        let conn = self.connect()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM orange_types", [], |r| r.get(0))?)
    }

    // ── Measurements ──

    pub fn get_measurement(&self, orange_id: &str) -> Result<Option<Measurement>> {
        let conn = self.connect()?;
        let m = conn
            .query_row(
                "SELECT orange_id, height_cm, radius_cm, diameter_cm, weight_avg_g
                 FROM orange_measurements WHERE orange_id = ?1 ORDER BY id LIMIT 1",
                [orange_id],
                measurement_from_row,
            )
            .optional()?;
        Ok(m)
    }

    pub fn list_measurements(&self) -> Result<Vec<Measurement>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT orange_id, height_cm, radius_cm, diameter_cm, weight_avg_g
             FROM orange_measurements ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], measurement_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Calculations ──

    /// Append one calculation, dated today. The product must exist; the check
    /// and the insert share one transaction so a failure leaves nothing behind.
    pub fn insert_calculation(&self, calc: &NewCalculation) -> Result<CalculationRecord> {
        let conn = self.connect()?;
        let tx = conn.unchecked_transaction()?;

        let known: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM orange_types WHERE orange_id = ?1)",
            [&calc.orange_id],
            |r| r.get(0),
        )?;
        if !known {
            return Err(Error::NotFound(calc.orange_id.clone()));
        }

        let date = Local::now().date_naive();
        tx.execute(
            "INSERT INTO price_calculations (orange_id, weight_kg, price_per_kg, total_price, date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                calc.orange_id, calc.weight_kg, calc.price_per_kg, calc.total_price, date,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(CalculationRecord {
            id,
            orange_id: calc.orange_id.clone(),
            weight_kg: calc.weight_kg,
            price_per_kg: calc.price_per_kg,
            total_price: calc.total_price,
            date,
        })
    }

    /// Most recent first.
    pub fn list_calculations(&self, limit: usize) -> Result<Vec<CalculationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, orange_id, weight_kg, price_per_kg, total_price, date
             FROM price_calculations
             ORDER BY date DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(CalculationRecord {
                    id: row.get(0)?,
                    orange_id: row.get(1)?,
                    weight_kg: row.get(2)?,
                    price_per_kg: row.get(3)?,
                    total_price: row.get(4)?,
                    date: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_calculations(&self) -> Result<i64> {
        let conn = self.connect()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM price_calculations", [], |r| r.get(0))?)
    }

    /// Product with the most calculations; ties go to the smaller id.
    pub fn most_frequent_calculation_product(&self) -> Result<Option<ProductCount>> {
        let conn = self.connect()?;
        let top = conn
            .query_row(
                "SELECT orange_id, COUNT(*) AS n
                 FROM price_calculations
                 GROUP BY orange_id
                 ORDER BY n DESC, orange_id
                 LIMIT 1",
                [],
                |r| {
                    Ok(ProductCount {
                        orange_id: r.get(0)?,
                        count: r.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(top)
    }
}

fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<ProductType> {
    Ok(ProductType {
        id: row.get(0)?,
        name: row.get(1)?,
        price_per_kg: row.get(2)?,
        color: row.get(3)?,
        grade: row.get(4)?,
    })
}

fn measurement_from_row(row: &rusqlite::Row) -> rusqlite::Result<Measurement> {
    Ok(Measurement {
        orange_id: row.get(0)?,
        height_cm: row.get(1)?,
        radius_cm: row.get(2)?,
        diameter_cm: row.get(3)?,
        weight_avg_g: row.get(4)?,
    })
}
