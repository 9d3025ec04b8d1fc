//! SQLite-backed fill store.
//!
//! The `fills` table mirrors the API record column for column with no key or
//! index: inserts are append-only and duplicates from overlapping pages are
//! removed afterwards by [`FillStore::deduplicate`]. Volume figures are folded
//! in Rust with `Decimal` so no precision is lost to SQLite REAL arithmetic.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::{notional, underlying, Fill, TakerSide};
use crate::timestamp::calendar_date;

/// Rows shown by the "Best Days" report unless configured otherwise.
pub const DEFAULT_BEST_DAYS: usize = 7;

const FILLS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS fills (
    base_size TEXT,
    block_timestamp TEXT,
    inserted_at TEXT,
    maker_client_order_id TEXT,
    maker_order_id TEXT,
    maker_order_nonce TEXT,
    maker_trg TEXT,
    mpg TEXT,
    price TEXT,
    product TEXT,
    quote_size TEXT,
    slot INTEGER,
    taker_client_order_id TEXT,
    taker_order_nonce TEXT,
    taker_side TEXT,
    taker_trg TEXT,
    tx_sig TEXT
);
"#;

const FILL_COLUMNS: &str = "base_size, block_timestamp, inserted_at, maker_client_order_id, \
    maker_order_id, maker_order_nonce, maker_trg, mpg, price, product, quote_size, slot, \
    taker_client_order_id, taker_order_nonce, taker_side, taker_trg, tx_sig";

// SQLite keeps one arbitrary row per group for the bare columns.
const DEDUPLICATE_SQL: &str = r#"
CREATE TEMP TABLE temp_fills AS
SELECT *
FROM (
    SELECT *
    FROM fills
    ORDER BY maker_order_id, taker_order_nonce
)
GROUP BY maker_order_id, taker_order_nonce;

DELETE FROM fills;

INSERT INTO fills SELECT * FROM temp_fills;

DROP TABLE temp_fills;
"#;

/// Notional volume attributed to one underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductVolume {
    pub underlying: String,
    pub volume: Decimal,
}

/// Notional volume traded on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub date: String,
    pub volume: Decimal,
}

struct NotionalRow {
    product: String,
    block_timestamp: String,
    notional: Decimal,
}

/// Handle on the local fills database.
///
/// One connection is held for the lifetime of the value and closed on drop.
pub struct FillStore {
    conn: Connection,
}

impl FillStore {
    /// Open or create the database at `path`, creating the `fills` table if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open fills database: {}", path.display()))?;
        conn.execute_batch(FILLS_SCHEMA)
            .context("Failed to create fills table")?;

        info!(path = %path.display(), "Fill store opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(FILLS_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Append `fills` as new rows in a single transaction.
    ///
    /// Existing rows are not consulted; duplicates are allowed until
    /// [`FillStore::deduplicate`] runs.
    pub fn insert(&mut self, fills: &[Fill]) -> Result<usize> {
        if fills.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO fills ({FILL_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for fill in fills {
                let slot = i64::try_from(fill.slot)
                    .with_context(|| format!("Slot {} does not fit in SQLite INTEGER", fill.slot))?;
                stmt.execute(params![
                    fill.base_size.to_string(),
                    fill.block_timestamp,
                    fill.inserted_at,
                    fill.maker_client_order_id,
                    fill.maker_order_id,
                    fill.maker_order_nonce,
                    fill.maker_trg,
                    fill.mpg,
                    fill.price.to_string(),
                    fill.product,
                    fill.quote_size.to_string(),
                    slot,
                    fill.taker_client_order_id,
                    fill.taker_order_nonce,
                    fill.taker_side.as_str(),
                    fill.taker_trg,
                    fill.tx_sig,
                ])
                .context("Failed to insert fill")?;
            }
        }
        tx.commit().context("Failed to commit fills")?;

        debug!(rows = fills.len(), "Inserted fills");
        Ok(fills.len())
    }

    /// Collapse the table to one row per (maker order id, taker order nonce).
    ///
    /// Which duplicate survives is unspecified. Returns the number of rows removed.
    pub fn deduplicate(&mut self) -> Result<usize> {
        let before = self.count()?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(DEDUPLICATE_SQL)
            .context("Failed to deduplicate fills")?;
        tx.commit()?;

        let after = self.count()?;
        let removed = before.saturating_sub(after);
        info!(before, after, removed, "Deduplicated fills");
        Ok(removed)
    }

    /// Number of rows currently stored.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fills", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Every stored row, in insertion order.
    pub fn fills(&self) -> Result<Vec<Fill>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FILL_COLUMNS} FROM fills ORDER BY rowid"))?;
        let rows = stmt
            .query_map([], |row| {
                (0..17)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(fill_from_values).collect()
    }

    /// Sum of `price * base_size` over all rows; `None` when there is nothing to sum.
    pub fn total_volume(&self) -> Result<Option<Decimal>> {
        let rows = self.notional_rows()?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut total = Decimal::ZERO;
        for row in &rows {
            accumulate(&mut total, row.notional)?;
        }
        Ok(Some(total))
    }

    /// Notional volume per underlying, largest first.
    pub fn volume_per_product(&self) -> Result<Vec<ProductVolume>> {
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in self.notional_rows()? {
            let total = totals
                .entry(underlying(&row.product).to_string())
                .or_default();
            accumulate(total, row.notional)?;
        }

        let mut volumes: Vec<ProductVolume> = totals
            .into_iter()
            .map(|(underlying, volume)| ProductVolume { underlying, volume })
            .collect();
        volumes.sort_by(|a, b| {
            b.volume
                .cmp(&a.volume)
                .then_with(|| a.underlying.cmp(&b.underlying))
        });
        Ok(volumes)
    }

    /// The `n` calendar dates with the most notional volume, largest first.
    pub fn best_days(&self, n: usize) -> Result<Vec<DailyVolume>> {
        let mut days: Vec<DailyVolume> = self
            .daily_volumes()?
            .into_iter()
            .map(|(date, volume)| DailyVolume { date, volume })
            .collect();
        days.sort_by(|a, b| b.volume.cmp(&a.volume).then_with(|| a.date.cmp(&b.date)));
        days.truncate(n);
        Ok(days)
    }

    /// Mean of the per-day notional sums over days with activity.
    pub fn average_daily_volume(&self) -> Result<Option<Decimal>> {
        let days = self.daily_volumes()?;
        mean(days.values().copied())
    }

    /// For each underlying, the mean of its per-(product, day) notional sums.
    ///
    /// Ordered by underlying.
    pub fn average_daily_volume_per_product(&self) -> Result<Vec<ProductVolume>> {
        let mut product_days: BTreeMap<(String, String), Decimal> = BTreeMap::new();
        for row in self.notional_rows()? {
            let date = calendar_date(&row.block_timestamp).to_string();
            accumulate(
                product_days.entry((row.product, date)).or_default(),
                row.notional,
            )?;
        }

        let mut per_underlying: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
        for ((product, _date), volume) in product_days {
            per_underlying
                .entry(underlying(&product).to_string())
                .or_default()
                .push(volume);
        }

        let mut averages = Vec::with_capacity(per_underlying.len());
        for (underlying, volumes) in per_underlying {
            if let Some(volume) = mean(volumes.into_iter())? {
                averages.push(ProductVolume { underlying, volume });
            }
        }
        Ok(averages)
    }

    fn daily_volumes(&self) -> Result<BTreeMap<String, Decimal>> {
        let mut days: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in self.notional_rows()? {
            let total = days
                .entry(calendar_date(&row.block_timestamp).to_string())
                .or_default();
            accumulate(total, row.notional)?;
        }
        Ok(days)
    }

    /// Rows with a computable notional. Rows with a NULL price or size are
    /// skipped, as SQL aggregates skip NULL products.
    fn notional_rows(&self) -> Result<Vec<NotionalRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT product, block_timestamp, price, base_size FROM fills")?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Value>(0)?,
                    row.get::<_, Value>(1)?,
                    row.get::<_, Value>(2)?,
                    row.get::<_, Value>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (product, block_timestamp, price, base_size) in raw {
            let (Some(price), Some(base_size)) = (
                decimal_from_value(price, "price")?,
                decimal_from_value(base_size, "base_size")?,
            ) else {
                continue;
            };
            let product = text_from_value(product).unwrap_or_default();
            let notional = notional(price, base_size).with_context(|| {
                format!("Notional overflows for {product}: {price} * {base_size}")
            })?;
            rows.push(NotionalRow {
                product,
                block_timestamp: text_from_value(block_timestamp).unwrap_or_default(),
                notional,
            });
        }
        Ok(rows)
    }
}

fn accumulate(total: &mut Decimal, value: Decimal) -> Result<()> {
    let sum = total
        .checked_add(value)
        .with_context(|| format!("Notional volume overflows: {total} + {value}"))?;
    *total = sum;
    Ok(())
}

fn mean(values: impl Iterator<Item = Decimal>) -> Result<Option<Decimal>> {
    let mut sum = Decimal::ZERO;
    let mut count = 0u64;
    for value in values {
        accumulate(&mut sum, value)?;
        count += 1;
    }
    if count == 0 {
        return Ok(None);
    }
    sum.checked_div(Decimal::from(count))
        .map(Some)
        .context("Average notional volume is out of range")
}

fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

/// Decimal from a cell written either by this crate (TEXT) or by other tools (REAL/INTEGER).
fn decimal_from_value(value: Value, column: &str) -> Result<Option<Decimal>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(Decimal::from(i))),
        Value::Real(f) => Decimal::try_from(f)
            .map(Some)
            .with_context(|| format!("Invalid {column} value: {f}")),
        Value::Text(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map(Some)
            .with_context(|| format!("Invalid {column} value: {s:?}")),
        Value::Blob(_) => anyhow::bail!("Invalid {column} value: unexpected blob"),
    }
}

fn fill_from_values(values: Vec<Value>) -> Result<Fill> {
    let mut values = values.into_iter();
    let mut next_text = || values.next().and_then(text_from_value);

    let base_size = next_text();
    let block_timestamp = next_text().unwrap_or_default();
    let inserted_at = next_text().unwrap_or_default();
    let maker_client_order_id = next_text();
    let maker_order_id = next_text().unwrap_or_default();
    let maker_order_nonce = next_text().unwrap_or_default();
    let maker_trg = next_text().unwrap_or_default();
    let mpg = next_text().unwrap_or_default();
    let price = next_text();
    let product = next_text().unwrap_or_default();
    let quote_size = next_text();
    let slot = next_text();
    let taker_client_order_id = next_text();
    let taker_order_nonce = next_text().unwrap_or_default();
    let taker_side = next_text().unwrap_or_default();
    let taker_trg = next_text().unwrap_or_default();
    let tx_sig = next_text().unwrap_or_default();

    let decimal = |value: Option<String>, column: &str| -> Result<Decimal> {
        Ok(decimal_from_value(value.map(Value::Text).unwrap_or(Value::Null), column)?
            .unwrap_or_default())
    };

    Ok(Fill {
        base_size: decimal(base_size, "base_size")?,
        block_timestamp,
        inserted_at,
        maker_client_order_id,
        maker_order_id,
        maker_order_nonce,
        maker_trg,
        mpg,
        price: decimal(price, "price")?,
        product,
        quote_size: decimal(quote_size, "quote_size")?,
        slot: slot
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("Invalid slot value")?
            .unwrap_or_default(),
        taker_client_order_id,
        taker_order_nonce,
        taker_side: TakerSide::parse(&taker_side)
            .with_context(|| format!("Invalid taker_side value: {taker_side:?}"))?,
        taker_trg,
        tx_sig,
    })
}
