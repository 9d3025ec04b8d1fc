//! Volume report assembled from the deduplicated store.

use std::io::Write;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::format::format_currency;
use crate::store::{DailyVolume, FillStore, ProductVolume};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeReport {
    pub total_volume: Decimal,
    pub volume_per_product: Vec<ProductVolume>,
    pub best_days: Vec<DailyVolume>,
    pub average_daily_volume: Decimal,
    pub average_daily_volume_per_product: Vec<ProductVolume>,
}

impl VolumeReport {
    /// Run every aggregation. Run after deduplication.
    ///
    /// An empty store has no total or daily average, which is reported as an
    /// error rather than rendered as zero.
    pub fn from_store(store: &FillStore, best_days: usize) -> Result<Self> {
        let total_volume = store
            .total_volume()?
            .context("No fills in the store: total volume is undefined")?;
        let average_daily_volume = store
            .average_daily_volume()?
            .context("No fills in the store: average daily volume is undefined")?;

        Ok(Self {
            total_volume,
            volume_per_product: store.volume_per_product()?,
            best_days: store.best_days(best_days)?,
            average_daily_volume,
            average_daily_volume_per_product: store.average_daily_volume_per_product()?,
        })
    }

    pub fn render_text(&self, display: &DisplayConfig, out: &mut impl Write) -> Result<()> {
        let money = |value: Decimal| format_currency(value, display);

        writeln!(out, "\nTotal Volume: {}", money(self.total_volume))?;

        writeln!(out, "\nVolume Per Product:")?;
        for row in &self.volume_per_product {
            writeln!(out, "{} {}", row.underlying, money(row.volume))?;
        }

        writeln!(out, "\nBest Days:")?;
        for row in &self.best_days {
            writeln!(out, "{} {}", row.date, money(row.volume))?;
        }

        writeln!(
            out,
            "\nAverage Notional Volume Per Day: {}",
            money(self.average_daily_volume)
        )?;

        writeln!(out, "\nAverage Notional Volume Per Day Per Product:")?;
        for row in &self.average_daily_volume_per_product {
            writeln!(out, "{} {}", row.underlying, money(row.volume))?;
        }

        Ok(())
    }

    pub fn render_json(&self, out: &mut impl Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self).context("Failed to serialize report")?;
        writeln!(out)?;
        Ok(())
    }
}
