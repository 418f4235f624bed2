//! # Settings Repository
//!
//! String key/value configuration with typed read-through accessors.
//!
//! The checkout coordinator holds one of these and reads `tax_rate` at
//! transaction time - the rate in effect is whatever is current at that
//! moment, never pinned per-cart. Tests pin a rate by writing the row.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use till_core::{Setting, TaxRate, DEFAULT_TAX_RATE_BPS};

/// Key under which the tax percentage is stored.
pub const TAX_RATE_KEY: &str = "tax_rate";

/// Repository for configuration settings.
#[derive(Debug, Clone)]
pub struct SettingRepository {
    pool: SqlitePool,
}

impl SettingRepository {
    /// Creates a new SettingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingRepository { pool }
    }

    /// Gets a setting by key.
    pub async fn get(&self, key: &str) -> DbResult<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM settings WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    /// Upserts a setting.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, value = %value, "Writing setting");

        let now = Utc::now();

        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads the current tax rate.
    ///
    /// The setting stores a percentage string ("10", "8.25"). Absent or
    /// unparseable values fall back to the 10% default so checkout keeps
    /// working on a fresh database.
    pub async fn tax_rate(&self) -> DbResult<TaxRate> {
        let setting = self.get(TAX_RATE_KEY).await?;

        let rate = match setting {
            Some(setting) => match setting.value.trim().parse::<f64>() {
                Ok(pct) if pct >= 0.0 => TaxRate::from_percentage(pct),
                _ => {
                    warn!(value = %setting.value, "Unparseable tax_rate setting, using default");
                    TaxRate::from_bps(DEFAULT_TAX_RATE_BPS)
                }
            },
            None => TaxRate::from_bps(DEFAULT_TAX_RATE_BPS),
        };

        Ok(rate)
    }
}
