//! SQLite digit sink
//!
//! Outputs live in the `digitizations` table (name is the primary key, so a
//! second registration under the same name is refused by the database),
//! digits in the `digits` table keyed by `(output, event, list_index)`.
//! Each event is written in one transaction: either all its digits are
//! stored or none.

use super::DigitSink;
use crate::channel::ChannelId;
use crate::digit::{Digit, Provenance};
use crate::error::{Error, Result};
use crate::params::ParameterSnapshot;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::debug;

/// Stores digits in a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Wrap a pool whose schema is already created
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = phos_common::db::init_database(path).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let pool = phos_common::db::init_memory_database().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Parameter snapshot of a registered output
    pub async fn load_parameters(&self, name: &str) -> Result<Option<ParameterSnapshot>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT parameters FROM digitizations WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Digits of one event, in list order
    pub async fn load_event(&self, name: &str, event: usize) -> Result<Vec<Digit>> {
        let rows: Vec<(i64, i64, f64, f64, String)> = sqlx::query_as(
            r#"
            SELECT list_index, channel, amplitude, time, provenance
            FROM digits
            WHERE digitization = ? AND event = ?
            ORDER BY list_index
            "#,
        )
        .bind(name)
        .bind(event as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(list_index, channel, amplitude, time, provenance)| -> Result<Digit> {
                let provenance: Vec<Provenance> = serde_json::from_str(&provenance)?;
                Ok(Digit {
                    channel: channel as ChannelId,
                    amplitude,
                    time,
                    provenance,
                    list_index: Some(list_index as usize),
                })
            })
            .collect()
    }

    /// Events stored under an output
    pub async fn event_count(&self, name: &str) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT event) FROM digits WHERE digitization = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DigitSink for SqliteSink {
    async fn output_exists(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM digitizations WHERE name = ?)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn register_output(&self, parameters: &ParameterSnapshot) -> Result<()> {
        let json = serde_json::to_string(parameters)?;

        let result = sqlx::query(
            "INSERT INTO digitizations (name, run_id, parameters, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&parameters.output_name)
        .bind(parameters.run_id.to_string())
        .bind(json)
        .bind(parameters.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::DuplicateOutput(parameters.output_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store_event(&self, name: &str, event: usize, digits: &[Digit]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for digit in digits {
            let list_index = digit.list_index.ok_or_else(|| {
                Error::Configuration(format!(
                    "digit on channel {} has no list index; compact before storing",
                    digit.channel
                ))
            })?;
            let provenance = serde_json::to_string(&digit.provenance)?;

            sqlx::query(
                r#"
                INSERT INTO digits (digitization, event, list_index, channel, amplitude, time, provenance)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(name)
            .bind(event as i64)
            .bind(list_index as i64)
            .bind(digit.channel as i64)
            .bind(digit.amplitude)
            .bind(digit.time)
            .bind(provenance)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Stored {} digits for event {} of '{}'", digits.len(), event, name);
        Ok(())
    }
}
