/// Health recorder: appends observations and enforces retention

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::params;
use tracing::debug;

use crate::core::error::StorageError;
use crate::core::models::{HealthCheck, Observation, RetentionPolicy};
use crate::core::storage::Database;

/// RFC 3339 in UTC with fixed microsecond precision, so stored values sort
/// lexicographically in time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    /// Append one immutable observation for a service
    pub fn record(&self, service_id: i64, observation: &Observation) -> Result<HealthCheck, StorageError> {
        let checked_at = Utc::now().trunc_subsecs(6);
        let response_time = observation
            .response_time_ms
            .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));

        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO health_checks (service_id, status, response_time_ms, error_message, checked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    service_id,
                    observation.status,
                    response_time,
                    observation.error_message,
                    timestamp(checked_at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(HealthCheck {
            id,
            service_id,
            status: observation.status,
            response_time_ms: observation.response_time_ms,
            error_message: observation.error_message.clone(),
            checked_at,
        })
    }

    /// Delete history outside the retention policy. Returns rows removed.
    pub fn prune(&self, policy: &RetentionPolicy) -> Result<usize, StorageError> {
        let removed = self.with_conn(|conn| {
            let mut removed = 0;

            if let Some(days) = policy.max_age_days {
                let cutoff = Utc::now() - Duration::days(i64::from(days));
                removed += conn.execute(
                    "DELETE FROM health_checks WHERE checked_at < ?1",
                    [timestamp(cutoff)],
                )?;
            }

            if let Some(max_rows) = policy.max_rows_per_service {
                removed += conn.execute(
                    "DELETE FROM health_checks WHERE id IN (
                        SELECT id FROM (
                            SELECT id, ROW_NUMBER() OVER (PARTITION BY service_id ORDER BY id DESC) AS rn
                            FROM health_checks
                        ) WHERE rn > ?1
                    )",
                    [max_rows as i64],
                )?;
            }

            Ok(removed)
        })?;

        if removed > 0 {
            debug!(removed, "pruned health history");
        }
        Ok(removed)
    }

    pub fn count_health_checks(&self, service_id: i64) -> Result<usize, StorageError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM health_checks WHERE service_id = ?1",
                [service_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }
}
