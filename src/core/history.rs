/// History aggregator: read-side reductions over recorded observations

use rusqlite::OptionalExtension;

use crate::core::error::StorageError;
use crate::core::models::{HealthCheck, HealthStatus, Observation};
use crate::core::storage::Database;

impl Database {
    /// Latest recorded observation, if any
    pub fn latest_check(&self, service_id: i64) -> Result<Option<HealthCheck>, StorageError> {
        self.with_conn(|conn| {
            let check = conn
                .query_row(
                    "SELECT id, service_id, status, response_time_ms, error_message, checked_at
                     FROM health_checks WHERE service_id = ?1
                     ORDER BY id DESC LIMIT 1",
                    [service_id],
                    |row| {
                        Ok(HealthCheck {
                            id: row.get(0)?,
                            service_id: row.get(1)?,
                            status: row.get(2)?,
                            response_time_ms: row
                                .get::<_, Option<i64>>(3)?
                                .map(|ms| ms.max(0) as u64),
                            error_message: row.get(4)?,
                            checked_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(check)
        })
    }

    /// Latest observation, or a synthesized `unknown` when nothing is recorded
    pub fn current_status(&self, service_id: i64) -> Result<Observation, StorageError> {
        Ok(self
            .latest_check(service_id)?
            .map(|check| check.observation())
            .unwrap_or_else(Observation::no_data))
    }

    /// The newest `max_samples` observations as up/down flags, oldest first.
    ///
    /// Returns fewer entries when fewer exist; never pads.
    pub fn recent_history(&self, service_id: i64, max_samples: usize) -> Result<Vec<bool>, StorageError> {
        let statuses = self.recent_statuses(service_id, max_samples)?;
        Ok(statuses.into_iter().rev().map(|s| s.is_up()).collect())
    }

    /// Number of consecutive non-up observations at the head of the history,
    /// looking back at most `limit` rows
    pub fn failure_streak(&self, service_id: i64, limit: usize) -> Result<usize, StorageError> {
        let statuses = self.recent_statuses(service_id, limit)?;
        Ok(statuses.iter().take_while(|s| !s.is_up()).count())
    }

    /// Newest-first statuses
    fn recent_statuses(&self, service_id: i64, limit: usize) -> Result<Vec<HealthStatus>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT status FROM health_checks WHERE service_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let statuses = stmt
                .query_map(rusqlite::params![service_id, limit as i64], |row| row.get(0))?
                .collect::<Result<Vec<HealthStatus>, _>>()?;
            Ok(statuses)
        })
    }
}
