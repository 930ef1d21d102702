/// Service registry: the durable list of monitored services

use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use crate::core::error::StorageError;
use crate::core::models::{Service, ServiceConfig};
use crate::core::storage::Database;

const SERVICE_COLUMNS: &str = "id, name, display_name, icon_emoji, check_type, url, \
                               docker_container, public_url, enabled, priority";

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        icon_emoji: row.get(3)?,
        check_type: row.get(4)?,
        url: row.get(5)?,
        docker_container: row.get(6)?,
        public_url: row.get(7)?,
        enabled: row.get(8)?,
        priority: row.get(9)?,
    })
}

impl Database {
    /// Insert every configured service whose name is not registered yet.
    ///
    /// Existing rows are never touched, so manual edits survive restarts.
    /// Returns the number of rows inserted.
    pub fn ensure_defaults(&self, services: &[ServiceConfig]) -> Result<usize, StorageError> {
        let inserted = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO services
                        (name, display_name, icon_emoji, check_type, url,
                         docker_container, public_url, enabled, priority)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT (name) DO NOTHING",
                )?;

                for (priority, service) in services.iter().enumerate() {
                    inserted += stmt.execute(params![
                        service.name,
                        service.display_name,
                        service.icon_emoji,
                        service.check_type,
                        service.url,
                        service.docker_container,
                        service.public_url,
                        service.enabled,
                        priority as i64,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })?;

        if inserted > 0 {
            info!(inserted, "registered new services");
        }
        Ok(inserted)
    }

    /// Enabled services in display order
    pub fn list_enabled_services(&self) -> Result<Vec<Service>, StorageError> {
        self.query_services(&format!(
            "SELECT {} FROM services WHERE enabled = 1 ORDER BY priority, id",
            SERVICE_COLUMNS
        ))
    }

    /// All services including disabled ones
    pub fn list_services(&self) -> Result<Vec<Service>, StorageError> {
        self.query_services(&format!(
            "SELECT {} FROM services ORDER BY priority, id",
            SERVICE_COLUMNS
        ))
    }

    pub fn service_by_name(&self, name: &str) -> Result<Option<Service>, StorageError> {
        self.with_conn(|conn| {
            let service = conn
                .query_row(
                    &format!("SELECT {} FROM services WHERE name = ?1", SERVICE_COLUMNS),
                    [name],
                    service_from_row,
                )
                .optional()?;
            Ok(service)
        })
    }

    fn query_services(&self, sql: &str) -> Result<Vec<Service>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let services = stmt
                .query_map([], service_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(services)
        })
    }
}
