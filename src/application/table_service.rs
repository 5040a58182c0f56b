use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::TableRepository;
use crate::domain::table::{DiningTable, TableInput, TableState};

#[derive(Clone)]
pub struct TableService {
    tables: Arc<dyn TableRepository>,
}

impl TableService {
    pub fn new(tables: Arc<dyn TableRepository>) -> Self {
        Self { tables }
    }

    /// All tables, or only those changed after `updated_since` for pollers.
    pub fn list(
        &self,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DiningTable>, DomainError> {
        self.tables.list(updated_since)
    }

    pub fn get(&self, id: Uuid) -> Result<DiningTable, DomainError> {
        self.tables
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Table"))
    }

    pub fn create(&self, input: TableInput) -> Result<DiningTable, DomainError> {
        input.validate()?;
        self.tables.create(input)
    }

    pub fn update(&self, id: Uuid, input: TableInput) -> Result<DiningTable, DomainError> {
        input.validate()?;
        self.tables
            .update(id, input)?
            .ok_or(DomainError::NotFound("Table"))
    }

    pub fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.tables.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Table"))
        }
    }

    /// Manual state change from the POS. With `expected_updated_at` the
    /// change only applies if nobody touched the table since the caller
    /// last read it.
    pub fn change_state(
        &self,
        id: Uuid,
        next: TableState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<DiningTable, DomainError> {
        let table = self.get(id)?;
        if let Some(expected) = expected_updated_at {
            if expected != table.updated_at {
                return Err(DomainError::conflict(format!(
                    "table {} was modified by someone else",
                    table.number
                )));
            }
        }
        table.check_manual_transition(next)?;

        let updated = self
            .tables
            .set_state(id, table.state, next, expected_updated_at)?
            .ok_or_else(|| {
                DomainError::conflict(format!(
                    "table {} was modified by someone else",
                    table.number
                ))
            })?;
        log::info!("table {} {} -> {}", updated.number, table.state, updated.state);
        Ok(updated)
    }
}
