use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Free,
    Occupied,
    Reserved,
}

impl TableState {
    pub fn code(self) -> &'static str {
        match self {
            TableState::Free => "FREE",
            TableState::Occupied => "OCCUPIED",
            TableState::Reserved => "RESERVED",
        }
    }

    /// Whether a new POS order may be opened at a table in this state.
    pub fn can_seat(self) -> bool {
        matches!(self, TableState::Free | TableState::Reserved)
    }
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TableState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(TableState::Free),
            "OCCUPIED" => Ok(TableState::Occupied),
            "RESERVED" => Ok(TableState::Reserved),
            other => Err(DomainError::invalid(format!("unknown table state '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiningTable {
    pub id: Uuid,
    pub number: i32,
    pub capacity: i32,
    pub state: TableState,
    pub current_order_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl DiningTable {
    /// Checks a manual state change requested from the POS. Occupying a
    /// table happens only by opening an order at it.
    pub fn check_manual_transition(&self, next: TableState) -> Result<(), DomainError> {
        use TableState::*;
        let allowed = match (self.state, next) {
            (Free, Reserved) | (Reserved, Free) => true,
            (Occupied, Free) => self.current_order_id.is_none(),
            _ => false,
        };
        if allowed {
            Ok(())
        } else if self.state == Occupied && next == Free {
            Err(DomainError::conflict(format!(
                "table {} still has an open order",
                self.number
            )))
        } else {
            Err(DomainError::conflict(format!(
                "table {} cannot go from {} to {}",
                self.number, self.state, next
            )))
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableInput {
    pub number: i32,
    pub capacity: i32,
}

impl TableInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.number <= 0 {
            return Err(DomainError::invalid("table number must be positive"));
        }
        if self.capacity <= 0 {
            return Err(DomainError::invalid("table capacity must be positive"));
        }
        Ok(())
    }
}
