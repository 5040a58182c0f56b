use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::TableRepository;
use crate::domain::table::{DiningTable, TableInput, TableState};
use crate::schema::dining_tables;

use super::models::{DiningTableRow, NewDiningTableRow};

pub struct DieselTableRepository {
    pool: DbPool,
}

impl DieselTableRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl TableRepository for DieselTableRepository {
    fn list(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<DiningTable>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = dining_tables::table
            .select(DiningTableRow::as_select())
            .order(dining_tables::number.asc())
            .into_boxed();
        if let Some(since) = updated_since {
            query = query.filter(dining_tables::updated_at.gt(since));
        }

        query
            .load(&mut conn)?
            .into_iter()
            .map(DiningTable::try_from)
            .collect()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<DiningTable>, DomainError> {
        let mut conn = self.pool.get()?;

        dining_tables::table
            .find(id)
            .select(DiningTableRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(DiningTable::try_from)
            .transpose()
    }

    fn create(&self, input: TableInput) -> Result<DiningTable, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(dining_tables::table)
            .values(&NewDiningTableRow {
                id: Uuid::new_v4(),
                number: input.number,
                capacity: input.capacity,
                state: TableState::Free.code().to_string(),
            })
            .returning(DiningTableRow::as_returning())
            .get_result(&mut conn)?
            .try_into()
    }

    fn update(&self, id: Uuid, input: TableInput) -> Result<Option<DiningTable>, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(dining_tables::table.find(id))
            .set((
                dining_tables::number.eq(input.number),
                dining_tables::capacity.eq(input.capacity),
                dining_tables::updated_at.eq(Utc::now()),
            ))
            .returning(DiningTableRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(DiningTable::try_from)
            .transpose()
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = dining_tables::table
                .find(id)
                .select(DiningTableRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            let Some(current) = current else {
                return Ok(false);
            };
            let table = DiningTable::try_from(current)?;
            if table.state == TableState::Occupied {
                return Err(DomainError::conflict(format!(
                    "table {} is occupied",
                    table.number
                )));
            }

            let deleted = diesel::delete(dining_tables::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
    }

    fn set_state(
        &self,
        id: Uuid,
        from: TableState,
        to: TableState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Option<DiningTable>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = dining_tables::table
                .find(id)
                .select(DiningTableRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            let current = DiningTable::try_from(current)?;

            let stale = expected_updated_at.is_some_and(|seen| seen != current.updated_at);
            if current.state != from || stale {
                log::debug!(
                    "table {} not moved to {}: now {} (stale: {})",
                    current.number,
                    to,
                    current.state,
                    stale
                );
                return Ok(None);
            }

            let current_order_id = if to == TableState::Free {
                None
            } else {
                current.current_order_id
            };

            diesel::update(dining_tables::table.find(id))
                .set((
                    dining_tables::state.eq(to.code()),
                    dining_tables::current_order_id.eq(current_order_id),
                    dining_tables::updated_at.eq(Utc::now()),
                ))
                .returning(DiningTableRow::as_returning())
                .get_result(conn)?
                .try_into()
                .map(Some)
        })
    }
}
