use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::address::{Address, AddressInput};
use crate::domain::errors::DomainError;
use crate::domain::ports::AddressRepository;
use crate::schema::{addresses, users};

use super::models::{AddressChangeset, AddressRow, NewAddressRow};

pub struct DieselAddressRepository {
    pool: DbPool,
}

impl DieselAddressRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Serializes principal-address bookkeeping per user. `NO KEY UPDATE` keeps
/// inserts that reference the user (key share locks) unblocked.
fn lock_owner(conn: &mut PgConnection, user_id: Uuid) -> Result<(), DomainError> {
    users::table
        .find(user_id)
        .select(users::id)
        .for_no_key_update()
        .first::<Uuid>(conn)
        .optional()?
        .map(|_| ())
        .ok_or(DomainError::NotFound("User"))
}

impl AddressRepository for DieselAddressRepository {
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Address>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(addresses::table
            .filter(addresses::user_id.eq(user_id))
            .select(AddressRow::as_select())
            .order((addresses::is_principal.desc(), addresses::created_at.desc()))
            .load(&mut conn)?
            .into_iter()
            .map(Address::from)
            .collect())
    }

    fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(addresses::table
            .find(id)
            .filter(addresses::user_id.eq(user_id))
            .select(AddressRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Address::from))
    }

    fn create(&self, user_id: Uuid, input: AddressInput) -> Result<Address, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_owner(conn, user_id)?;

            let existing: i64 = addresses::table
                .filter(addresses::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            let row = diesel::insert_into(addresses::table)
                .values(&NewAddressRow {
                    id: Uuid::new_v4(),
                    user_id,
                    label: input.label,
                    street: input.street,
                    city: input.city,
                    region: input.region,
                    postal_code: input.postal_code,
                    country: input.country,
                    reference: input.reference,
                    is_principal: existing == 0,
                })
                .returning(AddressRow::as_returning())
                .get_result(conn)?;

            Ok(row.into())
        })
    }

    fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: AddressInput,
    ) -> Result<Option<Address>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(
            addresses::table
                .find(id)
                .filter(addresses::user_id.eq(user_id)),
        )
        .set(&AddressChangeset {
            label: input.label,
            street: input.street,
            city: input.city,
            region: input.region,
            postal_code: input.postal_code,
            country: input.country,
            reference: input.reference,
            updated_at: Utc::now(),
        })
        .returning(AddressRow::as_returning())
        .get_result(&mut conn)
        .optional()?
        .map(Address::from))
    }

    fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_owner(conn, user_id)?;

            let removed = diesel::delete(
                addresses::table
                    .find(id)
                    .filter(addresses::user_id.eq(user_id)),
            )
            .returning(AddressRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(removed) = removed else {
                return Ok(false);
            };

            if removed.is_principal {
                let newest = addresses::table
                    .filter(addresses::user_id.eq(user_id))
                    .select(addresses::id)
                    .order(addresses::created_at.desc())
                    .first::<Uuid>(conn)
                    .optional()?;
                if let Some(next) = newest {
                    diesel::update(addresses::table.find(next))
                        .set((
                            addresses::is_principal.eq(true),
                            addresses::updated_at.eq(Utc::now()),
                        ))
                        .execute(conn)?;
                }
            }

            Ok(true)
        })
    }

    fn set_principal(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_owner(conn, user_id)?;

            let owned: i64 = addresses::table
                .find(id)
                .filter(addresses::user_id.eq(user_id))
                .count()
                .get_result(conn)?;
            if owned == 0 {
                return Ok(None);
            }

            // Clear first: the partial unique index allows one principal per user.
            let now = Utc::now();
            diesel::update(
                addresses::table
                    .filter(addresses::user_id.eq(user_id))
                    .filter(addresses::is_principal.eq(true))
                    .filter(addresses::id.ne(id)),
            )
            .set((
                addresses::is_principal.eq(false),
                addresses::updated_at.eq(now),
            ))
            .execute(conn)?;

            let row = diesel::update(addresses::table.find(id))
                .set((
                    addresses::is_principal.eq(true),
                    addresses::updated_at.eq(now),
                ))
                .returning(AddressRow::as_returning())
                .get_result(conn)?;

            Ok(Some(row.into()))
        })
    }
}
