use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPaymentMethod, PaymentMethod, PaymentMethodChanges};
use crate::domain::ports::PaymentMethodRepository;
use crate::schema::payment_methods;

use super::models::{NewPaymentMethodRow, PaymentMethodChangeset, PaymentMethodRow};

pub struct DieselPaymentMethodRepository {
    pool: DbPool,
}

impl DieselPaymentMethodRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentMethodRepository for DieselPaymentMethodRepository {
    fn list(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = payment_methods::table
            .select(PaymentMethodRow::as_select())
            .order(payment_methods::name.asc())
            .into_boxed();
        if !include_inactive {
            query = query.filter(payment_methods::is_active.eq(true));
        }

        Ok(query
            .load(&mut conn)?
            .into_iter()
            .map(PaymentMethod::from)
            .collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethod>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(payment_methods::table
            .find(id)
            .select(PaymentMethodRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(PaymentMethod::from))
    }

    fn create(&self, method: NewPaymentMethod) -> Result<PaymentMethod, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::insert_into(payment_methods::table)
            .values(&NewPaymentMethodRow {
                id: Uuid::new_v4(),
                name: method.name,
                description: method.description,
            })
            .returning(PaymentMethodRow::as_returning())
            .get_result(&mut conn)?
            .into())
    }

    fn update(
        &self,
        id: Uuid,
        changes: PaymentMethodChanges,
    ) -> Result<Option<PaymentMethod>, DomainError> {
        let mut conn = self.pool.get()?;

        let changeset = PaymentMethodChangeset {
            name: changes.name,
            description: changes.description,
            is_active: changes.is_active,
        };
        // An empty changeset is not valid SQL; treat it as a read.
        if changeset.name.is_none()
            && changeset.description.is_none()
            && changeset.is_active.is_none()
        {
            drop(conn);
            return self.find_by_id(id);
        }

        Ok(diesel::update(payment_methods::table.find(id))
            .set(&changeset)
            .returning(PaymentMethodRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(PaymentMethod::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        // orders.payment_method_id is ON DELETE RESTRICT; the violation maps to Conflict.
        let deleted = diesel::delete(payment_methods::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::DieselPaymentMethodRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::payment::{NewPaymentMethod, PaymentMethodChanges};
    use crate::domain::ports::PaymentMethodRepository;
    use crate::infrastructure::test_support::setup_db;

    fn method(name: &str) -> NewPaymentMethod {
        NewPaymentMethod {
            name: name.into(),
            description: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn inactive_methods_are_hidden_by_default() {
        let (_container, pool) = setup_db().await;
        let repo = DieselPaymentMethodRepository::new(pool);
        repo.create(method("Efectivo")).expect("create failed");
        let card = repo.create(method("Tarjeta")).expect("create failed");
        repo.update(
            card.id,
            PaymentMethodChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .expect("update failed");

        assert_eq!(repo.list(false).unwrap().len(), 1);
        assert_eq!(repo.list(true).unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn names_are_unique_and_empty_update_is_a_read() {
        let (_container, pool) = setup_db().await;
        let repo = DieselPaymentMethodRepository::new(pool);
        let cash = repo.create(method("Efectivo")).expect("create failed");

        assert!(matches!(
            repo.create(method("Efectivo")),
            Err(DomainError::Conflict(_))
        ));
        let same = repo
            .update(cash.id, PaymentMethodChanges::default())
            .expect("update failed")
            .expect("method should exist");
        assert_eq!(same.name, "Efectivo");
    }
}
