use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPaymentMethod, PaymentMethod, PaymentMethodChanges};
use crate::domain::ports::PaymentMethodRepository;
use crate::domain::{optional_text, required_text};

#[derive(Clone)]
pub struct PaymentService {
    methods: Arc<dyn PaymentMethodRepository>,
}

impl PaymentService {
    pub fn new(methods: Arc<dyn PaymentMethodRepository>) -> Self {
        Self { methods }
    }

    pub fn list(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>, DomainError> {
        self.methods.list(include_inactive)
    }

    pub fn get(&self, id: Uuid) -> Result<PaymentMethod, DomainError> {
        self.methods
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Payment method"))
    }

    pub fn create(&self, method: NewPaymentMethod) -> Result<PaymentMethod, DomainError> {
        self.methods.create(NewPaymentMethod {
            name: required_text("name", &method.name, 100)?,
            description: optional_text("description", method.description, 1000)?,
        })
    }

    pub fn update(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        is_active: Option<bool>,
    ) -> Result<PaymentMethod, DomainError> {
        let changes = PaymentMethodChanges {
            name: name.map(|n| required_text("name", &n, 100)).transpose()?,
            description: match description {
                Some(d) => Some(optional_text("description", Some(d), 1000)?),
                None => None,
            },
            is_active,
        };
        self.methods
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Payment method"))
    }

    /// Methods already used by orders answer `Conflict`; deactivate those.
    pub fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.methods.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Payment method"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::InMemoryStore;

    fn cash() -> NewPaymentMethod {
        NewPaymentMethod {
            name: "Efectivo".into(),
            description: None,
        }
    }

    #[test]
    fn inactive_methods_are_hidden_by_default() {
        let svc = PaymentService::new(InMemoryStore::new());
        let method = svc.create(cash()).unwrap();
        svc.create(NewPaymentMethod {
            name: "Tarjeta".into(),
            description: Some("Visa / Mastercard".into()),
        })
        .unwrap();
        svc.update(method.id, None, None, Some(false)).unwrap();

        assert_eq!(svc.list(false).unwrap().len(), 1);
        assert_eq!(svc.list(true).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_names_conflict() {
        let svc = PaymentService::new(InMemoryStore::new());
        svc.create(cash()).unwrap();
        assert!(matches!(svc.create(cash()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let svc = PaymentService::new(InMemoryStore::new());
        assert!(matches!(
            svc.delete(Uuid::new_v4()),
            Err(DomainError::NotFound(_))
        ));
    }
}
