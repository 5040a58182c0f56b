use std::sync::Arc;
use uuid::Uuid;

use crate::domain::address::{Address, AddressInput};
use crate::domain::errors::DomainError;
use crate::domain::ports::AddressRepository;
use crate::domain::{optional_text, required_text};

#[derive(Clone)]
pub struct AddressService {
    addresses: Arc<dyn AddressRepository>,
}

impl AddressService {
    pub fn new(addresses: Arc<dyn AddressRepository>) -> Self {
        Self { addresses }
    }

    pub fn list(&self, user_id: Uuid) -> Result<Vec<Address>, DomainError> {
        self.addresses.list_for_user(user_id)
    }

    pub fn get(&self, user_id: Uuid, id: Uuid) -> Result<Address, DomainError> {
        self.addresses
            .find(user_id, id)?
            .ok_or(DomainError::NotFound("Address"))
    }

    pub fn create(&self, user_id: Uuid, input: AddressInput) -> Result<Address, DomainError> {
        self.addresses.create(user_id, clean(input)?)
    }

    pub fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: AddressInput,
    ) -> Result<Address, DomainError> {
        self.addresses
            .update(user_id, id, clean(input)?)?
            .ok_or(DomainError::NotFound("Address"))
    }

    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        if self.addresses.delete(user_id, id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Address"))
        }
    }

    pub fn set_principal(&self, user_id: Uuid, id: Uuid) -> Result<Address, DomainError> {
        self.addresses
            .set_principal(user_id, id)?
            .ok_or(DomainError::NotFound("Address"))
    }
}

fn clean(input: AddressInput) -> Result<AddressInput, DomainError> {
    Ok(AddressInput {
        label: optional_text("label", input.label, 50)?,
        street: required_text("street", &input.street, 255)?,
        city: required_text("city", &input.city, 100)?,
        region: optional_text("region", input.region, 100)?,
        postal_code: optional_text("postal_code", input.postal_code, 20)?,
        country: required_text("country", &input.country, 100)?,
        reference: optional_text("reference", input.reference, 1000)?,
    })
}
