use std::sync::Arc;
use uuid::Uuid;

use crate::domain::account::{NewVendor, Vendor, VendorChanges};
use crate::domain::errors::DomainError;
use crate::domain::ports::{UserRepository, VendorRepository};
use crate::domain::{optional_text, required_text};

#[derive(Debug, Clone, Default)]
pub struct VendorPatch {
    pub business_name: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct VendorService {
    vendors: Arc<dyn VendorRepository>,
    users: Arc<dyn UserRepository>,
}

impl VendorService {
    pub fn new(vendors: Arc<dyn VendorRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { vendors, users }
    }

    pub fn list(&self) -> Result<Vec<Vendor>, DomainError> {
        self.vendors.list()
    }

    pub fn get(&self, id: Uuid) -> Result<Vendor, DomainError> {
        self.vendors
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Vendor"))
    }

    /// Creates the vendor profile of an existing user and promotes the user.
    pub fn create(&self, vendor: NewVendor) -> Result<Vendor, DomainError> {
        if self.users.find_by_id(vendor.user_id)?.is_none() {
            return Err(DomainError::NotFound("User"));
        }
        let vendor = self.vendors.create(NewVendor {
            user_id: vendor.user_id,
            business_name: required_text("business_name", &vendor.business_name, 150)?,
            description: optional_text("description", vendor.description, 2000)?,
            phone: optional_text("phone", vendor.phone, 30)?,
        })?;
        log::info!("user {} is now vendor {}", vendor.user_id, vendor.id);
        Ok(vendor)
    }

    pub fn update(&self, id: Uuid, patch: VendorPatch) -> Result<Vendor, DomainError> {
        let changes = VendorChanges {
            business_name: patch
                .business_name
                .map(|n| required_text("business_name", &n, 150))
                .transpose()?,
            description: match patch.description {
                Some(d) => Some(optional_text("description", Some(d), 2000)?),
                None => None,
            },
            phone: match patch.phone {
                Some(p) => Some(optional_text("phone", Some(p), 30)?),
                None => None,
            },
            is_active: patch.is_active,
        };
        self.vendors
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Vendor"))
    }

    pub fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.vendors.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Vendor"))
        }
    }
}
