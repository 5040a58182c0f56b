use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::{
    Category, CategoryInput, NewProduct, Product, ProductChanges, ProductFilter,
};
use crate::domain::errors::DomainError;
use crate::domain::money::parse_amount;
use crate::domain::ports::{CategoryRepository, ProductRepository, VendorRepository};
use crate::domain::{optional_text, required_text, Page, PageRequest};

/// Raw product fields as received from a client; `price` is a decimal string.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub category_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    products: Arc<dyn ProductRepository>,
    vendors: Arc<dyn VendorRepository>,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        products: Arc<dyn ProductRepository>,
        vendors: Arc<dyn VendorRepository>,
    ) -> Self {
        Self {
            categories,
            products,
            vendors,
        }
    }

    // ── Categories ───────────────────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.categories.list()
    }

    pub fn get_category(&self, id: Uuid) -> Result<Category, DomainError> {
        self.categories
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn create_category(&self, input: CategoryInput) -> Result<Category, DomainError> {
        self.categories.create(clean_category(input)?)
    }

    pub fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<Category, DomainError> {
        self.categories
            .update(id, clean_category(input)?)?
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        if self.categories.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Category"))
        }
    }

    // ── Products ─────────────────────────────────────────────────────────────

    pub fn list_products(
        &self,
        mut filter: ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, DomainError> {
        filter.search = filter
            .search
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self.products.list(filter, page)
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.products
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn create_product(&self, input: ProductInput) -> Result<Product, DomainError> {
        self.ensure_category(input.category_id)?;
        if let Some(vendor_id) = input.vendor_id {
            self.ensure_vendor(vendor_id)?;
        }
        let stock = input.stock.unwrap_or(0);
        validate_stock(stock)?;

        self.products.create(NewProduct {
            category_id: input.category_id,
            vendor_id: input.vendor_id,
            name: required_text("name", &input.name, 150)?,
            description: optional_text("description", input.description, 2000)?,
            price: parse_amount("price", &input.price)?,
            stock,
            image_url: optional_text("image_url", input.image_url, 2000)?,
        })
    }

    pub fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Product, DomainError> {
        if let Some(category_id) = patch.category_id {
            self.ensure_category(category_id)?;
        }
        if let Some(vendor_id) = patch.vendor_id {
            self.ensure_vendor(vendor_id)?;
        }
        if let Some(stock) = patch.stock {
            validate_stock(stock)?;
        }

        let changes = ProductChanges {
            category_id: patch.category_id,
            vendor_id: patch.vendor_id.map(Some),
            name: patch
                .name
                .map(|n| required_text("name", &n, 150))
                .transpose()?,
            description: match patch.description {
                Some(d) => Some(optional_text("description", Some(d), 2000)?),
                None => None,
            },
            price: patch
                .price
                .map(|p| parse_amount("price", &p))
                .transpose()?,
            stock: patch.stock,
            image_url: match patch.image_url {
                Some(u) => Some(optional_text("image_url", Some(u), 2000)?),
                None => None,
            },
            is_active: patch.is_active,
        };
        self.products
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        if self.products.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Product"))
        }
    }

    fn ensure_category(&self, id: Uuid) -> Result<(), DomainError> {
        match self.categories.find_by_id(id)? {
            Some(_) => Ok(()),
            None => Err(DomainError::invalid(format!("category {id} does not exist"))),
        }
    }

    fn ensure_vendor(&self, id: Uuid) -> Result<(), DomainError> {
        match self.vendors.find_by_id(id)? {
            Some(_) => Ok(()),
            None => Err(DomainError::invalid(format!("vendor {id} does not exist"))),
        }
    }
}

fn clean_category(input: CategoryInput) -> Result<CategoryInput, DomainError> {
    Ok(CategoryInput {
        name: required_text("name", &input.name, 100)?,
        description: optional_text("description", input.description, 2000)?,
    })
}

fn validate_stock(stock: i32) -> Result<(), DomainError> {
    if stock < 0 {
        return Err(DomainError::invalid("stock must not be negative"));
    }
    Ok(())
}
