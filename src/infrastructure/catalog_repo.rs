use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    Category, CategoryInput, NewProduct, Product, ProductChanges, ProductFilter,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CategoryRepository, ProductRepository};
use crate::domain::{Page, PageRequest};
use crate::schema::{categories, products};

use super::models::{
    CategoryChangeset, CategoryRow, NewCategoryRow, NewProductRow, ProductChangeset, ProductRow,
};

// ── Categories ───────────────────────────────────────────────────────────────

pub struct DieselCategoryRepository {
    pool: DbPool,
}

impl DieselCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CategoryRepository for DieselCategoryRepository {
    fn list(&self) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(categories::table
            .select(CategoryRow::as_select())
            .order(categories::name.asc())
            .load(&mut conn)?
            .into_iter()
            .map(Category::from)
            .collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(categories::table
            .find(id)
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Category::from))
    }

    fn create(&self, input: CategoryInput) -> Result<Category, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::insert_into(categories::table)
            .values(&NewCategoryRow {
                id: Uuid::new_v4(),
                name: input.name,
                description: input.description,
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?
            .into())
    }

    fn update(&self, id: Uuid, input: CategoryInput) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(categories::table.find(id))
            .set(&CategoryChangeset {
                name: input.name,
                description: input.description,
                updated_at: Utc::now(),
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(Category::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        // products.category_id is ON DELETE RESTRICT; the violation maps to Conflict.
        let deleted = diesel::delete(categories::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

// ── Products ─────────────────────────────────────────────────────────────────

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn filtered(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table.into_boxed();
    if !filter.include_inactive {
        query = query.filter(products::is_active.eq(true));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(products::category_id.eq(category_id));
    }
    if let Some(vendor_id) = filter.vendor_id {
        query = query.filter(products::vendor_id.eq(vendor_id));
    }
    if let Some(search) = &filter.search {
        query = query.filter(products::name.ilike(format!("%{}%", escape_like(search))));
    }
    query
}

impl ProductRepository for DieselProductRepository {
    fn list(&self, filter: ProductFilter, page: PageRequest) -> Result<Page<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(&filter).count().get_result(conn)?;

            let items = filtered(&filter)
                .select(ProductRow::as_select())
                .order((products::name.asc(), products::id.asc()))
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?
                .into_iter()
                .map(Product::from)
                .collect();

            Ok(Page::new(items, total, page))
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Product::from))
    }

    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                category_id: product.category_id,
                vendor_id: product.vendor_id,
                name: product.name,
                description: product.description,
                price: product.price,
                stock: product.stock,
                image_url: product.image_url,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?
            .into())
    }

    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(products::table.find(id))
            .set(&ProductChangeset {
                category_id: changes.category_id,
                vendor_id: changes.vendor_id,
                name: changes.name,
                description: changes.description,
                price: changes.price,
                stock: changes.stock,
                image_url: changes.image_url,
                is_active: changes.is_active,
                updated_at: Utc::now(),
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(Product::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
