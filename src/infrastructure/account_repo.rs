use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::account::{
    NewUser, NewVendor, Role, RoleInfo, User, UserChanges, Vendor, VendorChanges,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{UserRepository, VendorRepository};
use crate::domain::{Page, PageRequest};
use crate::schema::{roles, users, vendors};

use super::models::{
    NewUserRow, NewVendorRow, RoleRow, UserChangeset, UserRow, VendorChangeset, VendorRow,
};

// ── Users ────────────────────────────────────────────────────────────────────

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                role_id: user.role.id(),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                phone: user.phone,
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)?
            .try_into()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;

        users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;

        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn list(&self, page: PageRequest) -> Result<Page<User>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = users::table.count().get_result(conn)?;

            let items = users::table
                .select(UserRow::as_select())
                .order(users::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?
                .into_iter()
                .map(User::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page::new(items, total, page))
        })
    }

    fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(users::table.find(id))
            .set(&UserChangeset {
                name: changes.name,
                phone: changes.phone,
                role_id: changes.role.map(Role::id),
                is_active: changes.is_active,
                updated_at: Utc::now(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn update_password(&self, id: Uuid, password_hash: String) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(users::table.find(id))
            .set((
                users::password_hash.eq(password_hash),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn list_roles(&self) -> Result<Vec<RoleInfo>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(roles::table
            .select(RoleRow::as_select())
            .order(roles::id.asc())
            .load(&mut conn)?
            .into_iter()
            .map(RoleInfo::from)
            .collect())
    }
}

// ── Vendors ──────────────────────────────────────────────────────────────────

pub struct DieselVendorRepository {
    pool: DbPool,
}

impl DieselVendorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl VendorRepository for DieselVendorRepository {
    fn create(&self, vendor: NewVendor) -> Result<Vendor, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Customers are promoted; staff keep the role they already have.
            let promoted = diesel::update(
                users::table
                    .find(vendor.user_id)
                    .filter(users::role_id.eq(Role::Customer.id())),
            )
            .set((
                users::role_id.eq(Role::Vendor.id()),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
            if promoted > 0 {
                log::info!("user {} promoted to vendor", vendor.user_id);
            }

            let row = diesel::insert_into(vendors::table)
                .values(&NewVendorRow {
                    id: Uuid::new_v4(),
                    user_id: vendor.user_id,
                    business_name: vendor.business_name,
                    description: vendor.description,
                    phone: vendor.phone,
                })
                .returning(VendorRow::as_returning())
                .get_result(conn)?;

            Ok(row.into())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Vendor>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(vendors::table
            .find(id)
            .select(VendorRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Vendor::from))
    }

    fn list(&self) -> Result<Vec<Vendor>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(vendors::table
            .select(VendorRow::as_select())
            .order(vendors::business_name.asc())
            .load(&mut conn)?
            .into_iter()
            .map(Vendor::from)
            .collect())
    }

    fn update(&self, id: Uuid, changes: VendorChanges) -> Result<Option<Vendor>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(vendors::table.find(id))
            .set(&VendorChangeset {
                business_name: changes.business_name,
                description: changes.description,
                phone: changes.phone,
                is_active: changes.is_active,
                updated_at: Utc::now(),
            })
            .returning(VendorRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(Vendor::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(vendors::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
