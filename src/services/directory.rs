use async_trait::async_trait;

use crate::database::{
    queries::{CouponQueries, UserQueries},
    Database,
};
use crate::errors::{AppError, Result};
use crate::models::{Coupon, CouponLimits, Registration, RegistrationCode, User};
use crate::services::retry::{self, RetryPolicy};

/// Identity store for users and coupons. Registration is create-once; absence
/// on lookup is a normal result, not an error.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn register_user(&self, name: &str) -> Result<Registration>;

    async fn register_coupon(&self, name: &str, limits: &CouponLimits) -> Result<Registration>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>>;

    async fn find_coupon_by_name(&self, name: &str) -> Result<Option<Coupon>>;

    async fn list_users(&self) -> Result<Vec<String>>;

    async fn list_coupons(&self) -> Result<Vec<String>>;
}

pub struct PgDirectory {
    database: Database,
    retry: RetryPolicy,
}

impl PgDirectory {
    pub fn new(database: Database, retry: RetryPolicy) -> Self {
        Self { database, retry }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505")
}

fn already_exists() -> Registration {
    Registration {
        created: false,
        id: None,
        code: RegistrationCode::AlreadyExists,
    }
}

fn created(id: i64) -> Registration {
    Registration {
        created: true,
        id: Some(id),
        code: RegistrationCode::Created,
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn register_user(&self, name: &str) -> Result<Registration> {
        let exists = retry::with_read_retry(&self.retry, || {
            UserQueries::exists(self.database.pool(), name)
        })
        .await?;
        if exists {
            return Ok(already_exists());
        }

        match retry::with_read_retry(&self.retry, || {
            UserQueries::insert(self.database.pool(), name)
        })
        .await
        {
            Ok(user) => {
                tracing::info!(username = %name, id = user.id, "user registered");
                Ok(created(user.id))
            }
            // Lost the race between the existence check and the insert; the
            // unique constraint is the authority.
            Err(AppError::Database(ref err)) if is_unique_violation(err) => Ok(already_exists()),
            Err(err) => Err(err),
        }
    }

    async fn register_coupon(&self, name: &str, limits: &CouponLimits) -> Result<Registration> {
        // Caller error, rejected before any storage call and never retried.
        limits.validate().map_err(AppError::Validation)?;

        let exists = retry::with_read_retry(&self.retry, || {
            CouponQueries::exists(self.database.pool(), name)
        })
        .await?;
        if exists {
            return Ok(already_exists());
        }

        match retry::with_read_retry(&self.retry, || {
            CouponQueries::insert(self.database.pool(), name, limits)
        })
        .await
        {
            Ok(coupon) => {
                tracing::info!(coupon = %name, id = coupon.id, "coupon registered");
                Ok(created(coupon.id))
            }
            Err(AppError::Database(ref err)) if is_unique_violation(err) => Ok(already_exists()),
            Err(err) => Err(err),
        }
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        retry::with_read_retry(&self.retry, || {
            UserQueries::find_by_name(self.database.pool(), name)
        })
        .await
    }

    async fn find_coupon_by_name(&self, name: &str) -> Result<Option<Coupon>> {
        retry::with_read_retry(&self.retry, || {
            CouponQueries::find_by_name(self.database.pool(), name)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        retry::with_read_retry(&self.retry, || {
            UserQueries::list_names(self.database.pool())
        })
        .await
    }

    async fn list_coupons(&self) -> Result<Vec<String>> {
        retry::with_read_retry(&self.retry, || {
            CouponQueries::list_names(self.database.pool())
        })
        .await
    }
}
