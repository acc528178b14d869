use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use coupon_redemption_service::errors::{AppError, Result};
use coupon_redemption_service::models::{
    Coupon, CouponLimits, Registration, RegistrationCode, UsageRecord, User,
};
use coupon_redemption_service::services::directory::Directory;
use coupon_redemption_service::services::ledger::{
    daily_window, weekly_window, UsageLedger, Window,
};

/// In-memory directory with the same observable contract as the Postgres
/// implementation.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: Mutex<DirectoryState>,
}

#[derive(Default)]
struct DirectoryState {
    users: Vec<User>,
    coupons: Vec<Coupon>,
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn register_user(&self, name: &str) -> Result<Registration> {
        let mut state = self.inner.lock().unwrap();
        if state.users.iter().any(|u| u.name == name) {
            return Ok(Registration {
                created: false,
                id: None,
                code: RegistrationCode::AlreadyExists,
            });
        }

        let id = state.users.len() as i64 + 1;
        state.users.push(User {
            id,
            name: name.to_string(),
        });
        Ok(Registration {
            created: true,
            id: Some(id),
            code: RegistrationCode::Created,
        })
    }

    async fn register_coupon(&self, name: &str, limits: &CouponLimits) -> Result<Registration> {
        limits.validate().map_err(AppError::Validation)?;

        let mut state = self.inner.lock().unwrap();
        if state.coupons.iter().any(|c| c.name == name) {
            return Ok(Registration {
                created: false,
                id: None,
                code: RegistrationCode::AlreadyExists,
            });
        }

        let id = state.coupons.len() as i64 + 1;
        state.coupons.push(Coupon {
            id,
            name: name.to_string(),
            global_total: limits.global_total,
            user_total: limits.user_total,
            user_daily: limits.user_daily,
            user_weekly: limits.user_weekly,
        });
        Ok(Registration {
            created: true,
            id: Some(id),
            code: RegistrationCode::Created,
        })
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let state = self.inner.lock().unwrap();
        Ok(state.users.iter().find(|u| u.name == name).cloned())
    }

    async fn find_coupon_by_name(&self, name: &str) -> Result<Option<Coupon>> {
        let state = self.inner.lock().unwrap();
        Ok(state.coupons.iter().find(|c| c.name == name).cloned())
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        Ok(state.users.iter().map(|u| u.name.clone()).collect())
    }

    async fn list_coupons(&self) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        Ok(state.coupons.iter().map(|c| c.name.clone()).collect())
    }
}

/// In-memory usage ledger. The single mutex makes the conditional append
/// atomic, mirroring the serializable transaction of the Postgres version.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<UsageRecord>>,
}

impl MemoryLedger {
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn count_matching(records: &[UsageRecord], coupon_id: i64, user_id: Option<i64>, window: Option<Window>) -> i64 {
        records
            .iter()
            .filter(|r| r.coupon_id == coupon_id)
            .filter(|r| user_id.map_or(true, |id| r.user_id == id))
            .filter(|r| {
                window.map_or(true, |w| w.start <= r.redeemed_at && r.redeemed_at <= w.end)
            })
            .count() as i64
    }
}

#[async_trait]
impl UsageLedger for MemoryLedger {
    async fn append(
        &self,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<UsageRecord> {
        let mut records = self.records.lock().unwrap();
        let record = UsageRecord {
            id: records.len() as i64 + 1,
            coupon_id,
            user_id,
            redeemed_at: at,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn append_if_within(
        &self,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
        limits: &CouponLimits,
    ) -> Result<Option<UsageRecord>> {
        let mut records = self.records.lock().unwrap();

        let within = Self::count_matching(&records, coupon_id, None, None) < limits.global_total
            && Self::count_matching(&records, coupon_id, Some(user_id), None) < limits.user_total
            && Self::count_matching(&records, coupon_id, Some(user_id), Some(weekly_window(at)))
                < limits.user_weekly
            && Self::count_matching(&records, coupon_id, Some(user_id), Some(daily_window(at)))
                < limits.user_daily;

        if !within {
            return Ok(None);
        }

        let record = UsageRecord {
            id: records.len() as i64 + 1,
            coupon_id,
            user_id,
            redeemed_at: at,
        };
        records.push(record.clone());
        Ok(Some(record))
    }

    async fn count_lifetime(&self, coupon_id: i64) -> Result<i64> {
        let records = self.records.lock().unwrap();
        Ok(Self::count_matching(&records, coupon_id, None, None))
    }

    async fn count_lifetime_for_user(&self, coupon_id: i64, user_id: i64) -> Result<i64> {
        let records = self.records.lock().unwrap();
        Ok(Self::count_matching(&records, coupon_id, Some(user_id), None))
    }

    async fn count_in_window(&self, coupon_id: i64, user_id: i64, window: Window) -> Result<i64> {
        let records = self.records.lock().unwrap();
        Ok(Self::count_matching(
            &records,
            coupon_id,
            Some(user_id),
            Some(window),
        ))
    }
}
