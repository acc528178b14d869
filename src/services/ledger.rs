use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};

use crate::database::{queries::UsageLogQueries, Database};
use crate::errors::{AppError, Result};
use crate::models::{CouponLimits, UsageRecord};
use crate::services::retry::{self, RetryPolicy};

/// Closed interval used to scope a count query. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Daily window for `at`: clock time zeroed to 00:00:00 with the sub-second
/// part of `at` retained, ending 24h - 1s later.
pub fn daily_window(at: DateTime<Utc>) -> Window {
    let start = at - Duration::seconds(i64::from(at.num_seconds_from_midnight()));

    Window {
        start,
        end: start + Duration::days(1) - Duration::seconds(1),
    }
}

/// Trailing 7-calendar-day window for `at`: midnight seven days back through
/// 23:59:59.999999 of `at`'s day. Unlike the daily window, both bounds here
/// zero the sub-second part; the asymmetry is an externally observable
/// contract and must not be "fixed" silently.
pub fn weekly_window(at: DateTime<Utc>) -> Window {
    let base = at - Duration::days(7);
    let start = base
        - Duration::seconds(i64::from(base.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(base.timestamp_subsec_nanos()));

    let day_floor = at
        - Duration::seconds(i64::from(at.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(at.timestamp_subsec_nanos()));
    let end = day_floor + Duration::seconds(86_399) + Duration::microseconds(999_999);

    Window { start, end }
}

/// Append-only store of redemption facts with count queries over arbitrary
/// windows. All timestamps are supplied by the caller; implementations never
/// read a wall clock.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Inserts one record unconditionally. Never dedupes: identical arguments
    /// produce distinct records.
    async fn append(&self, coupon_id: i64, user_id: i64, at: DateTime<Utc>)
        -> Result<UsageRecord>;

    /// Inserts one record only while every quota count is still below its
    /// limit; `None` means some quota was consumed concurrently.
    async fn append_if_within(
        &self,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
        limits: &CouponLimits,
    ) -> Result<Option<UsageRecord>>;

    async fn count_lifetime(&self, coupon_id: i64) -> Result<i64>;

    async fn count_lifetime_for_user(&self, coupon_id: i64, user_id: i64) -> Result<i64>;

    async fn count_in_window(&self, coupon_id: i64, user_id: i64, window: Window) -> Result<i64>;
}

pub struct PgUsageLedger {
    database: Database,
    retry: RetryPolicy,
}

impl PgUsageLedger {
    pub fn new(database: Database, retry: RetryPolicy) -> Self {
        Self { database, retry }
    }
}

#[async_trait]
impl UsageLedger for PgUsageLedger {
    async fn append(
        &self,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<UsageRecord> {
        let database = self.database.clone();
        let retry = self.retry.clone();

        // Once issued, the append runs to a terminal state even if the caller
        // is cancelled mid-await.
        let handle = tokio::spawn(async move {
            retry::with_append_retry(&retry, || {
                UsageLogQueries::insert(database.pool(), coupon_id, user_id, at)
            })
            .await
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(AppError::AppendStatusUnknown(join_err.to_string())),
        }
    }

    async fn append_if_within(
        &self,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
        limits: &CouponLimits,
    ) -> Result<Option<UsageRecord>> {
        let database = self.database.clone();
        let retry = self.retry.clone();
        let limits = *limits;
        let week = weekly_window(at);
        let day = daily_window(at);

        let handle = tokio::spawn(async move {
            retry::with_append_retry(&retry, || {
                UsageLogQueries::insert_if_within(
                    database.pool(),
                    coupon_id,
                    user_id,
                    at,
                    &limits,
                    (week.start, week.end),
                    (day.start, day.end),
                )
            })
            .await
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(AppError::AppendStatusUnknown(join_err.to_string())),
        }
    }

    async fn count_lifetime(&self, coupon_id: i64) -> Result<i64> {
        retry::with_read_retry(&self.retry, || {
            UsageLogQueries::count_for_coupon(self.database.pool(), coupon_id)
        })
        .await
    }

    async fn count_lifetime_for_user(&self, coupon_id: i64, user_id: i64) -> Result<i64> {
        retry::with_read_retry(&self.retry, || {
            UsageLogQueries::count_for_coupon_and_user(self.database.pool(), coupon_id, user_id)
        })
        .await
    }

    async fn count_in_window(&self, coupon_id: i64, user_id: i64, window: Window) -> Result<i64> {
        retry::with_read_retry(&self.retry, || {
            UsageLogQueries::count_in_window(
                self.database.pool(),
                coupon_id,
                user_id,
                window.start,
                window.end,
            )
        })
        .await
    }
}
