use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{Coupon, CouponLimits, UsageRecord, User};

// Queries return raw `sqlx::Result` so the retry layer can classify the
// failure before it is folded into an application error.

pub struct UserQueries;

impl UserQueries {
    pub async fn insert(pool: &PgPool, name: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT id, name FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, name: &str) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE name = $1)")
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn list_names(pool: &PgPool) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM users")
            .fetch_all(pool)
            .await
    }
}

pub struct CouponQueries;

impl CouponQueries {
    pub async fn insert(pool: &PgPool, name: &str, limits: &CouponLimits) -> sqlx::Result<Coupon> {
        sqlx::query_as::<_, Coupon>(
            r#"
            INSERT INTO coupons (name, global_total, user_total, user_daily, user_weekly)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, global_total, user_total, user_daily, user_weekly
            "#,
        )
        .bind(name)
        .bind(limits.global_total)
        .bind(limits.user_total)
        .bind(limits.user_daily)
        .bind(limits.user_weekly)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> sqlx::Result<Option<Coupon>> {
        sqlx::query_as::<_, Coupon>(
            "SELECT id, name, global_total, user_total, user_daily, user_weekly FROM coupons WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists(pool: &PgPool, name: &str) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM coupons WHERE name = $1)")
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn list_names(pool: &PgPool) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM coupons")
            .fetch_all(pool)
            .await
    }
}

pub struct UsageLogQueries;

impl UsageLogQueries {
    pub async fn insert(
        pool: &PgPool,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> sqlx::Result<UsageRecord> {
        sqlx::query_as::<_, UsageRecord>(
            r#"
            INSERT INTO coupon_usage_log (coupon_id, user_id, redeemed_at)
            VALUES ($1, $2, $3)
            RETURNING id, coupon_id, user_id, redeemed_at
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(at)
        .fetch_one(pool)
        .await
    }

    /// Conditional append: inserts the record only while every one of the four
    /// quota counts is still below its limit, inside one SERIALIZABLE
    /// transaction scoped to this coupon/user. `None` means some quota was
    /// consumed concurrently. Serialization conflicts surface as SQLSTATE
    /// 40001, which the retry layer treats as a definite rollback.
    pub async fn insert_if_within(
        pool: &PgPool,
        coupon_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
        limits: &CouponLimits,
        week: (DateTime<Utc>, DateTime<Utc>),
        day: (DateTime<Utc>, DateTime<Utc>),
    ) -> sqlx::Result<Option<UsageRecord>> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, UsageRecord>(
            r#"
            INSERT INTO coupon_usage_log (coupon_id, user_id, redeemed_at)
            SELECT $1, $2, $3
            WHERE (SELECT COUNT(*) FROM coupon_usage_log
                   WHERE coupon_id = $1) < $4
              AND (SELECT COUNT(*) FROM coupon_usage_log
                   WHERE coupon_id = $1 AND user_id = $2) < $5
              AND (SELECT COUNT(*) FROM coupon_usage_log
                   WHERE coupon_id = $1 AND user_id = $2
                     AND redeemed_at BETWEEN $6 AND $7) < $8
              AND (SELECT COUNT(*) FROM coupon_usage_log
                   WHERE coupon_id = $1 AND user_id = $2
                     AND redeemed_at BETWEEN $9 AND $10) < $11
            RETURNING id, coupon_id, user_id, redeemed_at
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(at)
        .bind(limits.global_total)
        .bind(limits.user_total)
        .bind(week.0)
        .bind(week.1)
        .bind(limits.user_weekly)
        .bind(day.0)
        .bind(day.1)
        .bind(limits.user_daily)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn count_for_coupon(pool: &PgPool, coupon_id: i64) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM coupon_usage_log WHERE coupon_id = $1",
        )
        .bind(coupon_id)
        .fetch_one(pool)
        .await
    }

    pub async fn count_for_coupon_and_user(
        pool: &PgPool,
        coupon_id: i64,
        user_id: i64,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM coupon_usage_log WHERE coupon_id = $1 AND user_id = $2",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn count_in_window(
        pool: &PgPool,
        coupon_id: i64,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM coupon_usage_log
            WHERE coupon_id = $1 AND user_id = $2 AND redeemed_at BETWEEN $3 AND $4
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
    }
}
