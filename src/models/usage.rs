use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One immutable redemption fact. The set of these rows is the sole source of
/// truth for quota consumption; counts are always derived by querying it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    pub coupon_id: i64,
    pub user_id: i64,
    pub redeemed_at: DateTime<Utc>,
}
