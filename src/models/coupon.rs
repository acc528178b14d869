use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub name: String,
    pub global_total: i64,
    pub user_total: i64,
    pub user_daily: i64,
    pub user_weekly: i64,
}

impl Coupon {
    /// The configured quota set for this coupon. The four limits live on the
    /// coupon row itself; there is no separate registry table.
    pub fn limits(&self) -> CouponLimits {
        CouponLimits {
            global_total: self.global_total,
            user_total: self.user_total,
            user_daily: self.user_daily,
            user_weekly: self.user_weekly,
        }
    }
}

/// Maximum redemption counts per scope. Zero means never redeemable in that
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponLimits {
    pub global_total: i64,
    pub user_total: i64,
    pub user_daily: i64,
    pub user_weekly: i64,
}

impl CouponLimits {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("global_total", self.global_total),
            ("user_total", self.user_total),
            ("user_daily", self.user_daily),
            ("user_weekly", self.user_weekly),
        ] {
            if value < 0 {
                return Err(format!("limit `{}` must be non-negative, got {}", field, value));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub name: String,
    pub limits: CouponLimits,
}

#[derive(Debug, Serialize)]
pub struct CouponListResponse {
    pub coupons: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub coupon_name: String,
    pub username: String,
}
