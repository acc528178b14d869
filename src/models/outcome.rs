use serde::Serialize;

use crate::models::UsageRecord;

/// Result of a user or coupon registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub code: RegistrationCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationCode {
    Created,
    AlreadyExists,
}

/// Terminal outcome of a redemption attempt. Every variant is a normal
/// business result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    InvalidUser,
    InvalidCoupon,
    GlobalExhausted,
    UserExhausted,
    WeeklyExhausted,
    DailyExhausted,
    Redeemed(UsageRecord),
}

impl RedemptionOutcome {
    pub fn redeemed(&self) -> bool {
        matches!(self, RedemptionOutcome::Redeemed(_))
    }

    /// User-facing message. The wording is a published contract; integrations
    /// match on these exact strings.
    pub fn message(&self) -> &'static str {
        match self {
            RedemptionOutcome::InvalidUser => "Not a valid user",
            RedemptionOutcome::InvalidCoupon => "Not a valid coupon",
            RedemptionOutcome::GlobalExhausted => "Coupon has been exhausted",
            RedemptionOutcome::UserExhausted => {
                "User has exhausted the number of times he/she can use a particular coupon"
            }
            RedemptionOutcome::WeeklyExhausted => {
                "User has exhausted the number of times he/she can use a particular coupon in a week"
            }
            RedemptionOutcome::DailyExhausted => {
                "User has exhausted the number of times he/she can use a particular coupon in a day"
            }
            RedemptionOutcome::Redeemed(_) => "Redeemed discount",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplyCouponResponse {
    pub username: String,
    pub coupon_name: String,
    pub message: String,
    pub redeemed: bool,
}
