use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::models::{Coupon, RedemptionOutcome, User};
use crate::services::directory::Directory;
use crate::services::ledger::{daily_window, weekly_window, UsageLedger};

/// The redemption-eligibility engine. Stateless: every invocation re-derives
/// all counts from the ledger, so no cached counter can drift from the
/// recorded facts.
pub struct RedemptionService {
    directory: Arc<dyn Directory>,
    ledger: Arc<dyn UsageLedger>,
}

impl RedemptionService {
    pub fn new(directory: Arc<dyn Directory>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self { directory, ledger }
    }

    /// Decides whether `username` may redeem `coupon_name` as of `at`,
    /// recording the redemption when allowed.
    ///
    /// Checks run in a fixed order and stop at the first violation: user
    /// existence, coupon existence, global cap, per-user lifetime cap, weekly
    /// cap, daily cap. The order is a published contract; it determines which
    /// message a caller sees when several limits are violated at once.
    pub async fn apply(
        &self,
        coupon_name: &str,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<RedemptionOutcome> {
        let Some(user) = self.directory.find_user_by_name(username).await? else {
            return Ok(RedemptionOutcome::InvalidUser);
        };
        let Some(coupon) = self.directory.find_coupon_by_name(coupon_name).await? else {
            return Ok(RedemptionOutcome::InvalidCoupon);
        };

        loop {
            if let Some(outcome) = self.first_exhausted(&coupon, &user, at).await? {
                tracing::debug!(
                    coupon = %coupon.name,
                    user = %user.name,
                    outcome = outcome.message(),
                    "redemption refused"
                );
                return Ok(outcome);
            }

            let appended = self
                .ledger
                .append_if_within(coupon.id, user.id, at, &coupon.limits())
                .await?;

            match appended {
                Some(record) => {
                    tracing::info!(
                        coupon = %coupon.name,
                        user = %user.name,
                        record_id = record.id,
                        "redemption recorded"
                    );
                    return Ok(RedemptionOutcome::Redeemed(record));
                }
                // A concurrent request consumed the remaining quota between
                // the checks and the append. Counts only grow, so another
                // pass classifies against the limit that is now saturated.
                None => continue,
            }
        }
    }

    async fn first_exhausted(
        &self,
        coupon: &Coupon,
        user: &User,
        at: DateTime<Utc>,
    ) -> Result<Option<RedemptionOutcome>> {
        let limits = coupon.limits();

        if self.ledger.count_lifetime(coupon.id).await? >= limits.global_total {
            return Ok(Some(RedemptionOutcome::GlobalExhausted));
        }

        if self
            .ledger
            .count_lifetime_for_user(coupon.id, user.id)
            .await?
            >= limits.user_total
        {
            return Ok(Some(RedemptionOutcome::UserExhausted));
        }

        if self
            .ledger
            .count_in_window(coupon.id, user.id, weekly_window(at))
            .await?
            >= limits.user_weekly
        {
            return Ok(Some(RedemptionOutcome::WeeklyExhausted));
        }

        if self
            .ledger
            .count_in_window(coupon.id, user.id, daily_window(at))
            .await?
            >= limits.user_daily
        {
            return Ok(Some(RedemptionOutcome::DailyExhausted));
        }

        Ok(None)
    }
}
