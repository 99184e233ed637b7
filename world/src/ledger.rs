//! Currency, score and base health bookkeeping.

/// Economic and survival counters of a session.
///
/// Every currency movement goes through this type: spends on placement and
/// upgrades, refunds on sales and rewards on reconciled kills.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    currency: u32,
    score: u64,
    base_health: u32,
}

impl Ledger {
    pub(crate) const fn new(currency: u32, base_health: u32) -> Self {
        Self {
            currency,
            score: 0,
            base_health,
        }
    }

    pub(crate) const fn restored(currency: u32, score: u64, base_health: u32) -> Self {
        Self {
            currency,
            score,
            base_health,
        }
    }

    /// Currency available for building and upgrading.
    #[must_use]
    pub const fn currency(&self) -> u32 {
        self.currency
    }

    /// Score accumulated from kills.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Remaining base health.
    #[must_use]
    pub const fn base_health(&self) -> u32 {
        self.base_health
    }

    /// Deducts `amount` if affordable.
    pub(crate) fn try_spend(&mut self, amount: u32) -> bool {
        match self.currency.checked_sub(amount) {
            Some(remaining) => {
                self.currency = remaining;
                true
            }
            None => false,
        }
    }

    pub(crate) fn earn(&mut self, amount: u32) {
        self.currency = self.currency.saturating_add(amount);
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(u64::from(points));
    }

    /// Applies leak damage and returns the health left.
    pub(crate) fn lose_health(&mut self, damage: u32) -> u32 {
        self.base_health = self.base_health.saturating_sub(damage);
        self.base_health
    }
}
