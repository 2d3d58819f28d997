//! Cross-account active-shipment aggregation.
//!
//! A read-only observer over per-account reconciliation output. Accounts
//! publish their active count after each successful cycle and detach when
//! torn down; the aggregate never reaches into a loop's state.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::AccountId;

#[derive(Debug, Default)]
pub struct ActiveShipmentsAggregate {
    counts: Mutex<HashMap<AccountId, usize>>,
}

impl ActiveShipmentsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest active-shipment count for an account. Publishing
    /// also attaches accounts that were not seen before.
    pub fn publish(&self, account_id: AccountId, active_count: usize) {
        self.lock().insert(account_id, active_count);
    }

    /// Forget an account; its shipments no longer contribute to the total.
    pub fn detach(&self, account_id: AccountId) {
        self.lock().remove(&account_id);
    }

    /// Sum of the last-known active counts across attached accounts.
    pub fn total(&self) -> usize {
        self.lock().values().sum()
    }

    pub fn account_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AccountId, usize>> {
        self.counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_follow_publishes_and_detaches() {
        let aggregate = ActiveShipmentsAggregate::new();
        let first = AccountId::new();
        let second = AccountId::new();

        aggregate.publish(first, 2);
        aggregate.publish(second, 3);
        assert_eq!(aggregate.total(), 5);
        assert_eq!(aggregate.account_count(), 2);

        aggregate.publish(first, 0);
        assert_eq!(aggregate.total(), 3);

        aggregate.detach(second);
        assert_eq!(aggregate.total(), 0);
        assert_eq!(aggregate.account_count(), 1);
    }

    #[test]
    fn detaching_an_unknown_account_is_a_no_op() {
        let aggregate = ActiveShipmentsAggregate::new();
        aggregate.detach(AccountId::new());
        assert_eq!(aggregate.total(), 0);
    }
}
