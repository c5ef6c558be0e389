//! # Randomness Correlator
//!
//! Maps outstanding randomness request ids to the craft waiting on them.
//!
//! A record is created when a probabilistic craft starts and taken out
//! exactly once when the authority calls back. Taking is unconditional:
//! once a delivery has been seen the id is gone, so a redelivered or late
//! callback finds nothing and settles nothing.

use std::collections::HashMap;

use crate::recipe::{AccountId, ActiveCraftId, RequestId};

/// A craft waiting on the randomness authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRandomnessRequest {
    /// Account that started the craft.
    pub account: AccountId,
    /// The waiting craft.
    pub active_craft_id: ActiveCraftId,
}

/// Pending requests by id.
#[derive(Debug, Default)]
pub struct RandomnessCorrelator {
    pending: HashMap<RequestId, PendingRandomnessRequest>,
}

impl RandomnessCorrelator {
    /// Creates an empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request. Returns false if the id was already outstanding,
    /// in which case the existing record is kept.
    pub fn register(&mut self, request_id: RequestId, request: PendingRandomnessRequest) -> bool {
        if self.pending.contains_key(&request_id) {
            return false;
        }
        self.pending.insert(request_id, request);
        true
    }

    /// Removes and returns the record for `request_id`, if any.
    pub fn take(&mut self, request_id: RequestId) -> Option<PendingRandomnessRequest> {
        self.pending.remove(&request_id)
    }

    /// Peeks at an outstanding record.
    #[must_use]
    pub fn get(&self, request_id: RequestId) -> Option<&PendingRandomnessRequest> {
        self.pending.get(&request_id)
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: PendingRandomnessRequest = PendingRandomnessRequest {
        account: 7,
        active_craft_id: 3,
    };

    #[test]
    fn test_take_is_once() {
        let mut correlator = RandomnessCorrelator::new();
        assert!(correlator.register(11, REQUEST));

        assert_eq!(correlator.take(11), Some(REQUEST));
        assert_eq!(correlator.take(11), None);
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let mut correlator = RandomnessCorrelator::new();
        assert!(correlator.register(11, REQUEST));

        let other = PendingRandomnessRequest { account: 8, active_craft_id: 4 };
        assert!(!correlator.register(11, other));
        assert_eq!(correlator.get(11), Some(&REQUEST));
        assert_eq!(correlator.len(), 1);
    }

    #[test]
    fn test_unknown_request() {
        let mut correlator = RandomnessCorrelator::new();
        assert_eq!(correlator.take(99), None);
    }
}
