// emrkit/src/inflight.rs
//
// In-flight request guard keyed by (patient id, operation)

use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;

use crate::api::Operation;
use crate::types::PatientId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InFlightKey {
    pub patient: Option<PatientId>,
    pub operation: Operation,
}

impl InFlightKey {
    pub fn new(patient: Option<&PatientId>, operation: Operation) -> Self {
        Self {
            patient: patient.cloned(),
            operation,
        }
    }
}

/// Set of requests currently on the wire. Shared by every page of the app.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<DashSet<InFlightKey>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if an identical request is still pending.
    pub fn try_acquire(&self, key: InFlightKey) -> Option<InFlightTicket> {
        if self.keys.insert(key.clone()) {
            Some(InFlightTicket {
                keys: self.keys.clone(),
                key,
            })
        } else {
            debug!(
                operation = key.operation.as_str(),
                patient = ?key.patient,
                "Request already in flight, ignoring trigger"
            );
            None
        }
    }

    pub fn is_pending(&self, key: &InFlightKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct InFlightTicket {
    keys: Arc<DashSet<InFlightKey>>,
    key: InFlightKey,
}

impl InFlightTicket {
    pub fn key(&self) -> &InFlightKey {
        &self.key
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_blocked_until_release() {
        let inflight = InFlight::new();
        let id = PatientId::new("1");
        let key = InFlightKey::new(Some(&id), Operation::GetSummary);

        let ticket = inflight.try_acquire(key.clone()).unwrap();
        assert!(inflight.try_acquire(key.clone()).is_none());
        assert!(inflight.is_pending(&key));

        drop(ticket);
        assert!(!inflight.is_pending(&key));
        assert!(inflight.try_acquire(key).is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let inflight = InFlight::new();
        let a = PatientId::new("1");
        let b = PatientId::new("2");

        let _summary_a = inflight.try_acquire(InFlightKey::new(Some(&a), Operation::GetSummary)).unwrap();
        let _analysis_a = inflight.try_acquire(InFlightKey::new(Some(&a), Operation::GetAnalysis)).unwrap();
        let _summary_b = inflight.try_acquire(InFlightKey::new(Some(&b), Operation::GetSummary)).unwrap();
        assert_eq!(inflight.len(), 3);
    }
}
