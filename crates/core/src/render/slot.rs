//! Single-job admission gate.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One-permit gate; at most one render job holds it at a time.
#[derive(Debug, Clone)]
pub struct AdmissionSlot {
    semaphore: Arc<Semaphore>,
}

/// Held for the whole lifetime of an admitted job; dropping it frees the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl Default for AdmissionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionSlot {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Takes the slot without waiting. `None` when a job already holds it.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| AdmissionPermit { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_holder() {
        let slot = AdmissionSlot::new();
        assert!(!slot.is_busy());

        let permit = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());

        drop(permit);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = AdmissionSlot::new();
        let other = slot.clone();

        let _permit = slot.try_acquire().unwrap();
        assert!(other.is_busy());
        assert!(other.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_released_when_task_panics() {
        let slot = AdmissionSlot::new();
        let permit = slot.try_acquire().unwrap();

        let handle = tokio::spawn(async move {
            let _held = permit;
            panic!("job blew up");
        });
        assert!(handle.await.is_err());

        assert!(!slot.is_busy());
    }
}
