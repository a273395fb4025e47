//! One-shot capture of the animation id.
//!
//! The network listener publishes into the cell; extraction later reads it or
//! waits for the first write. Only the first published value is kept.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::watch;

use super::error::DriverError;

/// Creates a connected publisher/cell pair.
pub fn animation_id_channel() -> (AnimationIdPublisher, AnimationIdCell) {
    let (tx, rx) = watch::channel(None);
    (AnimationIdPublisher { tx }, AnimationIdCell { rx })
}

/// Write side, held by the response listener.
#[derive(Debug)]
pub struct AnimationIdPublisher {
    tx: watch::Sender<Option<String>>,
}

impl AnimationIdPublisher {
    /// Stores `id` unless a value is already present. Returns whether it was stored.
    pub fn publish(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(id);
            true
        })
    }

    /// Whether a value has been published.
    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

/// Read side, held by the state machine.
#[derive(Debug, Clone)]
pub struct AnimationIdCell {
    rx: watch::Receiver<Option<String>>,
}

impl AnimationIdCell {
    /// The captured id, if already observed.
    pub fn get(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Waits for the first published id.
    ///
    /// `limit = None` waits until the publisher goes away.
    pub async fn wait(&mut self, limit: Option<Duration>) -> Result<String, DriverError> {
        if let Some(id) = self.get() {
            return Ok(id);
        }

        let waited = match limit {
            Some(limit) => {
                match tokio::time::timeout(limit, self.rx.wait_for(Option::is_some)).await {
                    Ok(result) => result.map(|value| (*value).clone()),
                    Err(_) => {
                        return Err(DriverError::extraction(format!(
                            "No animation id captured within {} ms",
                            limit.as_millis()
                        )))
                    }
                }
            }
            None => self
                .rx
                .wait_for(Option::is_some)
                .await
                .map(|value| (*value).clone()),
        };

        waited
            .ok()
            .flatten()
            .ok_or_else(|| DriverError::extraction("Response listener closed before an animation id was captured"))
    }
}

/// How many unmatched "loading finished" ids are remembered.
const FINISHED_BACKLOG: usize = 256;

/// Pairs a matching response with the end of its body download.
///
/// The two events come from separate listeners and may be observed in either
/// order, so ids seen finishing before their response was matched are kept
/// in a bounded backlog.
#[derive(Debug)]
pub(crate) struct ResponseMatcher<K> {
    matched: Vec<K>,
    finished: VecDeque<K>,
}

impl<K: PartialEq> ResponseMatcher<K> {
    pub(crate) fn new() -> Self {
        Self {
            matched: Vec::new(),
            finished: VecDeque::new(),
        }
    }

    /// Records a response that matched the animation endpoint. Returns the id
    /// when its body has already finished loading.
    pub(crate) fn on_response(&mut self, id: K) -> Option<K> {
        if let Some(pos) = self.finished.iter().position(|f| *f == id) {
            return self.finished.remove(pos);
        }
        self.matched.push(id);
        None
    }

    /// Records any finished request. Returns the id when it belongs to a
    /// matched response.
    pub(crate) fn on_finished(&mut self, id: K) -> Option<K> {
        if let Some(pos) = self.matched.iter().position(|m| *m == id) {
            return Some(self.matched.swap_remove(pos));
        }
        if self.finished.len() == FINISHED_BACKLOG {
            self.finished.pop_front();
        }
        self.finished.push_back(id);
        None
    }
}
