//! C6: the pending-alert priority queue.
//!
//! Ordered by `(priority desc, arrival_sequence asc)` so that within a
//! priority band, alerts are served FIFO. Bounded capacity; `offer` rejects
//! once full rather than growing without limit (§4.6, §7 ResourceExhaustion).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use drone_domain::Alert;
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone)]
struct QueuedAlert {
    alert: Alert,
    arrival_sequence: u64,
}

impl PartialEq for QueuedAlert {
    fn eq(&self, other: &Self) -> bool {
        self.alert.alert_id == other.alert.alert_id
    }
}
impl Eq for QueuedAlert {}

impl PartialOrd for QueuedAlert {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedAlert {
    fn cmp(&self, other: &Self) -> Ordering {
        self.alert
            .priority
            .cmp(&other.alert.priority)
            .then_with(|| other.arrival_sequence.cmp(&self.arrival_sequence))
    }
}

struct Inner {
    heap: BinaryHeap<QueuedAlert>,
    present: HashSet<Uuid>,
    next_sequence: u64,
    capacity: usize,
}

/// Thread-safe bounded priority queue of pending alerts.
pub struct AlertQueue {
    inner: Mutex<Inner>,
}

impl AlertQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                present: HashSet::new(),
                next_sequence: 0,
                capacity,
            }),
        }
    }

    /// Enqueue an alert. Rejects once the queue is at capacity, unless the
    /// alert is already present (re-offering an unmatched alert never grows
    /// the set).
    pub fn offer(&self, alert: Alert) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.present.contains(&alert.alert_id) && inner.present.len() >= inner.capacity {
            return Err(OrchestratorError::QueueFull {
                capacity: inner.capacity,
            });
        }
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.present.insert(alert.alert_id);
        inner.heap.push(QueuedAlert {
            alert,
            arrival_sequence: sequence,
        });
        Ok(())
    }

    /// Pop up to `n` highest-priority alerts, removing them from the queue.
    /// Callers that fail to match an alert must [`offer`](Self::offer) it
    /// back so it is retried next cycle.
    pub fn poll(&self, n: usize) -> Vec<Alert> {
        let mut inner = self.inner.lock().unwrap();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(queued) = inner.heap.pop() else {
                break;
            };
            inner.present.remove(&queued.alert.alert_id);
            out.push(queued.alert);
        }
        out
    }

    /// Remove a specific alert regardless of its position (e.g. once it has
    /// been manually resolved out of band).
    pub fn remove(&self, alert_id: Uuid) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.present.remove(&alert_id) {
            return false;
        }
        let remaining: BinaryHeap<QueuedAlert> = inner
            .heap
            .drain()
            .filter(|q| q.alert.alert_id != alert_id)
            .collect();
        inner.heap = remaining;
        true
    }

    /// Drain and return every alert created before `cutoff`, regardless of
    /// priority rank, so the scheduler can expire them (§4.8 TTL).
    pub fn expire_older_than(&self, cutoff: DateTime<Utc>) -> Vec<Alert> {
        let mut inner = self.inner.lock().unwrap();
        let (expired, keep): (Vec<_>, Vec<_>) = inner
            .heap
            .drain()
            .partition(|q| q.alert.created_at < cutoff);
        inner.heap = keep.into_iter().collect();
        for q in &expired {
            inner.present.remove(&q.alert.alert_id);
        }
        expired.into_iter().map(|q| q.alert).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().present.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drone_domain::{AlertSeverity, AlertStatus, Coordinates};

    fn alert(priority: i32) -> Alert {
        Alert {
            alert_id: Uuid::new_v4(),
            tile_id: Uuid::new_v4(),
            event_type: "thermal".to_string(),
            confidence: 0.9,
            severity: AlertSeverity::Medium,
            priority,
            position: Coordinates::default(),
            status: AlertStatus::New,
            metadata: serde_json::Value::Null,
            demotion_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn higher_priority_polls_first() {
        let queue = AlertQueue::new(10);
        queue.offer(alert(3)).unwrap();
        queue.offer(alert(9)).unwrap();
        let polled = queue.poll(2);
        assert_eq!(polled[0].priority, 9);
        assert_eq!(polled[1].priority, 3);
    }

    #[test]
    fn equal_priority_breaks_ties_fifo() {
        let queue = AlertQueue::new(10);
        let first = alert(5);
        let first_id = first.alert_id;
        queue.offer(first).unwrap();
        queue.offer(alert(5)).unwrap();
        let polled = queue.poll(1);
        assert_eq!(polled[0].alert_id, first_id);
    }

    #[test]
    fn offer_rejects_once_capacity_reached() {
        let queue = AlertQueue::new(1);
        queue.offer(alert(1)).unwrap();
        let err = queue.offer(alert(2)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResourceExhaustion);
    }

    #[test]
    fn expire_older_than_removes_stale_alerts_regardless_of_priority() {
        let queue = AlertQueue::new(10);
        let mut stale = alert(1);
        stale.created_at = Utc::now() - chrono::Duration::hours(1);
        queue.offer(stale).unwrap();
        queue.offer(alert(9)).unwrap();

        let expired = queue.expire_older_than(Utc::now() - chrono::Duration::minutes(30));
        assert_eq!(expired.len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
