//! Outbound attendance events.
//!
//! State-machine transitions publish here explicitly after the record is
//! committed; delivery is decoupled from persistence. Dashboard
//! transports can subscribe later without touching the handlers.

use crate::attendance::{MarkAction, Marked};
use crate::model::attendance::AttendanceStatus;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEvent {
    pub event_id: String,
    pub action: MarkAction,
    pub user_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by_face: bool,
    pub confidence: Option<f64>,
}

impl AttendanceEvent {
    pub fn from_marked(marked: &Marked) -> Self {
        AttendanceEvent {
            event_id: Uuid::new_v4().to_string(),
            action: marked.action,
            user_id: marked.record.user_id,
            date: marked.record.date,
            status: marked.record.status,
            marked_by_face: marked.record.marked_by_face,
            confidence: marked.record.confidence_score,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AttendanceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget. Having no subscribers is normal, not an error.
    pub fn publish(&self, event: AttendanceEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("attendance event dropped: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceRecord;
    use chrono::Utc;

    fn marked() -> Marked {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        Marked {
            action: MarkAction::CheckIn,
            record: AttendanceRecord {
                id: 1,
                user_id: 42,
                date,
                check_in_time: date.and_hms_opt(8, 50, 0),
                check_out_time: None,
                status: AttendanceStatus::Present,
                marked_by_face: true,
                confidence_score: Some(0.91),
                location: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(AttendanceEvent::from_marked(&marked()));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.user_id, 42);
        assert_eq!(event.action, MarkAction::CheckIn);
        assert_eq!(event.status, AttendanceStatus::Present);
        assert!(event.marked_by_face);
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(8);
        // must not panic or block
        bus.publish(AttendanceEvent::from_marked(&marked()));
    }
}
