use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{CourseId, EnrollmentEvent};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub of enrollment events per course, for waitlist tables and dashboards.
pub struct NotifyHub {
    channels: DashMap<CourseId, broadcast::Sender<EnrollmentEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a course. Creates the channel if needed.
    pub fn subscribe(&self, course_id: &str) -> broadcast::Receiver<EnrollmentEvent> {
        if let Some(sender) = self.channels.get(course_id) {
            return sender.subscribe();
        }
        let sender = self
            .channels
            .entry(course_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, course_id: &str, event: &EnrollmentEvent) {
        if let Some(sender) = self.channels.get(course_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a channel (e.g. when a course is retired).
    pub fn remove(&self, course_id: &str) {
        self.channels.remove(course_id);
    }
}
