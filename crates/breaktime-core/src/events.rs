use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events published by the scheduler for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SchedulerEvent {
    UsageChanged {
        usage_seconds: u64,
        is_monitoring: bool,
        is_break_active: bool,
    },
    BreakAlert {
        usage_seconds: u64,
    },
    TimerReset,
    MonitoringToggled {
        is_monitoring: bool,
    },
}

pub type EventSender = mpsc::UnboundedSender<SchedulerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SchedulerEvent>;

/// Explicit subscriber list for scheduler events.
///
/// Each subscriber owns an unbounded receiver, so publishing never blocks
/// the tick loop. Subscribers that dropped their receiver are pruned on the
/// next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<EventSender>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: &SchedulerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let mut bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(&SchedulerEvent::TimerReset);

        assert_eq!(first.try_recv().unwrap(), SchedulerEvent::TimerReset);
        assert_eq!(second.try_recv().unwrap(), SchedulerEvent::TimerReset);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&SchedulerEvent::MonitoringToggled {
            is_monitoring: false,
        });

        assert_eq!(bus.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_event_serializes_with_kebab_case_tag() {
        let json = serde_json::to_string(&SchedulerEvent::BreakAlert {
            usage_seconds: 1800,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"break-alert","usage_seconds":1800}"#);
    }
}
