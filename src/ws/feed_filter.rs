//! Which check-in events a live-feed connection receives.
//!
//! A fresh connection receives nothing. `subscribe` adds events or turns on
//! the `"*"` selector; `unsubscribe` removes them or turns it off. Explicit
//! ids survive a wildcard being switched off again.

use std::collections::BTreeSet;

use serde::Serialize;

use super::messages::EventSelector;
use crate::domain::{CheckInEvent, EventId};

/// The watched events of one connection.
#[derive(Debug, Default)]
pub struct FeedFilter {
    watched: BTreeSet<EventId>,
    all_events: bool,
}

/// Acknowledgement payload for a subscription command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterAck {
    /// Ids whose state the command actually changed, ascending.
    pub changed: Vec<EventId>,
    /// Explicitly watched events after the command.
    pub count: usize,
    /// Whether `"*"` is on after the command.
    pub wildcard: bool,
}

impl FeedFilter {
    /// Starts watching the selected events.
    pub fn watch(&mut self, selectors: &[EventSelector]) -> FilterAck {
        let mut changed = Vec::new();
        for selector in selectors {
            match selector.event_id() {
                Some(id) if self.watched.insert(id) => changed.push(id),
                Some(_) => {}
                None => self.all_events = true,
            }
        }
        self.ack(changed)
    }

    /// Stops watching the selected events.
    pub fn unwatch(&mut self, selectors: &[EventSelector]) -> FilterAck {
        let mut changed = Vec::new();
        for selector in selectors {
            match selector.event_id() {
                Some(id) if self.watched.remove(&id) => changed.push(id),
                Some(_) => {}
                None => self.all_events = false,
            }
        }
        self.ack(changed)
    }

    /// Whether `event` should be forwarded.
    #[must_use]
    pub fn admits(&self, event: &CheckInEvent) -> bool {
        self.all_events || self.watched.contains(&event.event_id())
    }

    fn ack(&self, mut changed: Vec<EventId>) -> FilterAck {
        changed.sort_unstable();
        FilterAck {
            changed,
            count: self.watched.len(),
            wildcard: self.all_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn regenerated(id: i64) -> CheckInEvent {
        CheckInEvent::CodeRegenerated {
            event_id: EventId::new(id),
            timestamp: Utc::now(),
        }
    }

    fn ids(raw: &[i64]) -> Vec<EventSelector> {
        raw.iter().map(|id| EventSelector::Id(EventId::new(*id))).collect()
    }

    const STAR: EventSelector = EventSelector::Text(None);

    #[test]
    fn fresh_filter_admits_nothing() {
        assert!(!FeedFilter::default().admits(&regenerated(1)));
    }

    #[test]
    fn watch_reports_only_new_ids() {
        let mut filter = FeedFilter::default();
        let first = filter.watch(&ids(&[9, 3]));
        assert_eq!(first.changed, vec![EventId::new(3), EventId::new(9)]);
        assert_eq!(first.count, 2);

        let again = filter.watch(&ids(&[3, 4]));
        assert_eq!(again.changed, vec![EventId::new(4)]);
        assert_eq!(again.count, 3);
        assert!(filter.admits(&regenerated(4)));
        assert!(!filter.admits(&regenerated(5)));
    }

    #[test]
    fn wildcard_off_keeps_explicit_ids() {
        let mut filter = FeedFilter::default();
        filter.watch(&ids(&[2]));
        let on = filter.watch(&[STAR]);
        assert!(on.wildcard);
        assert!(filter.admits(&regenerated(40)));

        let off = filter.unwatch(&[STAR]);
        assert!(!off.wildcard);
        assert!(off.changed.is_empty());
        assert!(!filter.admits(&regenerated(40)));
        assert!(filter.admits(&regenerated(2)));
    }

    #[test]
    fn unwatch_ignores_unknown_ids() {
        let mut filter = FeedFilter::default();
        filter.watch(&ids(&[1, 2]));
        let ack = filter.unwatch(&ids(&[1, 7]));
        assert_eq!(ack.changed, vec![EventId::new(1)]);
        assert_eq!(ack.count, 1);
    }
}
