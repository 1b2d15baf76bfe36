//! Topic-keyed change notifications.
//!
//! Listeners register interest in named topics (`"sequence"`,
//! `"displaySettings.*"`, ...) and receive matching events in an inbox
//! they drain on their own schedule. Unsubscribing is explicit; listeners
//! whose subscription was dropped are pruned on the next notify.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// An event that can be routed by topic.
pub trait Topic {
    fn topic(&self) -> &str;
}

/// Identifier returned by [`Notifier::subscribe`].
pub type SubscriptionId = u64;

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriptionId,
    inbox: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Takes every event received since the last drain.
    pub fn drain(&self) -> Vec<T> {
        self.inbox.borrow_mut().drain(..).collect()
    }
}

#[derive(Debug)]
struct Listener<T> {
    id: SubscriptionId,
    patterns: Vec<String>,
    inbox: Weak<RefCell<VecDeque<T>>>,
}

impl<T> Listener<T> {
    fn wants(&self, topic: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| topic_matches(p, topic))
    }
}

/// Fan-out of events to topic-filtered listeners.
#[derive(Debug)]
pub struct Notifier<T> {
    next_id: SubscriptionId,
    listeners: Vec<Listener<T>>,
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            listeners: Vec::new(),
        }
    }
}

impl<T: Topic + Clone> Notifier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. An empty pattern list receives every event.
    pub fn subscribe<S: AsRef<str>>(&mut self, patterns: &[S]) -> Subscription<T> {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            inbox: Rc::downgrade(&inbox),
        });
        Subscription { id, inbox }
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn notify(&mut self, event: T) {
        let topic = event.topic().to_string();
        self.listeners.retain(|listener| {
            if !listener.wants(&topic) {
                return true;
            }
            match listener.inbox.upgrade() {
                Some(inbox) => {
                    inbox.borrow_mut().push_back(event.clone());
                    true
                }
                None => false,
            }
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Matches `topic` against a pattern. `"a.*"` matches any topic below `a`,
/// `"*"` matches everything, anything else must match exactly.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix(".*") {
        Some(prefix) => topic
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.')),
        None => pattern == topic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(&'static str);

    impl Topic for Ping {
        fn topic(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_topic_matching() {
        assert!(topic_matches("sequence", "sequence"));
        assert!(!topic_matches("sequence", "sequences"));
        assert!(topic_matches("displaySettings.*", "displaySettings.rows.aa"));
        assert!(!topic_matches("displaySettings.*", "displaySettings"));
        assert!(!topic_matches("features.*", "featuresX.a"));
        assert!(topic_matches("*", "anything"));
    }

    #[test]
    fn test_subscribe_filters_and_unsubscribe() {
        let mut notifier = Notifier::new();
        let settings = notifier.subscribe(&["displaySettings.*"]);
        let all = notifier.subscribe::<&str>(&[]);

        notifier.notify(Ping("displaySettings.rows.numbering"));
        notifier.notify(Ping("sequence"));

        assert_eq!(settings.drain(), vec![Ping("displaySettings.rows.numbering")]);
        assert_eq!(all.drain().len(), 2);

        assert!(notifier.unsubscribe(settings.id()));
        assert!(!notifier.unsubscribe(settings.id()));
        assert_eq!(notifier.listener_count(), 1);
    }

    #[test]
    fn test_inbox_keeps_order_until_drained() {
        let mut notifier = Notifier::new();
        let sub = notifier.subscribe(&["sequence", "features"]);
        notifier.notify(Ping("sequence"));
        notifier.notify(Ping("features"));
        notifier.notify(Ping("sequence"));
        assert_eq!(
            sub.drain(),
            vec![Ping("sequence"), Ping("features"), Ping("sequence")]
        );
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let mut notifier = Notifier::new();
        let sub = notifier.subscribe(&["sequence"]);
        drop(sub);
        notifier.notify(Ping("sequence"));
        assert_eq!(notifier.listener_count(), 0);
    }
}
