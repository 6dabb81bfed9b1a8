//! The offline publish queue (spec §4.6). Buffers outbound messages while
//! the broker connection is down and drains them in FIFO order, one per
//! tick, once it's back.

use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub enqueued_at: u64,
}

/// Topics whose messages must never be evicted ahead of an ordinary
/// message, per spec.md's "protected messages evict non-protected first."
fn is_protected(topic: &str) -> bool {
    topic.contains("config_response") || topic.ends_with("/zone/ack") || topic.ends_with("/subzone/ack")
}

fn is_sensor_data(topic: &str) -> bool {
    topic.contains("/sensor/") || topic.ends_with("/sensor/batch")
}

pub struct PublishQueue {
    capacity: usize,
    per_topic_cap: usize,
    freshness_horizon_seconds: u64,
    messages: VecDeque<OutboundMessage>,
}

impl PublishQueue {
    pub fn new(capacity: usize, per_topic_cap: usize, freshness_horizon_seconds: u64) -> Self {
        Self {
            capacity,
            per_topic_cap,
            freshness_horizon_seconds,
            messages: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn topic_count(&self, topic: &str) -> usize {
        self.messages.iter().filter(|m| m.topic == topic).count()
    }

    fn evict_oldest_in_topic(&mut self, topic: &str) {
        if let Some(idx) = self.messages.iter().position(|m| m.topic == topic) {
            self.messages.remove(idx);
        }
    }

    /// Evicts room for one more message, preferring the oldest
    /// non-protected message over any protected one, so a
    /// `config_response`/zone-ack/subzone-ack is only ever displaced once
    /// nothing else remains (spec.md's testable invariant).
    fn evict_for_global_cap(&mut self) {
        if let Some(idx) = self.messages.iter().position(|m| !is_protected(&m.topic)) {
            self.messages.remove(idx);
        } else if !self.messages.is_empty() {
            self.messages.pop_front();
        }
    }

    /// Drops queued sensor-data messages older than the freshness
    /// horizon; called before enqueueing and before draining so stale
    /// readings never leave the device.
    pub fn expire_stale(&mut self, now: u64) {
        let horizon = self.freshness_horizon_seconds;
        self.messages
            .retain(|m| !is_sensor_data(&m.topic) || now.saturating_sub(m.enqueued_at) <= horizon);
    }

    pub fn enqueue(&mut self, topic: impl Into<String>, payload: Vec<u8>, qos: u8, now: u64) {
        let topic = topic.into();
        self.expire_stale(now);

        if self.per_topic_cap > 0 && self.topic_count(&topic) >= self.per_topic_cap {
            self.evict_oldest_in_topic(&topic);
        }
        if self.messages.len() >= self.capacity {
            self.evict_for_global_cap();
        }

        self.messages.push_back(OutboundMessage {
            topic,
            payload,
            qos,
            enqueued_at: now,
        });
    }

    /// Pops the oldest message for draining; callers should honor the
    /// per-topic QoS when actually publishing it.
    pub fn pop_front(&mut self) -> Option<OutboundMessage> {
        self.messages.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_topic_cap_drops_oldest_within_the_topic() {
        let mut q = PublishQueue::new(100, 2, 60);
        q.enqueue("a/sensor/5/data", vec![1], 1, 0);
        q.enqueue("a/sensor/5/data", vec![2], 1, 1);
        q.enqueue("a/sensor/5/data", vec![3], 1, 2);
        assert_eq!(q.len(), 2);
        let first = q.pop_front().unwrap();
        assert_eq!(first.payload, vec![2]);
    }

    #[test]
    fn global_cap_evicts_non_protected_before_any_protected_message() {
        let mut q = PublishQueue::new(2, 100, 60);
        q.enqueue("a/config_response", vec![1], 2, 0);
        q.enqueue("a/sensor/5/data", vec![2], 1, 1);
        q.enqueue("a/zone/ack", vec![3], 1, 2);
        assert_eq!(q.len(), 2);
        let remaining: Vec<String> = std::iter::from_fn(|| q.pop_front()).map(|m| m.topic).collect();
        assert!(remaining.contains(&"a/config_response".to_string()));
        assert!(remaining.contains(&"a/zone/ack".to_string()));
        assert!(!remaining.contains(&"a/sensor/5/data".to_string()));
    }

    #[test]
    fn protected_evicted_only_once_nothing_else_remains() {
        let mut q = PublishQueue::new(1, 100, 60);
        q.enqueue("a/config_response", vec![1], 2, 0);
        q.enqueue("a/zone/ack", vec![2], 1, 1);
        assert_eq!(q.len(), 1);
        let remaining = q.pop_front().unwrap();
        assert_eq!(remaining.topic, "a/zone/ack");
    }

    #[test]
    fn stale_sensor_readings_are_dropped_past_the_freshness_horizon() {
        let mut q = PublishQueue::new(100, 100, 60);
        q.enqueue("a/sensor/5/data", vec![1], 1, 0);
        q.expire_stale(61);
        assert!(q.is_empty());
    }

    #[test]
    fn fresh_sensor_readings_survive_expiry() {
        let mut q = PublishQueue::new(100, 100, 60);
        q.enqueue("a/sensor/5/data", vec![1], 1, 0);
        q.expire_stale(60);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn drain_preserves_fifo_order_per_topic() {
        let mut q = PublishQueue::new(100, 100, 600);
        q.enqueue("a/config_response", vec![1], 2, 0);
        q.enqueue("a/config_response", vec![2], 2, 1);
        assert_eq!(q.pop_front().unwrap().payload, vec![1]);
        assert_eq!(q.pop_front().unwrap().payload, vec![2]);
    }
}
