//! The inbound topic router (spec §4.6). MQTT callbacks never run
//! application code directly; they park the raw message here, and the
//! cooperative loop drains it on its own schedule.

use std::collections::VecDeque;

use trabajante_proto::topics::{match_topic, subscribe::Handler};

pub struct InboundMessage {
    pub handler: Handler,
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct TopicRouter {
    patterns: Vec<(String, Handler)>,
    inbound: VecDeque<InboundMessage>,
    capacity: usize,
}

impl TopicRouter {
    pub fn new(patterns: Vec<(String, Handler)>, capacity: usize) -> Self {
        Self {
            patterns,
            inbound: VecDeque::new(),
            capacity,
        }
    }

    /// Finds the longest-specific-match-wins pattern for `topic`,
    /// breaking ties by registration order, and parks the message for the
    /// loop to drain. Messages for which no pattern matches are dropped.
    pub fn on_message(&mut self, topic: &str, payload: Vec<u8>) {
        let mut best: Option<(usize, usize, Handler)> = None;
        for (i, (pattern, handler)) in self.patterns.iter().enumerate() {
            if let Some(specificity) = match_topic(pattern, topic) {
                let better = match best {
                    None => true,
                    Some((best_spec, best_idx, _)) => {
                        specificity > best_spec || (specificity == best_spec && i < best_idx)
                    }
                };
                if better {
                    best = Some((specificity, i, *handler));
                }
            }
        }

        let Some((_, _, handler)) = best else {
            return;
        };

        if self.inbound.len() >= self.capacity {
            self.inbound.pop_front();
        }
        self.inbound.push_back(InboundMessage {
            handler,
            topic: topic.to_string(),
            payload,
        });
    }

    pub fn drain_one(&mut self) -> Option<InboundMessage> {
        self.inbound.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> TopicRouter {
        TopicRouter::new(
            vec![
                (
                    "kaiser/god/esp/ESP_X/actuator/+/command".to_string(),
                    Handler::ActuatorCommand,
                ),
                (
                    "kaiser/god/esp/ESP_X/actuator/5/command".to_string(),
                    Handler::SystemCommand, // deliberately distinct to prove specificity wins
                ),
                ("kaiser/broadcast/emergency".to_string(), Handler::BroadcastEmergency),
            ],
            8,
        )
    }

    #[test]
    fn most_specific_pattern_wins_over_wildcard() {
        let mut r = router();
        r.on_message("kaiser/god/esp/ESP_X/actuator/5/command", vec![]);
        let msg = r.drain_one().unwrap();
        assert_eq!(msg.handler, Handler::SystemCommand);
    }

    #[test]
    fn unmatched_topic_is_dropped() {
        let mut r = router();
        r.on_message("kaiser/god/esp/ESP_X/unknown/topic", vec![]);
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn queue_is_bounded_and_drops_oldest_on_overflow() {
        let mut r = TopicRouter::new(
            vec![("kaiser/broadcast/emergency".to_string(), Handler::BroadcastEmergency)],
            1,
        );
        r.on_message("kaiser/broadcast/emergency", vec![1]);
        r.on_message("kaiser/broadcast/emergency", vec![2]);
        assert_eq!(r.pending(), 1);
        assert_eq!(r.drain_one().unwrap().payload, vec![2]);
    }
}
