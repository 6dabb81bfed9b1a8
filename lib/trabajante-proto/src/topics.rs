//! MQTT topic templates. Every topic string the firmware publishes or
//! subscribes to is built here so the publish side and the subscribe side
//! can never drift apart.

/// Builders for topics the device publishes to.
pub mod publish {
    pub fn sensor_data(kaiser: &str, esp: &str, gpio: u8) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/sensor/{gpio}/data")
    }

    pub fn sensor_data_i2c(kaiser: &str, esp: &str, stable_id: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/sensor/{stable_id}/data")
    }

    pub fn sensor_batch(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/sensor/batch")
    }

    pub fn actuator_status(kaiser: &str, esp: &str, gpio: u8) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/actuator/{gpio}/status")
    }

    pub fn actuator_response(kaiser: &str, esp: &str, gpio: u8) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/actuator/{gpio}/response")
    }

    pub fn actuator_alert(kaiser: &str, esp: &str, gpio: u8) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/actuator/{gpio}/alert")
    }

    pub fn actuator_emergency(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/actuator/emergency")
    }

    pub fn heartbeat(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/system/heartbeat")
    }

    pub fn diagnostics(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/system/diagnostics")
    }

    pub fn will(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/system/will")
    }

    pub fn system_error(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/system/error")
    }

    pub fn config_response(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/config_response")
    }

    pub fn zone_ack(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/zone/ack")
    }

    pub fn subzone_ack(kaiser: &str, esp: &str) -> String {
        format!("kaiser/{kaiser}/esp/{esp}/subzone/ack")
    }
}

/// Subscription patterns (may contain `+`/`#` wildcards) the device
/// registers at connect time, paired with a stable handler key the
/// `TopicRouter` dispatches on.
pub mod subscribe {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub enum Handler {
        ActuatorCommand,
        SystemCommand,
        Config,
        ZoneAssign,
        SubzoneAssign,
        SensorProcessed,
        BroadcastEmergency,
    }

    pub fn patterns(kaiser: &str, esp: &str) -> [(String, Handler); 7] {
        [
            (
                format!("kaiser/{kaiser}/esp/{esp}/actuator/+/command"),
                Handler::ActuatorCommand,
            ),
            (
                format!("kaiser/{kaiser}/esp/{esp}/system/command"),
                Handler::SystemCommand,
            ),
            (
                format!("kaiser/{kaiser}/esp/{esp}/config"),
                Handler::Config,
            ),
            (
                format!("kaiser/{kaiser}/esp/{esp}/zone/assign"),
                Handler::ZoneAssign,
            ),
            (
                format!("kaiser/{kaiser}/esp/{esp}/subzone/assign"),
                Handler::SubzoneAssign,
            ),
            (
                format!("kaiser/{kaiser}/esp/{esp}/sensor/+/processed"),
                Handler::SensorProcessed,
            ),
            (
                "kaiser/broadcast/emergency".to_string(),
                Handler::BroadcastEmergency,
            ),
        ]
    }
}

/// Matches a concrete inbound topic against an MQTT subscription pattern
/// containing `+` (single segment wildcard) and `#` (terminal
/// multi-segment wildcard). Returns the number of pattern segments that
/// matched literally, used by the router to rank "more specific wins".
pub fn match_topic(pattern: &str, topic: &str) -> Option<usize> {
    let pat_segs: Vec<&str> = pattern.split('/').collect();
    let top_segs: Vec<&str> = topic.split('/').collect();

    let mut specificity = 0;
    let mut pi = 0;
    let mut ti = 0;

    while pi < pat_segs.len() {
        match pat_segs[pi] {
            "#" => return Some(specificity),
            "+" => {
                if ti >= top_segs.len() {
                    return None;
                }
                ti += 1;
                pi += 1;
            }
            lit => {
                if ti >= top_segs.len() || top_segs[ti] != lit {
                    return None;
                }
                specificity += 1;
                ti += 1;
                pi += 1;
            }
        }
    }

    if ti == top_segs.len() {
        Some(specificity)
    } else {
        None
    }
}

/// Extracts the GPIO number from a topic of the form
/// `.../actuator/{gpio}/command` or `.../sensor/{gpio}/processed`.
pub fn extract_gpio(topic: &str, anchor: &str) -> Option<u8> {
    let segs: Vec<&str> = topic.split('/').collect();
    let idx = segs.iter().position(|&s| s == anchor)?;
    segs.get(idx + 1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_canonical_sensor_topic() {
        assert_eq!(
            publish::sensor_data("god", "ESP_12AB34CD", 34),
            "kaiser/god/esp/ESP_12AB34CD/sensor/34/data"
        );
    }

    #[test]
    fn plus_wildcard_matches_single_segment() {
        let pattern = "kaiser/god/esp/ESP_X/actuator/+/command";
        assert_eq!(
            match_topic(pattern, "kaiser/god/esp/ESP_X/actuator/5/command"),
            Some(5)
        );
        assert_eq!(
            match_topic(pattern, "kaiser/god/esp/ESP_X/actuator/5/6/command"),
            None
        );
    }

    #[test]
    fn hash_wildcard_matches_terminal_remainder() {
        assert_eq!(match_topic("kaiser/broadcast/#", "kaiser/broadcast/emergency"), Some(2));
    }

    #[test]
    fn more_specific_pattern_has_higher_specificity() {
        let specific = match_topic(
            "kaiser/god/esp/ESP_X/actuator/5/command",
            "kaiser/god/esp/ESP_X/actuator/5/command",
        )
        .unwrap();
        let wildcard = match_topic(
            "kaiser/god/esp/ESP_X/actuator/+/command",
            "kaiser/god/esp/ESP_X/actuator/5/command",
        )
        .unwrap();
        assert!(specific > wildcard);
    }

    #[test]
    fn extracts_gpio_from_command_topic() {
        assert_eq!(
            extract_gpio("kaiser/god/esp/ESP_X/actuator/5/command", "actuator"),
            Some(5)
        );
    }
}
