//! Bus topic conventions (§4.1/§6), grounded on
//! `original_source/services/api/app/mqtt_client.py`'s topic strings.

use uuid::Uuid;

pub const SATELLITE_ALERTS: &str = "satellite/alerts";
pub const DETECTIONS: &str = "detections";
pub const INFERENCE_RESULTS: &str = "inference/results";

/// Per-UAV topic helpers.
pub struct Topic;

impl Topic {
    #[must_use]
    pub fn commands(uav_id: Uuid) -> String {
        format!("commands/{uav_id}")
    }

    #[must_use]
    pub fn telemetry(uav_id: Uuid) -> String {
        format!("uav/{uav_id}/telemetry")
    }

    #[must_use]
    pub fn status(uav_id: Uuid) -> String {
        format!("uav/{uav_id}/status")
    }

    /// Wildcard subscription pattern matching every UAV's telemetry topic.
    #[must_use]
    pub fn telemetry_wildcard() -> &'static str {
        "uav/+/telemetry"
    }

    /// Wildcard subscription pattern matching every UAV's status topic.
    #[must_use]
    pub fn status_wildcard() -> &'static str {
        "uav/+/status"
    }
}

/// MQTT-style single-level wildcard match: `+` matches exactly one
/// `/`-delimited segment.
#[must_use]
pub fn matches_pattern(pattern: &str, topic: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let topic_segments: Vec<&str> = topic.split('/').collect();
    if pattern_segments.len() != topic_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(topic_segments.iter())
        .all(|(p, t)| *p == "+" || p == t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_topic_matches_itself() {
        assert!(matches_pattern(SATELLITE_ALERTS, SATELLITE_ALERTS));
    }

    #[test]
    fn wildcard_matches_any_single_segment() {
        let id = Uuid::new_v4();
        assert!(matches_pattern(Topic::telemetry_wildcard(), &Topic::telemetry(id)));
    }

    #[test]
    fn wildcard_does_not_match_different_segment_count() {
        assert!(!matches_pattern("uav/+/telemetry", "uav/abc/telemetry/extra"));
    }

    #[test]
    fn unrelated_topics_do_not_match() {
        assert!(!matches_pattern(SATELLITE_ALERTS, DETECTIONS));
    }
}
