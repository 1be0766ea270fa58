//! Track lifecycle management: nearest-neighbour association with
//! Mahalanobis gating, eviction after consecutive missed predict cycles.

use crate::kalman::KalmanFilter;
use std::collections::HashMap;
use uuid::Uuid;

/// A single tracked target.
pub struct Track {
    pub track_id: Uuid,
    pub detection_class: String,
    filter: KalmanFilter,
    misses: u32,
}

impl Track {
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        self.filter.position()
    }

    #[must_use]
    pub fn velocity(&self) -> (f64, f64) {
        self.filter.velocity()
    }
}

/// Tunable parameters for track association and eviction.
#[derive(Debug, Clone, Copy)]
pub struct TrackManagerConfig {
    pub process_noise: f64,
    pub measurement_variance: f64,
    /// Mahalanobis distance threshold beyond which an observation cannot
    /// be associated with an existing track.
    pub gating_threshold: f64,
    /// Consecutive predict cycles without an update before a track is
    /// evicted.
    pub max_consecutive_misses: u32,
}

impl Default for TrackManagerConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.5,
            measurement_variance: 4.0,
            gating_threshold: 9.21, // chi-square 2 dof, 99% confidence
            max_consecutive_misses: 5,
        }
    }
}

/// Owns the live track set, performing nearest-neighbour association per
/// detection class and evicting stale tracks. Not thread-safe by itself;
/// the detection ingestor (C11) is expected to serialise calls per
/// tracking domain (e.g. one manager instance per mission or tile).
pub struct TrackManager {
    config: TrackManagerConfig,
    tracks: HashMap<Uuid, Track>,
}

impl TrackManager {
    #[must_use]
    pub fn new(config: TrackManagerConfig) -> Self {
        Self {
            config,
            tracks: HashMap::new(),
        }
    }

    #[must_use]
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    #[must_use]
    pub fn get(&self, track_id: Uuid) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Advance every live track's filter by `dt` and increment its miss
    /// counter; call once per tracking cycle before `observe`.
    pub fn predict_all(&mut self, dt: f64) {
        for track in self.tracks.values_mut() {
            track.filter.predict(dt);
            track.misses += 1;
        }
        self.tracks.retain(|_, t| t.misses <= self.config.max_consecutive_misses);
    }

    /// Associate an observation with the nearest gated track of the same
    /// class, or spawn a new track when none gates. Returns the track id
    /// that absorbed the observation.
    pub fn observe(&mut self, detection_class: &str, position: (f64, f64)) -> Uuid {
        let best = self
            .tracks
            .values_mut()
            .filter(|t| t.detection_class == detection_class)
            .map(|t| (t.filter.mahalanobis_distance(position), t))
            .filter(|(d, _)| *d <= self.config.gating_threshold)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((_, track)) = best {
            track.filter.update(position);
            track.misses = 0;
            track.track_id
        } else {
            let track_id = Uuid::new_v4();
            self.tracks.insert(
                track_id,
                Track {
                    track_id,
                    detection_class: detection_class.to_string(),
                    filter: KalmanFilter::initialise(
                        position,
                        self.config.process_noise,
                        self.config.measurement_variance,
                    ),
                    misses: 0,
                },
            );
            track_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_spawns_a_new_track() {
        let mut manager = TrackManager::new(TrackManagerConfig::default());
        let id = manager.observe("vehicle", (10.0, 10.0));
        assert!(manager.get(id).is_some());
        assert_eq!(manager.tracks().count(), 1);
    }

    #[test]
    fn nearby_observation_reuses_existing_track() {
        let mut manager = TrackManager::new(TrackManagerConfig::default());
        let id1 = manager.observe("vehicle", (10.0, 10.0));
        manager.predict_all(1.0);
        let id2 = manager.observe("vehicle", (10.2, 10.1));
        assert_eq!(id1, id2);
        assert_eq!(manager.tracks().count(), 1);
    }

    #[test]
    fn far_observation_spawns_a_distinct_track() {
        let mut manager = TrackManager::new(TrackManagerConfig::default());
        manager.observe("vehicle", (0.0, 0.0));
        manager.predict_all(1.0);
        manager.observe("vehicle", (500.0, 500.0));
        assert_eq!(manager.tracks().count(), 2);
    }

    #[test]
    fn track_evicted_after_consecutive_misses() {
        let mut config = TrackManagerConfig::default();
        config.max_consecutive_misses = 2;
        let mut manager = TrackManager::new(config);
        manager.observe("vehicle", (0.0, 0.0));
        manager.predict_all(1.0);
        manager.predict_all(1.0);
        manager.predict_all(1.0);
        assert_eq!(manager.tracks().count(), 0);
    }

    #[test]
    fn different_classes_never_associate() {
        let mut manager = TrackManager::new(TrackManagerConfig::default());
        manager.observe("vehicle", (0.0, 0.0));
        manager.predict_all(1.0);
        manager.observe("personnel", (0.0, 0.0));
        assert_eq!(manager.tracks().count(), 2);
    }
}
