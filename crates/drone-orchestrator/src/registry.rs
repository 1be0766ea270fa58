//! C7: the in-memory UAV registry.
//!
//! Holds the authoritative live view of the fleet. Every mutation goes
//! through [`UavRegistry::update`], which serializes per-UAV writes behind a
//! lock and journals the result to persistent storage before returning
//! (§4.7: "all mutations are journalled to persistent storage").

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use drone_domain::Uav;
use drone_persistence::UavRepository;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};

pub struct UavRegistry {
    uavs: RwLock<HashMap<Uuid, StdMutex<Uav>>>,
    repo: Arc<dyn UavRepository>,
}

impl UavRegistry {
    #[must_use]
    pub fn new(repo: Arc<dyn UavRepository>) -> Self {
        Self {
            uavs: RwLock::new(HashMap::new()),
            repo,
        }
    }

    /// Populate the registry from persisted state at startup.
    pub async fn load_from_repo(&self) -> Result<()> {
        let all = self.repo.get_all().await?;
        let mut map = self.uavs.write().await;
        for uav in all {
            map.insert(uav.uav_id, StdMutex::new(uav));
        }
        Ok(())
    }

    pub async fn get(&self, uav_id: Uuid) -> Option<Uav> {
        let map = self.uavs.read().await;
        map.get(&uav_id).map(|m| m.lock().unwrap().clone())
    }

    pub async fn snapshot(&self) -> Vec<Uav> {
        let map = self.uavs.read().await;
        map.values().map(|m| m.lock().unwrap().clone()).collect()
    }

    /// Register a brand new UAV, persisting it immediately.
    pub async fn register(&self, uav: Uav) -> Result<()> {
        self.repo.create(&uav).await?;
        let mut map = self.uavs.write().await;
        map.insert(uav.uav_id, StdMutex::new(uav));
        Ok(())
    }

    /// Apply `mutator` to the UAV identified by `uav_id`, validate the
    /// resulting invariant, persist, and return the new snapshot.
    ///
    /// Returns `Ok(None)` if no such UAV is registered. Returns
    /// [`OrchestratorError::StateInvariant`] if the mutation would leave the
    /// UAV in an inconsistent state (a mission id without a mission-capable
    /// status) -- the mutation is rolled back in that case.
    pub async fn update<F>(&self, uav_id: Uuid, mutator: F) -> Result<Option<Uav>>
    where
        F: FnOnce(&mut Uav),
    {
        let (before, after) = {
            let map = self.uavs.read().await;
            let Some(entry) = map.get(&uav_id) else {
                return Ok(None);
            };
            let mut guard = entry.lock().unwrap();
            let before = guard.clone();
            mutator(&mut guard);
            if !guard.invariant_holds() {
                *guard = before.clone();
                return Err(OrchestratorError::StateInvariant(format!(
                    "uav {uav_id} would violate its mission/status invariant"
                )));
            }
            (before, guard.clone())
        };

        if before == after {
            return Ok(Some(after));
        }

        self.repo
            .update_state(uav_id, after.position, after.battery_pct, after.status)
            .await?;
        if before.current_mission_id != after.current_mission_id {
            self.repo
                .set_current_mission(uav_id, after.current_mission_id)
                .await?;
        }
        Ok(Some(after))
    }

    /// Snapshot every UAV satisfying `predicate` (e.g. available + charged).
    pub async fn candidates<F>(&self, predicate: F) -> Vec<Uav>
    where
        F: Fn(&Uav) -> bool,
    {
        self.snapshot().await.into_iter().filter(predicate).collect()
    }

    pub async fn deregister(&self, uav_id: Uuid) -> Result<()> {
        self.repo.delete(uav_id).await?;
        let mut map = self.uavs.write().await;
        map.remove(&uav_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use drone_domain::{Coordinates, UavStatus};
    use drone_persistence::Result as RepoResult;
    use std::sync::Mutex as StdSyncMutex;

    #[derive(Default)]
    struct InMemoryUavRepository {
        updates: StdSyncMutex<Vec<(Uuid, UavStatus)>>,
    }

    #[async_trait]
    impl UavRepository for InMemoryUavRepository {
        async fn get_by_id(&self, _uav_id: Uuid) -> RepoResult<Option<Uav>> {
            Ok(None)
        }

        async fn get_all(&self) -> RepoResult<Vec<Uav>> {
            Ok(Vec::new())
        }

        async fn get_by_status(&self, _status: UavStatus) -> RepoResult<Vec<Uav>> {
            Ok(Vec::new())
        }

        async fn create(&self, _uav: &Uav) -> RepoResult<()> {
            Ok(())
        }

        async fn update_state(
            &self,
            uav_id: Uuid,
            _position: Coordinates,
            _battery_pct: f32,
            status: UavStatus,
        ) -> RepoResult<()> {
            self.updates.lock().unwrap().push((uav_id, status));
            Ok(())
        }

        async fn set_current_mission(&self, _uav_id: Uuid, _mission_id: Option<Uuid>) -> RepoResult<()> {
            Ok(())
        }

        async fn delete(&self, _uav_id: Uuid) -> RepoResult<()> {
            Ok(())
        }
    }

    fn uav(status: UavStatus) -> Uav {
        Uav {
            uav_id: Uuid::new_v4(),
            name: "U1".to_string(),
            position: Coordinates::default(),
            battery_pct: 90.0,
            status,
            current_mission_id: None,
            last_seen: Utc::now(),
        }
    }

    #[tokio::test]
    async fn update_rolls_back_on_invariant_violation() {
        let repo = Arc::new(InMemoryUavRepository::default());
        let registry = UavRegistry::new(repo.clone());
        let u = uav(UavStatus::Available);
        let uav_id = u.uav_id;
        registry.register(u).await.unwrap();

        let err = registry
            .update(uav_id, |u| {
                u.current_mission_id = Some(Uuid::new_v4());
                u.status = UavStatus::Available;
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::StateInvariant(_)));

        let after = registry.get(uav_id).await.unwrap();
        assert_eq!(after.status, UavStatus::Available);
        assert!(after.current_mission_id.is_none());
        assert!(repo.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_persists_and_returns_new_state_on_success() {
        let repo = Arc::new(InMemoryUavRepository::default());
        let registry = UavRegistry::new(repo.clone());
        let u = uav(UavStatus::Available);
        let uav_id = u.uav_id;
        registry.register(u).await.unwrap();

        let mission_id = Uuid::new_v4();
        let after = registry
            .update(uav_id, |u| {
                u.status = UavStatus::Assigned;
                u.current_mission_id = Some(mission_id);
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, UavStatus::Assigned);
        assert_eq!(after.current_mission_id, Some(mission_id));
        assert_eq!(repo.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_on_unknown_uav_returns_none() {
        let repo = Arc::new(InMemoryUavRepository::default());
        let registry = UavRegistry::new(repo);
        let result = registry.update(Uuid::new_v4(), |_| {}).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn candidates_filters_by_predicate() {
        let repo = Arc::new(InMemoryUavRepository::default());
        let registry = UavRegistry::new(repo);
        registry.register(uav(UavStatus::Available)).await.unwrap();
        registry.register(uav(UavStatus::Charging)).await.unwrap();

        let available = registry.candidates(|u| u.status == UavStatus::Available).await;
        assert_eq!(available.len(), 1);
    }
}
