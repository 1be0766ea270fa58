//! Real-vehicle agent: documents the flight-controller link contract
//! without implementing vehicle-specific I/O (§4.13's "real mode"
//! paragraph). No physical autopilot is an available collaborator in
//! this exercise; the trait boundary below is the deliverable, matching
//! spec.md §9's polymorphism redesign note.
//!
//! A production implementation plugs a MAVLink (or vendor-equivalent)
//! connection in behind [`FlightControllerLink`] and translates
//! [`AgentCommand`] into arm/takeoff/goto/land/RTL commands on that link,
//! forwarding attribute updates back out as telemetry.

use async_trait::async_trait;
use drone_bus::{BusClient, Topic};
use drone_domain::Coordinates;
use std::sync::Arc;
use uuid::Uuid;

use crate::agent::{AgentCommand, UavAgent};
use crate::error::{AgentError, Result};

/// The narrow contract a real flight-control link must satisfy. Vehicle
/// vendors differ in wire protocol (MAVLink, DJI SDK, proprietary); this
/// trait is the seam a concrete driver implements.
#[async_trait]
pub trait FlightControllerLink: Send + Sync {
    async fn arm(&self) -> Result<()>;
    async fn takeoff(&self, altitude_m: f64) -> Result<()>;
    async fn goto(&self, waypoints: &[drone_domain::Waypoint]) -> Result<()>;
    async fn land(&self) -> Result<()>;
    async fn return_to_launch(&self) -> Result<()>;
    async fn read_state(&self) -> Result<VehicleState>;
}

/// A snapshot read from the flight-control link.
#[derive(Debug, Clone, Copy)]
pub struct VehicleState {
    pub position: Coordinates,
    pub battery_pct: f32,
    pub speed_mps: f32,
    pub heading_deg: f32,
    pub armed: bool,
}

/// Real agent: forwards core commands to a [`FlightControllerLink`] and
/// republishes link state as telemetry. No link is wired up by default —
/// [`UavAgent`] methods return [`AgentError::NoLink`] until one is
/// supplied via [`RealAgent::with_link`].
pub struct RealAgent {
    uav_id: Uuid,
    bus: Arc<dyn BusClient>,
    link: Option<Arc<dyn FlightControllerLink>>,
}

impl RealAgent {
    #[must_use]
    pub fn new(uav_id: Uuid, bus: Arc<dyn BusClient>) -> Self {
        Self {
            uav_id,
            bus,
            link: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: Arc<dyn FlightControllerLink>) -> Self {
        self.link = Some(link);
        self
    }

    fn link(&self) -> Result<&Arc<dyn FlightControllerLink>> {
        self.link.as_ref().ok_or(AgentError::NoLink)
    }
}

#[async_trait]
impl UavAgent for RealAgent {
    async fn connect(&self) -> Result<()> {
        self.bus.connect().await?;
        Ok(())
    }

    async fn on_command(&self, command: AgentCommand) -> Result<()> {
        let link = self.link()?;
        match command {
            AgentCommand::Goto { waypoints, .. } => {
                link.arm().await?;
                if let Some(first) = waypoints.first() {
                    link.takeoff(first.position.altitude_m).await?;
                }
                link.goto(&waypoints).await?;
            }
            AgentCommand::Return => link.return_to_launch().await?,
            AgentCommand::Land | AgentCommand::Abort => link.land().await?,
        }
        Ok(())
    }

    async fn tick(&self) -> Result<()> {
        let link = self.link()?;
        let state = link.read_state().await?;
        let payload = serde_json::json!({
            "uav_id": self.uav_id,
            "latitude": state.position.latitude,
            "longitude": state.position.longitude,
            "altitude": state.position.altitude_m,
            "battery": state.battery_pct,
            "speed": state.speed_mps,
            "heading": state.heading_deg,
            "status": if state.armed { "IN_MISSION" } else { "AVAILABLE" },
            "timestamp": chrono::Utc::now(),
        });
        self.bus
            .publish(&Topic::telemetry(self.uav_id), payload)
            .await?;
        Ok(())
    }

    async fn position(&self) -> Coordinates {
        match &self.link {
            Some(link) => link
                .read_state()
                .await
                .map_or_else(|_| Coordinates::default(), |s| s.position),
            None => Coordinates::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drone_bus::InProcessBus;

    #[tokio::test]
    async fn tick_without_link_fails_soft() {
        let bus = Arc::new(InProcessBus::new());
        let agent = RealAgent::new(Uuid::new_v4(), bus);
        assert!(matches!(agent.tick().await, Err(AgentError::NoLink)));
    }
}
