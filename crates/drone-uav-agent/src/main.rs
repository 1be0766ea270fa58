//! UAV agent CLI
//!
//! Runs one or more [`SimulatedAgent`]s against a message bus: each agent
//! listens for `commands/<uav_id>` and ticks forward on its own interval,
//! publishing telemetry, status, and synthetic detections exactly like a
//! dispatcher-driven fleet would see from a real vehicle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use drone_bus::{BusClient, InProcessBus, RedisBus, Topic};
use drone_domain::Coordinates;
use drone_uav_agent::{AgentCommand, AgentConfig, SimulatedAgent, UavAgent};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "drone-uav-agent")]
#[command(about = "Run simulated UAV agents against the dispatch bus")]
struct Args {
    /// Number of agents to launch
    #[arg(short, long, default_value = "4")]
    count: usize,

    /// Home latitude for the first agent; subsequent agents are offset
    #[arg(long, default_value = "37.7749")]
    latitude: f64,

    /// Home longitude for the first agent
    #[arg(long, default_value = "-122.4194")]
    longitude: f64,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Total number of ticks to run (0 = run forever)
    #[arg(long, default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("drone_uav_agent=info".parse()?))
        .init();

    let args = Args::parse();
    let bus: Arc<dyn BusClient> = if let Ok(url) = std::env::var("BUS_REDIS_URL") {
        Arc::new(RedisBus::connect(&url).await?)
    } else {
        Arc::new(InProcessBus::new())
    };
    bus.connect().await?;

    info!(count = args.count, "launching simulated UAV fleet");

    let mut handles = Vec::with_capacity(args.count);
    for i in 0..args.count {
        let uav_id = Uuid::new_v4();
        let home = Coordinates::new(args.latitude + f64::from(i as u32) * 0.01, args.longitude, 0.0);
        let config = AgentConfig {
            tick_interval: Duration::from_millis(args.tick_ms),
            ..AgentConfig::default()
        };
        let agent = Arc::new(SimulatedAgent::new(uav_id, home, bus.clone(), config));
        agent.connect().await?;
        info!(%uav_id, ?home, "agent online");

        handles.push(tokio::spawn(run_agent(agent, bus.clone(), uav_id, args.tick_ms, args.duration)));
    }

    for handle in handles {
        if let Err(err) = handle.await {
            warn!(%err, "agent task panicked");
        }
    }

    Ok(())
}

async fn run_agent(
    agent: Arc<SimulatedAgent>,
    bus: Arc<dyn BusClient>,
    uav_id: Uuid,
    tick_ms: u64,
    duration: u64,
) {
    let command_agent = agent.clone();
    tokio::spawn(async move {
        let Ok(mut sub) = bus.subscribe(&Topic::commands(uav_id)).await else {
            return;
        };
        while let Some(msg) = sub.recv().await {
            match AgentCommand::from_payload(&msg.payload) {
                Ok(command) => {
                    if let Err(err) = command_agent.on_command(command).await {
                        warn!(%uav_id, %err, "failed to apply command");
                    }
                }
                Err(err) => warn!(%uav_id, %err, "dropping malformed command"),
            }
        }
    });

    let mut tick: u64 = 0;
    loop {
        if duration > 0 && tick >= duration {
            break;
        }
        if let Err(err) = agent.tick().await {
            warn!(%uav_id, %err, "tick failed");
        }
        tick += 1;
        tokio::time::sleep(Duration::from_millis(tick_ms)).await;
    }
}
