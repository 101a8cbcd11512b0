//! vSphere controller manager.
//!
//! Runs the machine and cluster controllers for the vSphere cluster
//! provisioning CRDs against one vCenter endpoint.

mod actuator;
mod client;
mod config;
mod controller;
mod error;
mod reconciler;
mod recorder;
mod watcher;

use clap::Parser;
use config::ControllerConfig;
use controller::ControllerManager;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = ControllerConfig::parse();
    info!("Starting vSphere controller manager");

    let manager = match ControllerManager::new(&settings).await {
        Ok(manager) => manager,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = manager.run().await {
        error!("{}", e);
        return Err(e.into());
    }

    info!("Controller manager stopped");
    Ok(())
}
