//! HCI bridge between a host on stdin/stdout and a BLE controller socket.
//!
//! ```text
//! hci-bridge 127.0.0.1:9000
//! HCI_BRIDGE_CONTROLLER=/run/hci0.sock hci-bridge
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); stdout carries only
//! controller bytes. The process exits with a failure status as soon as
//! either direction reaches a terminal fault.

use std::process::ExitCode;

use hci_bridge::transport::H4Transport;
use hci_bridge::{
    BridgeConfig, BridgeError, ControllerLink, ControllerToHost, HostToController, Result,
    UnidirectionalProxy,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "bridge stopped");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let config = BridgeConfig::from_env()?;

    tracing::info!(controller = %config.controller, "connecting to controller");
    let (controller_rx, controller_tx) = config.controller.connect().await?;

    let link = ControllerLink::new();

    let host_to_controller = UnidirectionalProxy::new(
        HostToController::new(H4Transport::new(controller_tx)).with_host_rx(std::io::stdin()),
    )
    .with_fault_hook(|e| {
        if e.is_stream_fault() {
            tracing::warn!("host stream out of sync, host must reset the link");
        }
    })
    .start()?;

    let controller_to_host =
        UnidirectionalProxy::new(ControllerToHost::new(tokio::io::stdout(), link.clone())).start()?;

    let pump = link.spawn_reader(controller_rx);

    tracing::info!("bridge running");

    tokio::select! {
        result = host_to_controller.wait() => result,
        result = controller_to_host.wait() => result,
        result = pump => {
            result??;
            Err(BridgeError::TransportClosed)
        }
    }
}
