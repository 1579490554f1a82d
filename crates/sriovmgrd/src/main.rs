//! sriovmgrd - SR-IOV network driver daemon
//!
//! Entry point for the sriovmgrd daemon.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sriov_common::SysfsNetdev;
use sriovmgrd::SriovMgr;

/// SR-IOV VF resource manager daemon
#[derive(Debug, Parser)]
#[command(name = "sriovmgrd", version, about)]
struct Args {
    /// Log filter (tracing env-filter syntax)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Unix socket path for the network driver plugin API
    #[arg(long, default_value = "/run/docker/plugins/sriov.sock")]
    socket: String,
}

/// Initializes tracing/logging subsystem
fn init_logging(filter: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting sriovmgrd ---");

    let netdev = Arc::new(SysfsNetdev::new());
    // one coarse lock serializes every manager operation
    let _mgr = Arc::new(Mutex::new(SriovMgr::new(netdev)));

    info!(socket = %args.socket, "sriovmgrd initialization complete (placeholder mode)");
    info!("Full implementation pending plugin socket listener integration");

    ExitCode::SUCCESS
}
