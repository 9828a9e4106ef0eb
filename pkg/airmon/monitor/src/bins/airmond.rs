// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use airmon::config::{init_tracing, DaemonArgs};
use airmon::daemon::{self, DaemonSettings};
use airmon::{ingest, shutdown};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    init_tracing(args.log_format);
    args.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let result = runtime.block_on(serve(&args));

    // A stdin read parked on an idle driver cannot be cancelled; don't wait on it.
    runtime.shutdown_timeout(args.shutdown_grace());

    result?;
    tracing::info!("airmond stopped");
    Ok(())
}

async fn serve(args: &DaemonArgs) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.listen_addr(),
        snapshot = %args.snapshot.display(),
        capacity = args.capacity,
        "Starting airmond"
    );

    let listener = tokio::net::TcpListener::bind(args.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_addr()))?;
    let input = ingest::open(&args.input).await?;

    let (shutdown_tx, _) = watch::channel(false);
    shutdown::spawn_signal_handler(shutdown_tx.clone())?;

    daemon::run(DaemonSettings::from(args), listener, input, shutdown_tx).await
}
