// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Daemon lifecycle: restore, serve, then on shutdown release parked polls,
//! persist the retained samples and stop the HTTP server.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::net::TcpListener;
use tokio::sync::watch;

use airmon_timeline::Snapshot;

use crate::config::DaemonArgs;
use crate::service::Service;
use crate::{ingest, server};

/// Settings the lifecycle needs once the listener and input are open.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub snapshot: PathBuf,
    pub capacity: usize,
    pub poll_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl From<&DaemonArgs> for DaemonSettings {
    fn from(args: &DaemonArgs) -> Self {
        Self {
            snapshot: args.snapshot.clone(),
            capacity: args.capacity,
            poll_timeout: args.poll_timeout(),
            shutdown_grace: args.shutdown_grace(),
        }
    }
}

/// Run until `shutdown_tx` flips to true or the timeline is found corrupted.
///
/// The snapshot is written only on a clean stop. The HTTP server gets
/// `shutdown_grace` to drain before it is abandoned.
pub async fn run<R>(
    settings: DaemonSettings,
    listener: TcpListener,
    input: R,
    shutdown_tx: watch::Sender<bool>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let snapshot = Snapshot::read_or_default(&settings.snapshot)
        .with_context(|| format!("Failed to read snapshot {}", settings.snapshot.display()))?;
    let timeline = snapshot
        .restore(settings.capacity)
        .context("Failed to restore snapshot")?;
    tracing::info!(
        path = %settings.snapshot.display(),
        records = snapshot.len(),
        retained = timeline.len(),
        "Loaded snapshot"
    );

    let (service, handle) = Service::new(timeline, settings.poll_timeout);
    let service_task = tokio::spawn(service.run(shutdown_tx.subscribe()));
    let ingest_task = tokio::spawn(ingest::run(input, handle.clone()));
    let mut server_task = tokio::spawn(server::run_server(
        listener,
        handle,
        shutdown_tx.subscribe(),
    ));

    let outcome = service_task.await.context("Service task panicked")?;

    // Corruption stops the service on its own; make sure the server follows.
    let _ = shutdown_tx.send(true);
    ingest_task.abort();

    let persisted = match outcome {
        Ok(timeline) => {
            let snapshot = Snapshot::capture(&timeline);
            snapshot
                .write(&settings.snapshot)
                .with_context(|| {
                    format!("Failed to write snapshot {}", settings.snapshot.display())
                })
                .map(|()| {
                    tracing::info!(
                        path = %settings.snapshot.display(),
                        records = snapshot.len(),
                        "Snapshot written"
                    );
                })
        }
        Err(e) => Err(e).context("Service stopped, snapshot not written"),
    };

    match tokio::time::timeout(settings.shutdown_grace, &mut server_task).await {
        Ok(joined) => joined.context("HTTP server task panicked")??,
        Err(_) => {
            tracing::warn!(
                grace_secs = settings.shutdown_grace.as_secs(),
                "HTTP server did not drain in time, forcing exit"
            );
            server_task.abort();
        }
    }

    persisted
}
