// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Flip `tx` to `true` on the first SIGINT or SIGTERM.
///
/// The handlers are registered before this returns so a signal delivered
/// right after startup is not lost.
pub fn spawn_signal_handler(tx: watch::Sender<bool>) -> Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
        let _ = tx.send(true);
    }))
}

/// Resolve once shutdown is requested. A dropped sender counts as a request.
pub async fn requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_requested_resolves_on_true() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(requested(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_requested_resolves_on_dropped_sender() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), requested(rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_requested_waits_while_false() {
        let (_tx, rx) = watch::channel(false);
        let result = tokio::time::timeout(Duration::from_millis(20), requested(rx)).await;
        assert!(result.is_err());
    }
}
