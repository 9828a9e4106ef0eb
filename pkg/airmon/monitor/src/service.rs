// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! The service loop.
//!
//! A single task owns the timeline and the long-poll broker. Ingestion, HTTP
//! handlers and stats requests talk to it through [`ServiceHandle`], so every
//! append, query, park, notify and expiry runs one at a time on the same
//! state. A notify triggered by an append runs in the same step as the append.

use airmon_timeline::{Broker, PollResponse, Reading, Responder, Timeline, TimelineError};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// Bound on queued commands before senders wait.
const COMMAND_BUFFER: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The timeline failed an internal consistency check.
    #[error("timeline corrupted: {0}")]
    Corrupted(#[source] TimelineError),

    #[error("service stopped")]
    Stopped,
}

/// Summary served on `/api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub retained: usize,
    pub capacity: usize,
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
    pub pending_polls: usize,
}

enum Command {
    Ingest {
        time: i64,
        reading: Reading,
    },
    Poll {
        since: i64,
        reply: oneshot::Sender<PollResponse>,
    },
    Stats {
        reply: oneshot::Sender<Stats>,
    },
}

/// A parked HTTP request, answered through its oneshot.
struct PendingPoll(oneshot::Sender<PollResponse>);

impl Responder for PendingPoll {
    fn respond(self, response: PollResponse) {
        if self.0.send(response).is_err() {
            tracing::debug!("Poll client went away before its answer");
        }
    }
}

#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
}

impl ServiceHandle {
    pub async fn ingest(&self, time: i64, reading: Reading) -> Result<(), ServiceError> {
        self.tx
            .send(Command::Ingest { time, reading })
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    /// Long-poll for samples newer than `since`.
    ///
    /// Resolves immediately when data is available, otherwise when new data
    /// arrives, the poll window expires or the service shuts down. A stopped
    /// service answers `shutdown`.
    pub async fn poll(&self, since: i64) -> PollResponse {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Poll { since, reply }).await.is_err() {
            return PollResponse::shutdown();
        }
        rx.await.unwrap_or_else(|_| PollResponse::shutdown())
    }

    pub async fn stats(&self) -> Result<Stats, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats { reply })
            .await
            .map_err(|_| ServiceError::Stopped)?;
        rx.await.map_err(|_| ServiceError::Stopped)
    }
}

pub struct Service {
    timeline: Timeline<Reading>,
    broker: Broker<PendingPoll>,
    rx: mpsc::Receiver<Command>,
}

impl Service {
    pub fn new(timeline: Timeline<Reading>, poll_timeout: Duration) -> (Self, ServiceHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let service = Self {
            timeline,
            broker: Broker::new(poll_timeout),
            rx,
        };
        (service, ServiceHandle { tx })
    }

    /// Run until shutdown is requested or every handle is dropped, then
    /// release parked polls and hand the timeline back for persisting.
    ///
    /// On corruption the parked polls are still released, but the timeline
    /// is not returned.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Timeline<Reading>, ServiceError> {
        tracing::info!(
            retained = self.timeline.len(),
            capacity = self.timeline.capacity(),
            poll_timeout_secs = self.broker.timeout().as_secs(),
            "Service started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                tracing::info!("Shutdown requested, releasing parked polls");
                break;
            }
            let deadline = self.broker.deadline();
            let sleep_until = deadline.map(Instant::from_std).unwrap_or_else(Instant::now);

            tokio::select! {
                command = self.rx.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("All service handles dropped");
                        break;
                    };
                    if let Err(e) = self.handle(command) {
                        tracing::error!(error = %e, "Stopping service");
                        self.broker.shutdown();
                        self.drain_after_stop();
                        return Err(e);
                    }
                }
                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    self.broker.expire();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::info!("Shutdown sender dropped, releasing parked polls");
                        break;
                    }
                }
            }
        }

        self.broker.shutdown();
        self.drain_after_stop();
        Ok(self.timeline)
    }

    fn handle(&mut self, command: Command) -> Result<(), ServiceError> {
        match command {
            Command::Ingest { time, reading } => self.ingest(time, reading)?,
            Command::Poll { since, reply } => self.poll(since, reply),
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
        Ok(())
    }

    fn ingest(&mut self, time: i64, reading: Reading) -> Result<(), ServiceError> {
        match self.timeline.push(time, reading) {
            Ok(()) => {
                self.broker.notify(&self.timeline);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(ServiceError::Corrupted(e)),
            Err(e) => {
                tracing::warn!(error = %e, metric = %reading.metric, "Dropping sample");
                Ok(())
            }
        }
    }

    fn poll(&mut self, since: i64, reply: oneshot::Sender<PollResponse>) {
        match PollResponse::query(&self.timeline, since) {
            Some(response) => {
                let _ = reply.send(response);
            }
            None => {
                self.broker
                    .add(PendingPoll(reply), since, Instant::now().into_std());
            }
        }
    }

    fn stats(&self) -> Stats {
        Stats {
            retained: self.timeline.len(),
            capacity: self.timeline.capacity(),
            oldest: self.timeline.min_time(),
            newest: self.timeline.max_time(),
            pending_polls: self.broker.pending(),
        }
    }

    /// Answer commands that were queued when the loop stopped. Polls get
    /// `shutdown`; queued readings are dropped.
    fn drain_after_stop(&mut self) {
        self.rx.close();
        let mut dropped = 0usize;
        while let Ok(command) = self.rx.try_recv() {
            match command {
                Command::Poll { reply, .. } => {
                    let _ = reply.send(PollResponse::shutdown());
                }
                Command::Ingest { .. } => dropped += 1,
                Command::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded readings queued after stop");
        }
    }
}
