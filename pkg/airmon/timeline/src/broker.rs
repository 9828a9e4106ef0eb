// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Long-poll broker.
//!
//! Requests that found nothing newer than their watermark wait here until
//! one of three things happens:
//!
//! - `notify` after an append: each request gets its own range query result.
//! - `expire` once the shared deadline passes: each request gets `retry`.
//! - `shutdown`: each request gets the terminal `shutdown` status.
//!
//! The broker owns no clock and no timer. It records the deadline that the
//! first parked request arms, and the owning event loop sleeps until it and
//! calls `expire`. There is no per-request cancellation and no bound on the
//! number of parked requests.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::ring::Timeline;
use crate::sample::{Reading, SampleRecord};

/// How long a parked request waits before it is told to retry.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Answer to a poll: `{"data": [...]}`, `{"status": "retry"}` or `{"status": "shutdown"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollResponse {
    Data { data: Vec<SampleRecord> },
    Status { status: PollStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// Nothing arrived within the wait window; ask again with the same watermark.
    Retry,
    /// The server is going away; stop polling.
    Shutdown,
}

impl PollResponse {
    pub fn retry() -> Self {
        PollResponse::Status {
            status: PollStatus::Retry,
        }
    }

    pub fn shutdown() -> Self {
        PollResponse::Status {
            status: PollStatus::Shutdown,
        }
    }

    /// Data answer for `since`, or `None` when nothing is newer yet.
    pub fn query(timeline: &Timeline<Reading>, since: i64) -> Option<Self> {
        timeline.since(since).map(|samples| PollResponse::Data {
            data: samples.map(SampleRecord::from).collect(),
        })
    }

    pub fn status(&self) -> Option<PollStatus> {
        match self {
            PollResponse::Data { .. } => None,
            PollResponse::Status { status } => Some(*status),
        }
    }
}

/// Delivery side of a parked request.
pub trait Responder {
    fn respond(self, response: PollResponse);
}

struct Pending<R> {
    responder: R,
    since: i64,
}

pub struct Broker<R> {
    pending: Vec<Pending<R>>,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl<R: Responder> Broker<R> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Vec::new(),
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of parked requests.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// When the parked requests are due for `expire`, if any are parked.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Park a request. The first request parked after a drain arms the
    /// shared deadline; later ones share it.
    pub fn add(&mut self, responder: R, since: i64, now: Instant) {
        self.pending.push(Pending { responder, since });
        if self.deadline.is_none() {
            self.deadline = Some(now + self.timeout);
        }
    }

    /// Answer every parked request with the range query for its watermark.
    ///
    /// A request whose watermark is still not behind the newest sample gets an
    /// empty data answer; the broker delivers whatever the query yields.
    pub fn notify(&mut self, timeline: &Timeline<Reading>) {
        self.deadline = None;
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return;
        }
        tracing::debug!(count = pending.len(), "Notifying parked polls");
        for request in pending {
            let response = PollResponse::query(timeline, request.since).unwrap_or_else(|| {
                tracing::debug!(since = request.since, "Parked poll has no newer data at notify");
                PollResponse::Data { data: Vec::new() }
            });
            request.responder.respond(response);
        }
    }

    /// The deadline passed without new data: tell everyone to retry.
    pub fn expire(&mut self) {
        self.deadline = None;
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "Poll window expired");
        }
        for request in pending {
            request.responder.respond(PollResponse::retry());
        }
    }

    /// Tell everyone the server is shutting down.
    pub fn shutdown(&mut self) {
        self.deadline = None;
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "Releasing parked polls for shutdown");
        }
        for request in pending {
            request.responder.respond(PollResponse::shutdown());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Metric;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Inbox = Rc<RefCell<Vec<(&'static str, PollResponse)>>>;

    struct Recorder {
        name: &'static str,
        inbox: Inbox,
    }

    impl Responder for Recorder {
        fn respond(self, response: PollResponse) {
            self.inbox.borrow_mut().push((self.name, response));
        }
    }

    fn recorder(name: &'static str, inbox: &Inbox) -> Recorder {
        Recorder {
            name,
            inbox: inbox.clone(),
        }
    }

    fn times(response: &PollResponse) -> Vec<i64> {
        match response {
            PollResponse::Data { data } => data.iter().map(|r| r.time).collect(),
            PollResponse::Status { status } => panic!("expected data, got {status:?}"),
        }
    }

    #[test]
    fn test_first_add_arms_shared_deadline() {
        let mut broker = Broker::new(Duration::from_secs(60));
        let inbox = Inbox::default();
        let start = Instant::now();
        assert_eq!(broker.deadline(), None);

        broker.add(recorder("a", &inbox), 0, start);
        assert_eq!(broker.deadline(), Some(start + Duration::from_secs(60)));

        broker.add(recorder("b", &inbox), 0, start + Duration::from_secs(10));
        assert_eq!(broker.deadline(), Some(start + Duration::from_secs(60)));
        assert_eq!(broker.pending(), 2);
        assert!(inbox.borrow().is_empty());
    }

    #[test]
    fn test_notify_answers_each_watermark() {
        let mut timeline = Timeline::new(8).unwrap();
        timeline.push(100, Reading::new(Metric::Co2, 600.0)).unwrap();

        let mut broker = Broker::new(DEFAULT_POLL_TIMEOUT);
        let inbox = Inbox::default();
        broker.add(recorder("caught-up", &inbox), 100, Instant::now());
        broker.add(recorder("behind", &inbox), 0, Instant::now());

        timeline.push(150, Reading::new(Metric::Temperature, 21.5)).unwrap();
        broker.notify(&timeline);

        let inbox = inbox.borrow();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].0, "caught-up");
        assert_eq!(times(&inbox[0].1), vec![150]);
        assert_eq!(inbox[1].0, "behind");
        assert_eq!(times(&inbox[1].1), vec![100, 150]);
        assert_eq!(broker.pending(), 0);
        assert_eq!(broker.deadline(), None);
    }

    #[test]
    fn test_notify_delivers_empty_when_nothing_newer() {
        let mut timeline = Timeline::new(4).unwrap();
        timeline.push(100, Reading::new(Metric::Co2, 600.0)).unwrap();

        let mut broker = Broker::new(DEFAULT_POLL_TIMEOUT);
        let inbox = Inbox::default();
        broker.add(recorder("ahead", &inbox), 500, Instant::now());
        broker.notify(&timeline);

        assert_eq!(
            inbox.borrow()[0].1,
            PollResponse::Data { data: Vec::new() }
        );
    }

    #[test]
    fn test_expire_sends_retry_without_rearming() {
        let mut broker = Broker::new(DEFAULT_POLL_TIMEOUT);
        let inbox = Inbox::default();
        broker.add(recorder("a", &inbox), 100, Instant::now());
        broker.add(recorder("b", &inbox), 100, Instant::now());

        broker.expire();
        assert_eq!(broker.pending(), 0);
        assert_eq!(broker.deadline(), None);
        let inbox = inbox.borrow();
        assert_eq!(inbox.len(), 2);
        assert!(inbox.iter().all(|(_, r)| r.status() == Some(PollStatus::Retry)));
    }

    #[test]
    fn test_add_after_drain_rearms() {
        let mut broker = Broker::new(Duration::from_secs(5));
        let inbox = Inbox::default();
        let start = Instant::now();
        broker.add(recorder("a", &inbox), 0, start);
        broker.expire();

        let later = start + Duration::from_secs(30);
        broker.add(recorder("b", &inbox), 0, later);
        assert_eq!(broker.deadline(), Some(later + Duration::from_secs(5)));
    }

    #[test]
    fn test_shutdown_releases_everyone() {
        let mut broker = Broker::new(DEFAULT_POLL_TIMEOUT);
        let inbox = Inbox::default();
        broker.add(recorder("a", &inbox), 1, Instant::now());
        broker.add(recorder("b", &inbox), 2, Instant::now());
        broker.add(recorder("c", &inbox), 3, Instant::now());

        broker.shutdown();
        assert_eq!(broker.deadline(), None);
        let inbox = inbox.borrow();
        let names: Vec<&str> = inbox.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(inbox.iter().all(|(_, r)| r == &PollResponse::shutdown()));
    }

    #[test]
    fn test_operations_on_empty_broker() {
        let mut broker: Broker<Recorder> = Broker::new(DEFAULT_POLL_TIMEOUT);
        let timeline = Timeline::new(1).unwrap();
        broker.notify(&timeline);
        broker.expire();
        broker.shutdown();
        assert_eq!(broker.pending(), 0);
    }

    #[test]
    fn test_response_wire_format() {
        let data = PollResponse::Data {
            data: vec![SampleRecord {
                metric: Metric::Temperature,
                time: 7,
                value: 21.5,
            }],
        };
        assert_eq!(
            serde_json::to_string(&data).unwrap(),
            r#"{"data":[{"m":"T","t":7,"v":21.5}]}"#
        );
        assert_eq!(
            serde_json::to_string(&PollResponse::retry()).unwrap(),
            r#"{"status":"retry"}"#
        );
        assert_eq!(
            serde_json::to_string(&PollResponse::shutdown()).unwrap(),
            r#"{"status":"shutdown"}"#
        );

        let parsed: PollResponse = serde_json::from_str(r#"{"status":"retry"}"#).unwrap();
        assert_eq!(parsed, PollResponse::retry());
        let parsed: PollResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert_eq!(parsed, PollResponse::Data { data: vec![] });
    }
}
