// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Terminal client for airmond.
//!
//! Keeps one timeline per metric, long-polls with the newest time seen as
//! the watermark and prints the latest value with its window extremes after
//! every batch.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

use airmon_timeline::{Metric, PollResponse, PollStatus, SampleRecord, Timeline, TimelineError};

use crate::config::WatchArgs;

/// Longer than the server's poll window so a parked request is never cut short.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Pause before retrying after a transport error.
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// HTTP client for the airmond long-poll endpoint.
#[derive(Clone)]
pub struct PollClient {
    base_url: String,
    client: reqwest::Client,
}

impl PollClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// One long-poll round trip.
    pub async fn poll(&self, since: i64) -> Result<PollResponse> {
        let url = format!("{}/get", self.base_url);
        self.client
            .get(&url)
            .query(&[("since", since)])
            .send()
            .await
            .context("Failed to poll server")?
            .error_for_status()
            .context("Server rejected poll")?
            .json()
            .await
            .context("Failed to parse poll response")
    }
}

/// Client-side view: one timeline per metric plus the poll watermark.
pub struct Dashboard {
    timelines: HashMap<Metric, Timeline<f64>>,
    watermark: i64,
}

impl Dashboard {
    pub fn new(capacity: usize) -> Result<Self, TimelineError> {
        let mut timelines = HashMap::new();
        for metric in Metric::ALL {
            timelines.insert(metric, Timeline::new(capacity)?);
        }
        Ok(Self {
            timelines,
            watermark: 0,
        })
    }

    /// Newest sample time seen; the `since` for the next poll.
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn timeline(&self, metric: Metric) -> Option<&Timeline<f64>> {
        self.timelines.get(&metric)
    }

    /// Fold a batch in. Returns how many records were kept.
    pub fn apply(&mut self, records: &[SampleRecord]) -> usize {
        let mut kept = 0;
        for record in records {
            self.watermark = self.watermark.max(record.time);
            let Some(timeline) = self.timelines.get_mut(&record.metric) else {
                continue;
            };
            match timeline.push(record.time, record.value) {
                Ok(()) => kept += 1,
                Err(e) => tracing::warn!(error = %e, metric = %record.metric, "Skipping record"),
            }
        }
        kept
    }

    /// One line per metric that has data, in display order.
    ///
    /// With `probe`, each line also shows the sample nearest to that fraction
    /// of the metric's retained time span.
    pub fn summary(&self, probe: Option<f64>) -> Vec<String> {
        let mut lines = Vec::new();
        for metric in Metric::ALL {
            let Some(timeline) = self.timelines.get(&metric) else {
                continue;
            };
            let (Some(latest), Some((min, max))) = (timeline.newest(), timeline.value_bounds())
            else {
                continue;
            };

            let mut line = format!(
                "{:<18} {:>10}  (min {}, max {})",
                metric.label(),
                metric.format(latest.item),
                metric.format(min),
                metric.format(max),
            );
            if let Some(fraction) = probe
                && let Some(entry) = timeline
                    .nearest_index(fraction)
                    .and_then(|index| timeline.slot(index))
            {
                line.push_str(&format!(
                    "  at {:.0}%: {} @ {}",
                    fraction * 100.0,
                    metric.format(entry.item),
                    clock_time(entry.time),
                ));
            }
            lines.push(line);
        }
        lines
    }
}

fn clock_time(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

/// Follow the server until it announces shutdown.
pub async fn run(args: WatchArgs) -> Result<()> {
    let client = PollClient::new(&args.url)?;
    let mut dashboard = Dashboard::new(args.capacity)?;
    tracing::info!(url = %args.url, "Watching");

    loop {
        let response = match client.poll(dashboard.watermark()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Poll failed, retrying");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };

        match response {
            PollResponse::Data { data } => {
                if dashboard.apply(&data) == 0 {
                    continue;
                }
                for line in dashboard.summary(args.probe) {
                    println!("{line}");
                }
                println!();
            }
            PollResponse::Status {
                status: PollStatus::Retry,
            } => {
                tracing::debug!(since = dashboard.watermark(), "Poll window expired");
            }
            PollResponse::Status {
                status: PollStatus::Shutdown,
            } => {
                tracing::info!("Server is shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(metric: Metric, time: i64, value: f64) -> SampleRecord {
        SampleRecord {
            metric,
            time,
            value,
        }
    }

    #[test]
    fn test_apply_splits_by_metric_and_advances_watermark() {
        let mut dashboard = Dashboard::new(8).unwrap();
        let kept = dashboard.apply(&[
            record(Metric::Temperature, 1_000, 21.0),
            record(Metric::Humidity, 1_000, 40.0),
            record(Metric::Co2, 1_001, 600.0),
            record(Metric::Temperature, 3_000, 22.0),
        ]);
        assert_eq!(kept, 4);
        assert_eq!(dashboard.watermark(), 3_000);

        let temperature = dashboard.timeline(Metric::Temperature).unwrap();
        assert_eq!(temperature.len(), 2);
        assert_eq!(temperature.value_bounds(), Some((21.0, 22.0)));
        assert_eq!(dashboard.timeline(Metric::Co2).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_skips_stale_record() {
        let mut dashboard = Dashboard::new(8).unwrap();
        dashboard.apply(&[record(Metric::Co2, 2_000, 600.0)]);
        let kept = dashboard.apply(&[record(Metric::Co2, 1_000, 900.0)]);
        assert_eq!(kept, 0);
        assert_eq!(dashboard.watermark(), 2_000);
        assert_eq!(
            dashboard.timeline(Metric::Co2).unwrap().value_bounds(),
            Some((600.0, 600.0))
        );
    }

    #[test]
    fn test_window_evicts_per_metric() {
        let mut dashboard = Dashboard::new(2).unwrap();
        dashboard.apply(&[
            record(Metric::Co2, 1, 900.0),
            record(Metric::Co2, 2, 600.0),
            record(Metric::Co2, 3, 610.0),
        ]);
        let co2 = dashboard.timeline(Metric::Co2).unwrap();
        assert_eq!(co2.value_bounds(), Some((600.0, 610.0)));
    }

    #[test]
    fn test_summary_lines() {
        let mut dashboard = Dashboard::new(8).unwrap();
        assert!(dashboard.summary(None).is_empty());

        dashboard.apply(&[
            record(Metric::Co2, 1_000, 612.0),
            record(Metric::Co2, 2_000, 640.4),
            record(Metric::Humidity, 2_000, 45.23),
        ]);
        let lines = dashboard.summary(None);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(Metric::Humidity.label()));
        assert!(lines[0].contains("45.2%"));
        assert!(lines[1].starts_with(Metric::Co2.label()));
        assert!(lines[1].contains("640 ppm"));
        assert!(lines[1].contains("(min 612 ppm, max 640 ppm)"));
    }

    #[test]
    fn test_summary_with_probe() {
        let mut dashboard = Dashboard::new(8).unwrap();
        dashboard.apply(&[
            record(Metric::Co2, 1_000, 600.0),
            record(Metric::Co2, 2_000, 700.0),
            record(Metric::Co2, 3_000, 800.0),
        ]);
        let lines = dashboard.summary(Some(0.5));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("at 50%: 700 ppm @ "));
    }

    #[test]
    fn test_zero_capacity() {
        assert!(Dashboard::new(0).is_err());
    }
}
