// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Sensor driver ingestion.
//!
//! The driver prints one line per reading, `<code> <raw> [annotation]`, for
//! example `T 4726 (22.23 °C)`. Raw values are converted to engineering units
//! and stamped with the wall-clock arrival time in epoch milliseconds.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use airmon_timeline::{Metric, Reading};

use crate::service::ServiceHandle;

/// Convert a raw driver value to the unit served to clients.
///
/// CO₂ is already ppm, humidity comes in hundredths of a percent and
/// temperature in sixteenths of a kelvin.
pub fn to_engineering(metric: Metric, raw: f64) -> f64 {
    match metric {
        Metric::Co2 => raw,
        Metric::Humidity => raw / 100.0,
        Metric::Temperature => raw / 16.0 - 273.15,
    }
}

/// Parse one driver line. Diagnostics and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<Reading> {
    let mut words = line.split_whitespace();
    let metric = Metric::from_code(words.next()?)?;
    let raw: f64 = words.next()?.parse().ok()?;
    if !raw.is_finite() {
        return None;
    }
    Some(Reading::new(metric, to_engineering(metric, raw)))
}

/// Open the driver output: `-` is stdin, anything else a file path.
pub async fn open(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open driver output {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Feed every parsed line to the service until the input ends or the
/// service stops. Returns the number of readings handed over.
pub async fn run<R>(reader: R, service: ServiceHandle) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut accepted = 0u64;

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read driver output")?
    {
        let Some(reading) = parse_line(&line) else {
            tracing::debug!(line = %line.trim_end(), "Ignoring driver line");
            continue;
        };
        let time = chrono::Utc::now().timestamp_millis();
        if service.ingest(time, reading).await.is_err() {
            tracing::debug!("Service stopped, ending ingestion");
            return Ok(accepted);
        }
        accepted += 1;
    }

    tracing::info!(accepted, "Driver output ended, still serving retained samples");
    Ok(accepted)
}
