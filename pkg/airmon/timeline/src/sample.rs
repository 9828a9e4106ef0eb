// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Sample payloads and the `{m, t, v}` wire record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ring::Entry;

/// Anything a [`Timeline`](crate::Timeline) can aggregate.
pub trait Observation {
    fn value(&self) -> f64;
}

impl Observation for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

/// Sensor channel reported by the driver.
///
/// Serialized as the single-letter driver code (`C`, `H`, `T`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "C")]
    Co2,
    #[serde(rename = "H")]
    Humidity,
    #[serde(rename = "T")]
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Co2];

    pub fn code(self) -> &'static str {
        match self {
            Metric::Co2 => "C",
            Metric::Humidity => "H",
            Metric::Temperature => "T",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" => Some(Metric::Co2),
            "H" => Some(Metric::Humidity),
            "T" => Some(Metric::Temperature),
            _ => None,
        }
    }

    /// Human readable channel name.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Co2 => "CO\u{2082} concentration",
            Metric::Humidity => "Humidity",
            Metric::Temperature => "Temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Co2 => " ppm",
            Metric::Humidity => "%",
            Metric::Temperature => "\u{b0}C",
        }
    }

    /// Fractional digits used when displaying a value.
    pub fn precision(self) -> usize {
        match self {
            Metric::Co2 => 0,
            Metric::Humidity | Metric::Temperature => 1,
        }
    }

    /// Format a value with this metric's precision and unit, e.g. `23.4°C`.
    pub fn format(self, value: f64) -> String {
        format!("{:.*}{}", self.precision(), value, self.unit())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A tagged value as held by the server-side timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub metric: Metric,
    pub value: f64,
}

impl Reading {
    pub fn new(metric: Metric, value: f64) -> Self {
        Self { metric, value }
    }
}

impl Observation for Reading {
    fn value(&self) -> f64 {
        self.value
    }
}

/// One sample on the wire and in snapshot files: `{"m": "T", "t": 1700000000000, "v": 21.5}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(rename = "m")]
    pub metric: Metric,
    /// Epoch milliseconds.
    #[serde(rename = "t")]
    pub time: i64,
    #[serde(rename = "v")]
    pub value: f64,
}

impl SampleRecord {
    pub fn reading(&self) -> Reading {
        Reading::new(self.metric, self.value)
    }
}

impl From<&Entry<Reading>> for SampleRecord {
    fn from(entry: &Entry<Reading>) -> Self {
        Self {
            metric: entry.item.metric,
            time: entry.time,
            value: entry.item.value,
        }
    }
}
