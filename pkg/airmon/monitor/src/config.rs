// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// 3 samples every 2 seconds for an hour.
pub const DEFAULT_CAPACITY: usize = 5400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Air-quality sensor daemon
#[derive(Parser, Debug, Clone)]
#[command(name = "airmond")]
#[command(about = "Serve air-quality sensor readings to dashboards over HTTP long-poll")]
#[command(version)]
pub struct DaemonArgs {
    /// Port for the HTTP server
    #[arg(short, long, env = "AIRMON_PORT", default_value = "8553")]
    pub port: u16,

    /// Address to bind the HTTP server to
    #[arg(long, env = "AIRMON_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Snapshot file written on shutdown and replayed on startup
    #[arg(long, env = "AIRMON_SNAPSHOT", default_value = "saved_data.json")]
    pub snapshot: PathBuf,

    /// Number of samples retained in memory
    #[arg(long, env = "AIRMON_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Seconds a long-poll request is held before it is told to retry
    #[arg(long, default_value = "60")]
    pub poll_timeout_secs: u64,

    /// Seconds to wait for open connections to drain on shutdown
    #[arg(long, default_value = "3")]
    pub shutdown_grace_secs: u64,

    /// Sensor driver output to read, `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub log_format: LogFormat,
}

impl DaemonArgs {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            bail!("--capacity must be greater than zero");
        }
        if self.poll_timeout_secs == 0 {
            bail!("--poll-timeout-secs must be greater than zero");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Terminal client that follows a running airmond
#[derive(Parser, Debug, Clone)]
#[command(name = "airmon-watch")]
#[command(about = "Follow live sensor readings from an airmond server")]
#[command(version)]
pub struct WatchArgs {
    /// Base URL of the airmond server
    #[arg(long, env = "AIRMON_URL", default_value = "http://127.0.0.1:8553")]
    pub url: String,

    /// Samples kept per metric
    #[arg(long, default_value = "1800")]
    pub capacity: usize,

    /// Also show the sample nearest to this fraction (0.0 to 1.0) of each metric's time span
    #[arg(long)]
    pub probe: Option<f64>,

    #[arg(long, value_enum, default_value_t)]
    pub log_format: LogFormat,
}

impl WatchArgs {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            bail!("--capacity must be greater than zero");
        }
        if let Some(probe) = self.probe
            && !(0.0..=1.0).contains(&probe)
        {
            bail!("--probe must be between 0.0 and 1.0, got {probe}");
        }
        Ok(())
    }
}

/// Install the global subscriber. RUST_LOG takes precedence, fallback to info.
/// Logs go to stderr so stdout stays free for command output.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_defaults() {
        let args = DaemonArgs::try_parse_from(["airmond"]).unwrap();
        assert_eq!(args.port, 8553);
        assert_eq!(args.capacity, DEFAULT_CAPACITY);
        assert_eq!(args.snapshot, PathBuf::from("saved_data.json"));
        assert_eq!(args.poll_timeout(), Duration::from_secs(60));
        assert_eq!(args.shutdown_grace(), Duration::from_secs(3));
        assert_eq!(args.input, PathBuf::from("-"));
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(args.listen_addr().to_string(), "0.0.0.0:8553");
        args.validate().unwrap();
    }

    #[test]
    fn test_daemon_overrides() {
        let args = DaemonArgs::try_parse_from([
            "airmond",
            "--port",
            "9000",
            "--bind",
            "127.0.0.1",
            "--snapshot",
            "/var/lib/airmon/data.json",
            "--capacity",
            "10",
            "--poll-timeout-secs",
            "5",
            "--input",
            "/tmp/driver.log",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.listen_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(args.capacity, 10);
        assert_eq!(args.poll_timeout(), Duration::from_secs(5));
        assert_eq!(args.input, PathBuf::from("/tmp/driver.log"));
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_daemon_rejects_zero_capacity() {
        let args = DaemonArgs::try_parse_from(["airmond", "--capacity", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_daemon_rejects_zero_poll_timeout() {
        let args = DaemonArgs::try_parse_from(["airmond", "--poll-timeout-secs", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_daemon_rejects_bad_bind() {
        assert!(DaemonArgs::try_parse_from(["airmond", "--bind", "not-an-ip"]).is_err());
    }

    #[test]
    fn test_watch_probe_range() {
        let ok = WatchArgs::try_parse_from(["airmon-watch", "--probe", "0.5"]).unwrap();
        ok.validate().unwrap();
        assert_eq!(ok.probe, Some(0.5));

        let bad = WatchArgs::try_parse_from(["airmon-watch", "--probe", "1.5"]).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_watch_defaults() {
        let args = WatchArgs::try_parse_from(["airmon-watch"]).unwrap();
        assert_eq!(args.url, "http://127.0.0.1:8553");
        assert_eq!(args.capacity, 1800);
        assert_eq!(args.probe, None);
    }
}
