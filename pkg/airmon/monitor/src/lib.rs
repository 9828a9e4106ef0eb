// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! airmon: serve air-quality sensor readings over HTTP long-poll.
//!
//! `airmond` reads the sensor driver's output, keeps the last hour of
//! readings in a [`airmon_timeline::Timeline`], and answers `GET /get?since=`
//! as soon as anything newer than `since` exists. `airmon-watch` is a
//! terminal client for it.

pub mod config;
pub mod daemon;
pub mod ingest;
pub mod server;
pub mod service;
pub mod shutdown;
pub mod watch;

pub use service::{Service, ServiceError, ServiceHandle, Stats};
