// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use airmon::config::{init_tracing, WatchArgs};
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = WatchArgs::parse();
    init_tracing(args.log_format);
    args.validate()?;
    airmon::watch::run(args).await
}
