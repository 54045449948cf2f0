// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging setup.

use std::str::FromStr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogSettings;

/// Filter from the command line, then `RUST_LOG`, then the configured level,
/// then `info`.
pub fn env_filter(settings: &LogSettings, cli_level: Option<&str>) -> EnvFilter {
    if let Some(filter) = cli_level.and_then(|level| EnvFilter::from_str(level).ok()) {
        return filter;
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::from_str(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Logs go to stderr, which the service
/// manager captures.
pub fn init(settings: &LogSettings, cli_level: Option<&str>) -> anyhow::Result<()> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(settings.show_target)
        .with_ansi(settings.ansi);

    tracing_subscriber::registry()
        .with(env_filter(settings, cli_level))
        .with(console_layer)
        .try_init()?;

    tracing::debug!("Logging initialized");
    Ok(())
}
