// Copyright © matchcore 2026-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Layered settings built from (lowest to highest precedence) built-in
//! defaults, an optional config file, then `SERVER_*` environment
//! overrides.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Seconds a disconnected player gets before `ForfeitPlayer` fires.
    pub grace_period_secs: u64,
    /// How long an active match can sit with no hot session before
    /// `SessionManager::recover`'s caller should treat it as abandoned.
    pub stale_after_secs: u64,
    /// Path to a SQLite database file; omitted means the in-memory stores.
    pub sqlite_path: Option<String>,
}

impl ServerConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Builds settings from (lowest to highest precedence) built-in
    /// defaults, an optional config file, and `SERVER_`-prefixed env vars.
    pub fn load(config_path: Option<&str>) -> color_eyre::Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("grace_period_secs", 30)?
            .set_default("stale_after_secs", 86_400)?
            .set_default("sqlite_path", None::<String>)?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("SERVER"));

        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}
