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

//! Per-match orchestration: `GameSession` owns one
//! match's authoritative state behind an async mutex, `SessionManager` owns
//! the `MatchId -> GameSession` map and recovery, `BotRunner` schedules bot
//! moves, and `transport` is the narrow outbound contract a real
//! WebSocket/HTTP layer would implement.

pub mod bot_runner;
pub mod game_session;
pub mod manager;
pub mod transport;

pub use bot_runner::BotRunner;
pub use game_session::GameSession;
pub use manager::{PluginRegistry, SessionManager};
pub use transport::{LoggingTransport, Transport};
