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

//! The outbound half of the transport adapter, deliberately narrow since a
//! real HTTP/WebSocket transport is an external collaborator out of scope
//! here. This trait exists so the workspace compiles and is testable
//! end-to-end without a real network stack; [`LoggingTransport`] is the demo
//! implementation `server` wires up at startup.

use async_trait::async_trait;
use gamecore::model::{GameResult, PlayerId, PlayerView};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_state_update(&self, view: &PlayerView);
    async fn send_error(&self, player_id: &PlayerId, kind: &str, message: &str);
    async fn send_game_over(&self, result: &GameResult);
    async fn send_player_disconnected(&self, player_id: &PlayerId, grace_period_s: u64);
    async fn send_player_reconnected(&self, player_id: &PlayerId);
    async fn send_player_forfeited(&self, player_id: &PlayerId);
}

/// Logs every outbound message instead of delivering it anywhere; a stand-in
/// collaborator for tests and the demo binary.
pub struct LoggingTransport;

#[async_trait]
impl Transport for LoggingTransport {
    async fn send_state_update(&self, view: &PlayerView) {
        tracing::debug!(viewer = ?view.viewer_id, status = ?view.status, "state_update");
    }

    async fn send_error(&self, player_id: &PlayerId, kind: &str, message: &str) {
        tracing::debug!(?player_id, kind, message, "error");
    }

    async fn send_game_over(&self, result: &GameResult) {
        tracing::info!(winners = ?result.winners, reason = ?result.reason, "game_over");
    }

    async fn send_player_disconnected(&self, player_id: &PlayerId, grace_period_s: u64) {
        tracing::info!(?player_id, grace_period_s, "player_disconnected");
    }

    async fn send_player_reconnected(&self, player_id: &PlayerId) {
        tracing::info!(?player_id, "player_reconnected");
    }

    async fn send_player_forfeited(&self, player_id: &PlayerId) {
        tracing::info!(?player_id, "player_forfeited");
    }
}
