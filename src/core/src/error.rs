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

//! The engine's error taxonomy, realized as a single `thiserror` enum:
//! rejected actions, turn-order/lifecycle mismatches, persistence failures,
//! and three hard-error cases implementations must treat as bugs rather
//! than recoverable conditions (invalid player sets, unsupported concurrent
//! modes, unknown bot ids).

use crate::model::{GameStatus, PlayerId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The plugin rejected the action, or the envelope shape was wrong.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The envelope targets a player other than the one expected to act.
    #[error("not {actual:?}'s turn (expected {expected:?})")]
    NotYourTurn { expected: Option<PlayerId>, actual: PlayerId },

    /// The match is not accepting actions.
    #[error("game is not active: {0:?}")]
    GameNotActive(GameStatus),

    /// The submitter has already been forfeited.
    #[error("player {0:?} has been forfeited")]
    PlayerForfeited(PlayerId),

    /// The plugin raised unexpectedly. The match stays active so an operator
    /// can intervene.
    #[error("plugin error: {0}")]
    PluginError(String),

    /// A state or event store write failed.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// A player list violates the seat-index/uniqueness invariants the
    /// engine and MCTS search both rely on.
    #[error("invalid players: {0}")]
    InvalidPlayers(String),

    /// `phase.concurrent_mode` names a mode with no implementation yet.
    #[error("unsupported concurrent mode: {0:?}")]
    UnsupportedConcurrentMode(crate::model::ConcurrentMode),

    /// `bot_id` has no registered strategy factory.
    #[error("unknown bot id: {0}")]
    UnknownBot(String),

    /// No plugin registered for a `game_id`, or no live session for a
    /// `match_id` the caller expected to exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl SessionError {
    /// `true` for outcomes that should reach the submitter as one `error`
    /// message with no broadcast and no state change, rather than being
    /// treated as operator-facing failures.
    pub fn is_rejected_action(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidAction(_)
                | SessionError::NotYourTurn { .. }
                | SessionError::GameNotActive(_)
                | SessionError::PlayerForfeited(_)
                | SessionError::PluginError(_)
                | SessionError::PersistenceError(_)
        )
    }
}
