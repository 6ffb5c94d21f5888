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

//! The game plugin contract — the capability set every game rule
//! implementation provides, and the only "wire" interface the core defines.
//! All operations are synchronous and pure with respect to their inputs; a
//! plugin must not mutate `game_data`/`phase` in place, it returns new
//! values.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::SessionError;
use crate::model::{Action, Event, GameConfig, Phase, PlayerId, PlayerSet, TransitionResult};

/// How a match handles a player who stays disconnected past the grace
/// period, when at least two players would remain active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectPolicy {
    /// End the match for everyone with no winners.
    AbandonAll,
    /// Mark the disconnected player forfeited and continue without them.
    ForfeitPlayer,
}

/// Static, per-game-type metadata. One instance describes the whole plugin,
/// not a single match.
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    pub game_id: String,
    pub display_name: String,
    pub min_players: u32,
    pub max_players: u32,
    pub description: String,
    pub config_schema: Value,
    pub disconnect_policy: DisconnectPolicy,
}

/// Every game the session engine and MCTS search can run implements this
/// trait.
pub trait GamePlugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    /// Deterministic given `(players, config.random_seed, config.options)`.
    fn create_initial_state(
        &self,
        players: &PlayerSet,
        config: &GameConfig,
    ) -> Result<(Value, Phase, Vec<Event>), SessionError>;

    /// Empty list means `options` is valid.
    fn validate_config(&self, options: &Value) -> Vec<String>;

    /// May return an empty list. Order must be stable for a given state.
    fn get_valid_actions(&self, game_data: &Value, phase: &Phase, player_id: &PlayerId) -> Vec<Value>;

    /// `None` means the action is accepted.
    fn validate_action(&self, game_data: &Value, phase: &Phase, action: &Action) -> Option<String>;

    fn apply_action(
        &self,
        game_data: &Value,
        phase: &Phase,
        action: &Action,
        players: &PlayerSet,
    ) -> Result<TransitionResult, SessionError>;

    /// Must hide information not visible to `player_id`. `None` is the
    /// spectator view.
    fn get_player_view(
        &self,
        game_data: &Value,
        phase: &Phase,
        player_id: Option<&PlayerId>,
        players: &PlayerSet,
    ) -> Value;

    /// A transition that advances past `player_id`'s turn, or `None` if the
    /// engine should fall back to its own generic skip (and log a warning).
    fn on_player_forfeit(
        &self,
        game_data: &Value,
        phase: &Phase,
        player_id: &PlayerId,
        players: &PlayerSet,
    ) -> Option<TransitionResult>;

    /// Only called when `phase.concurrent_mode != Sequential`.
    fn resolve_concurrent_actions(
        &self,
        game_data: &Value,
        phase: &Phase,
        actions: &HashMap<PlayerId, Action>,
        players: &PlayerSet,
    ) -> Result<TransitionResult, SessionError>;

    fn get_spectator_summary(&self, game_data: &Value, phase: &Phase, players: &PlayerSet) -> Value;
}
