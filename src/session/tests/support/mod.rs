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

//! Shared fixtures for the session crate's integration tests: a couple of
//! `PlayerSet`/`Player` builders, a `Transport` that records what it was
//! told instead of logging it, and a small auto-resolving fixture plugin
//! standing in for a multi-phase, Carcassonne-shaped tile-drafting game,
//! without any actual scoring rules.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gamecore::error::SessionError;
use gamecore::model::{
    Action, ConcurrentMode, Event, ExpectedAction, GameConfig, GameResult, GameResultReason, Phase,
    Player, PlayerId, PlayerSet, PlayerView, TransitionResult,
};
use gamecore::plugin::{DisconnectPolicy, GamePlugin, PluginMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

#[allow(dead_code)]
pub fn two_players_named(a: &str, b: &str) -> Vec<Player> {
    vec![
        Player { player_id: PlayerId(a.into()), display_name: a.into(), seat_index: 0, is_bot: false, bot_id: None },
        Player { player_id: PlayerId(b.into()), display_name: b.into(), seat_index: 1, is_bot: false, bot_id: None },
    ]
}

#[allow(dead_code)]
pub fn mcts_vs_random_players() -> PlayerSet {
    PlayerSet::new(vec![
        Player {
            player_id: PlayerId("mcts".into()),
            display_name: "MCTS".into(),
            seat_index: 0,
            is_bot: true,
            bot_id: Some("mcts".into()),
        },
        Player {
            player_id: PlayerId("random".into()),
            display_name: "Random".into(),
            seat_index: 1,
            is_bot: true,
            bot_id: Some("random".into()),
        },
    ])
    .unwrap()
}

#[allow(dead_code)]
pub fn unix_timestamp_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Every message a `Transport` implementation can be told to deliver,
/// captured instead of rendered anywhere.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum RecordedEvent {
    StateUpdate { viewer: Option<PlayerId> },
    Error { player_id: PlayerId, kind: String },
    GameOver { winners: Vec<PlayerId>, reason: GameResultReason },
    PlayerDisconnected { player_id: PlayerId, grace_period_s: u64 },
    PlayerReconnected { player_id: PlayerId },
    PlayerForfeited { player_id: PlayerId },
}

/// A `Transport` that remembers what it was told instead of delivering it
/// anywhere — what `LoggingTransport` would be if a test wanted to assert
/// on the broadcast stream instead of reading log output.
pub struct RecordingTransport {
    pub events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(Vec::new()) })
    }

    #[allow(dead_code)]
    pub async fn has(&self, predicate: impl Fn(&RecordedEvent) -> bool) -> bool {
        self.events.lock().await.iter().any(predicate)
    }
}

#[async_trait]
impl session::Transport for RecordingTransport {
    async fn send_state_update(&self, view: &PlayerView) {
        self.events.lock().await.push(RecordedEvent::StateUpdate { viewer: view.viewer_id.clone() });
    }

    async fn send_error(&self, player_id: &PlayerId, kind: &str, _message: &str) {
        self.events.lock().await.push(RecordedEvent::Error { player_id: player_id.clone(), kind: kind.into() });
    }

    async fn send_game_over(&self, result: &GameResult) {
        self.events
            .lock()
            .await
            .push(RecordedEvent::GameOver { winners: result.winners.clone(), reason: result.reason });
    }

    async fn send_player_disconnected(&self, player_id: &PlayerId, grace_period_s: u64) {
        self.events
            .lock()
            .await
            .push(RecordedEvent::PlayerDisconnected { player_id: player_id.clone(), grace_period_s });
    }

    async fn send_player_reconnected(&self, player_id: &PlayerId) {
        self.events.lock().await.push(RecordedEvent::PlayerReconnected { player_id: player_id.clone() });
    }

    async fn send_player_forfeited(&self, player_id: &PlayerId) {
        self.events.lock().await.push(RecordedEvent::PlayerForfeited { player_id: player_id.clone() });
    }
}

/// A test-only fixture plugin approximating a tile-drafting game's shape
/// (an auto-resolving "draw" phase that pops a tile off a shared bag,
/// followed by a real "play" decision) without implementing any actual
/// scoring rules. Exercises the same auto-resolve/determinization plumbing
/// a tile-bag game like Carcassonne would, at a fraction of the rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileBagState {
    pub tile_bag: Vec<u32>,
    pub drawn: HashMap<PlayerId, Vec<u32>>,
    pub current_seat: u32,
}

pub struct TileBagFixturePlugin;

fn draw_phase(player_id: PlayerId, seat_index: u32) -> Phase {
    Phase {
        name: "draw".into(),
        concurrent_mode: ConcurrentMode::Sequential,
        expected_actions: vec![ExpectedAction { player_id: Some(player_id), action_type: "draw".into() }],
        auto_resolve: true,
        // `gamecore::sim::apply_action_and_resolve` synthesizes auto_resolve
        // actions from `metadata.player_index`, not `expected_actions` — set
        // both so the correct seat draws regardless of which auto-resolve
        // driver runs the chain.
        metadata: serde_json::json!({ "player_index": seat_index }),
    }
}

fn play_phase(player_id: PlayerId) -> Phase {
    Phase {
        name: "play".into(),
        concurrent_mode: ConcurrentMode::Sequential,
        expected_actions: vec![ExpectedAction { player_id: Some(player_id), action_type: "play".into() }],
        auto_resolve: false,
        metadata: Value::Null,
    }
}

fn read_state(game_data: &Value) -> Result<TileBagState, SessionError> {
    serde_json::from_value(game_data.clone())
        .map_err(|err| SessionError::PluginError(format!("malformed tile bag state: {err}")))
}

impl GamePlugin for TileBagFixturePlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            game_id: "tile_bag_fixture".into(),
            display_name: "Tile Bag Fixture".into(),
            min_players: 2,
            max_players: 2,
            description: "Auto-resolving tile-draw fixture used to exercise determinization".into(),
            config_schema: serde_json::json!({}),
            disconnect_policy: DisconnectPolicy::ForfeitPlayer,
        }
    }

    fn create_initial_state(
        &self,
        players: &PlayerSet,
        _config: &GameConfig,
    ) -> Result<(Value, Phase, Vec<Event>), SessionError> {
        if players.len() != 2 {
            return Err(SessionError::InvalidPlayers("tile bag fixture requires exactly 2 players".into()));
        }
        let drawn = players.iter().map(|p| (p.player_id.clone(), Vec::new())).collect();
        let state = TileBagState { tile_bag: (0..12).collect(), drawn, current_seat: 0 };
        let first = players.by_seat(0).expect("seat 0 present").player_id.clone();
        Ok((serde_json::to_value(state).expect("always serializes"), draw_phase(first, 0), vec![]))
    }

    fn validate_config(&self, _options: &Value) -> Vec<String> {
        Vec::new()
    }

    fn get_valid_actions(&self, game_data: &Value, phase: &Phase, _player_id: &PlayerId) -> Vec<Value> {
        if phase.name != "play" {
            return Vec::new();
        }
        if read_state(game_data).is_err() {
            return Vec::new();
        }
        vec![serde_json::json!({ "keep": true }), serde_json::json!({ "keep": false })]
    }

    fn validate_action(&self, _game_data: &Value, phase: &Phase, action: &Action) -> Option<String> {
        if phase.name == "play" && action.payload.get("keep").and_then(Value::as_bool).is_none() {
            return Some("play action payload must have a boolean `keep`".into());
        }
        None
    }

    fn apply_action(
        &self,
        game_data: &Value,
        phase: &Phase,
        action: &Action,
        players: &PlayerSet,
    ) -> Result<TransitionResult, SessionError> {
        let mut state = read_state(game_data)?;

        if phase.name == "draw" {
            let tile = state.tile_bag.pop().ok_or_else(|| {
                SessionError::PluginError("draw phase entered with an empty tile bag".into())
            })?;
            let drawer = phase
                .expected_actions
                .first()
                .and_then(|ea| ea.player_id.clone())
                .unwrap_or_else(|| action.player_id.clone());
            state.drawn.entry(drawer.clone()).or_default().push(tile);
            return Ok(TransitionResult {
                game_data: serde_json::to_value(&state).expect("always serializes"),
                events: vec![Event::new("tile_drawn", Some(drawer.clone()), serde_json::json!({ "tile": tile }))],
                next_phase: play_phase(drawer),
                scores: HashMap::new(),
                game_over: None,
            });
        }

        // "play": the `keep` choice doesn't affect outcome, this fixture only
        // exists to exercise the auto-resolve chain and tile bag shrinking.
        let next_seat = (state.current_seat + 1) % players.len() as u32;
        state.current_seat = next_seat;

        if state.tile_bag.is_empty() {
            let scores: HashMap<PlayerId, f64> = state
                .drawn
                .iter()
                .map(|(id, tiles)| (id.clone(), tiles.len() as f64))
                .collect();
            let max_drawn = scores.values().cloned().fold(f64::MIN, f64::max);
            let winners = scores
                .iter()
                .filter(|(_, &score)| score == max_drawn)
                .map(|(id, _)| id.clone())
                .collect();
            return Ok(TransitionResult {
                game_data: serde_json::to_value(&state).expect("always serializes"),
                events: vec![],
                next_phase: play_phase(action.player_id.clone()),
                scores: scores.clone(),
                game_over: Some(GameResult { winners, final_scores: scores, reason: GameResultReason::Normal }),
            });
        }

        let next_player = players.by_seat(next_seat).expect("seat in range").player_id.clone();
        Ok(TransitionResult {
            game_data: serde_json::to_value(&state).expect("always serializes"),
            events: vec![],
            next_phase: draw_phase(next_player, next_seat),
            scores: HashMap::new(),
            game_over: None,
        })
    }

    fn get_player_view(
        &self,
        game_data: &Value,
        _phase: &Phase,
        _player_id: Option<&PlayerId>,
        _players: &PlayerSet,
    ) -> Value {
        game_data.clone()
    }

    fn on_player_forfeit(
        &self,
        _game_data: &Value,
        _phase: &Phase,
        _player_id: &PlayerId,
        _players: &PlayerSet,
    ) -> Option<TransitionResult> {
        None
    }

    fn resolve_concurrent_actions(
        &self,
        _game_data: &Value,
        _phase: &Phase,
        _actions: &HashMap<PlayerId, Action>,
        _players: &PlayerSet,
    ) -> Result<TransitionResult, SessionError> {
        Err(SessionError::UnsupportedConcurrentMode(ConcurrentMode::CommitReveal))
    }

    fn get_spectator_summary(&self, game_data: &Value, _phase: &Phase, _players: &PlayerSet) -> Value {
        game_data.clone()
    }
}

#[allow(dead_code)]
pub fn tile_bag_players() -> PlayerSet {
    PlayerSet::new(vec![
        Player { player_id: PlayerId("a".into()), display_name: "A".into(), seat_index: 0, is_bot: false, bot_id: None },
        Player { player_id: PlayerId("b".into()), display_name: "B".into(), seat_index: 1, is_bot: false, bot_id: None },
    ])
    .unwrap()
}
