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

//! The data model shared by every component: identifiers, players, phases,
//! actions, events, and the state a [`crate::plugin::GamePlugin`] mutates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Opaque player identifier. Treated as a value type everywhere; the engine
/// never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

/// Opaque match identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub String);

/// Opaque game identifier (which plugin a match is running).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(PlayerId);
string_id!(MatchId);
string_id!(GameId);

/// A single seat at the table. Immutable for the life of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub display_name: String,
    /// Dense `0..N-1` seat index; the canonical turn order.
    pub seat_index: u32,
    pub is_bot: bool,
    pub bot_id: Option<String>,
}

/// A validated, order-preserving set of players.
///
/// Construction enforces the two invariants every downstream component
/// (session engine, MCTS search) relies on instead of re-checking: seat
/// indices are dense `0..N-1`, and there are no duplicate [`PlayerId`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSet(Vec<Player>);

impl PlayerSet {
    pub fn new(mut players: Vec<Player>) -> Result<Self, SessionError> {
        if players.is_empty() {
            return Err(SessionError::InvalidPlayers("player list is empty".into()));
        }
        players.sort_by_key(|p| p.seat_index);

        let mut seen = std::collections::HashSet::new();
        for (expected_index, player) in players.iter().enumerate() {
            if player.seat_index != expected_index as u32 {
                return Err(SessionError::InvalidPlayers(format!(
                    "seat indices must be dense 0..N-1, found gap at {expected_index}"
                )));
            }
            if !seen.insert(&player.player_id) {
                return Err(SessionError::InvalidPlayers(format!(
                    "duplicate player id {:?}",
                    player.player_id
                )));
            }
        }

        Ok(Self(players))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.0.iter()
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.0.iter().any(|p| &p.player_id == player_id)
    }

    pub fn by_id(&self, player_id: &PlayerId) -> Option<&Player> {
        self.0.iter().find(|p| &p.player_id == player_id)
    }

    pub fn by_seat(&self, seat_index: u32) -> Option<&Player> {
        self.0.get(seat_index as usize)
    }

    pub fn as_slice(&self) -> &[Player] {
        &self.0
    }
}

/// Per-match configuration passed to a plugin at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub options: Value,
    pub random_seed: Option<i64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { options: Value::Object(Default::default()), random_seed: None }
    }
}

/// How a phase's actions are collected from players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentMode {
    Sequential,
    CommitReveal,
    TimeWindow,
}

/// One entry in a [`Phase`]'s expected-actions list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedAction {
    pub player_id: Option<PlayerId>,
    pub action_type: String,
}

/// Describes what must happen next. Plugins invent their own phase names; the
/// engine only interprets `auto_resolve`, `concurrent_mode`, and
/// `metadata.player_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub concurrent_mode: ConcurrentMode,
    pub expected_actions: Vec<ExpectedAction>,
    pub auto_resolve: bool,
    pub metadata: Value,
}

impl Phase {
    /// The `metadata.player_index` field, when present and in range.
    pub fn metadata_player_index(&self) -> Option<usize> {
        self.metadata.get("player_index")?.as_u64().map(|v| v as usize)
    }
}

/// An action a player (or the engine, for auto-resolve) submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,
    pub player_id: PlayerId,
    pub payload: Value,
}

impl Action {
    pub fn new(action_type: impl Into<String>, player_id: PlayerId, payload: Value) -> Self {
        Self { action_type: action_type.into(), player_id, payload }
    }
}

/// Something that happened, emitted by a plugin or by the engine itself for
/// lifecycle changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub player_id: Option<PlayerId>,
    pub payload: Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, player_id: Option<PlayerId>, payload: Value) -> Self {
        Self { event_type: event_type.into(), player_id, payload }
    }
}

/// An [`Event`] durably assigned a per-match, strictly increasing sequence
/// number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub match_id: MatchId,
    pub sequence_number: u64,
    pub event_type: String,
    pub player_id: Option<PlayerId>,
    pub payload: Value,
    /// Unix timestamp (seconds) of persistence.
    pub timestamp: f64,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResultReason {
    Normal,
    Draw,
    Forfeit,
    Timeout,
    Abandonment,
    AdminTerminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub winners: Vec<PlayerId>,
    pub final_scores: HashMap<PlayerId, f64>,
    pub reason: GameResultReason,
}

/// What a plugin returns from `apply_action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub game_data: Value,
    pub events: Vec<Event>,
    pub next_phase: Phase,
    /// Scores for players this transition changed. A player absent from this
    /// map keeps their previous score — see `DESIGN.md` ("missing score
    /// entries mean unchanged, not zero").
    pub scores: HashMap<PlayerId, f64>,
    pub game_over: Option<GameResult>,
}

/// Match lifecycle status. `Active` is the only status under which actions
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Paused,
    Finished,
    Abandoned,
}

/// The full authoritative state of one match, owned by the session engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub match_id: MatchId,
    pub game_id: GameId,
    pub players: PlayerSet,
    pub config: GameConfig,
    pub current_phase: Phase,
    pub status: GameStatus,
    pub turn_number: u64,
    pub action_number: u64,
    pub game_data: Value,
    pub scores: HashMap<PlayerId, f64>,
    /// When each disconnect's grace period started (unix seconds).
    pub disconnected_players: HashMap<PlayerId, f64>,
    /// Append-only, in order of forfeiture.
    pub forfeited_players: Vec<PlayerId>,
    /// Unix timestamp (seconds) the match was created. Used by
    /// `SessionManager::cleanup_stale` to find matches left active with no
    /// hot session for longer than the staleness window.
    pub created_at: f64,
}

impl GameState {
    /// `forfeited_players ∩ disconnected_players = ∅`, checked at every
    /// mutation site rather than just asserted in tests.
    pub fn check_invariants(&self) -> Result<(), SessionError> {
        for player_id in &self.forfeited_players {
            if self.disconnected_players.contains_key(player_id) {
                return Err(SessionError::PluginError(format!(
                    "player {player_id:?} is both forfeited and disconnected"
                )));
            }
        }
        Ok(())
    }

    pub fn active_player_ids(&self) -> Vec<PlayerId> {
        let forfeited: std::collections::HashSet<_> = self.forfeited_players.iter().collect();
        self.players
            .iter()
            .map(|p| p.player_id.clone())
            .filter(|id| !forfeited.contains(id))
            .collect()
    }
}

/// A per-player filtered view, the single authority a transport adapter uses
/// to render legal moves (`valid_actions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub match_id: MatchId,
    pub game_id: GameId,
    pub game_data: Value,
    pub valid_actions: Vec<Value>,
    pub current_phase: Phase,
    pub scores: HashMap<PlayerId, f64>,
    pub status: GameStatus,
    pub forfeited_players: Vec<PlayerId>,
    pub disconnected_players: Vec<PlayerId>,
    pub viewer_id: Option<PlayerId>,
    pub is_spectator: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(seat: u32) -> Player {
        Player {
            player_id: PlayerId(format!("p{seat}")),
            display_name: format!("Player {seat}"),
            seat_index: seat,
            is_bot: false,
            bot_id: None,
        }
    }

    #[test]
    fn player_set_accepts_dense_seats() {
        let set = PlayerSet::new(vec![player(1), player(0)]).unwrap();
        assert_eq!(set.by_seat(0).unwrap().seat_index, 0);
        assert_eq!(set.by_seat(1).unwrap().seat_index, 1);
    }

    #[test]
    fn player_set_rejects_gap() {
        let err = PlayerSet::new(vec![player(0), player(2)]).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPlayers(_)));
    }

    #[test]
    fn player_set_rejects_duplicate_ids() {
        let mut dup = player(1);
        dup.player_id = player(0).player_id;
        let err = PlayerSet::new(vec![player(0), dup]).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPlayers(_)));
    }

    #[test]
    fn invariant_catches_overlap() {
        let mut state = GameState {
            match_id: MatchId("m".into()),
            game_id: GameId("g".into()),
            players: PlayerSet::new(vec![player(0), player(1)]).unwrap(),
            config: GameConfig::default(),
            current_phase: Phase {
                name: "main".into(),
                concurrent_mode: ConcurrentMode::Sequential,
                expected_actions: vec![],
                auto_resolve: false,
                metadata: Value::Null,
            },
            status: GameStatus::Active,
            turn_number: 0,
            action_number: 0,
            game_data: Value::Null,
            scores: HashMap::new(),
            disconnected_players: HashMap::new(),
            forfeited_players: vec![],
            created_at: 0.0,
        };
        state.disconnected_players.insert(PlayerId("p0".into()), 0.0);
        state.forfeited_players.push(PlayerId("p0".into()));
        assert!(state.check_invariants().is_err());
    }

    fn bare_state(players: PlayerSet) -> GameState {
        GameState {
            match_id: MatchId("m".into()),
            game_id: GameId("g".into()),
            players,
            config: GameConfig::default(),
            current_phase: Phase {
                name: "main".into(),
                concurrent_mode: ConcurrentMode::Sequential,
                expected_actions: vec![],
                auto_resolve: false,
                metadata: Value::Null,
            },
            status: GameStatus::Active,
            turn_number: 0,
            action_number: 0,
            game_data: Value::Null,
            scores: HashMap::new(),
            disconnected_players: HashMap::new(),
            forfeited_players: vec![],
            created_at: 0.0,
        }
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        /// Any `PlayerSet` that passes construction has exactly one player
        /// per seat `0..N-1`.
        #[test]
        fn player_set_always_has_dense_unique_seats(n in 1usize..10) {
            let players: Vec<Player> = (0..n as u32).map(player).collect();
            let set = PlayerSet::new(players).unwrap();
            for seat in 0..n as u32 {
                let found = set.by_seat(seat);
                proptest::prop_assert!(found.is_some());
                proptest::prop_assert_eq!(found.unwrap().seat_index, seat);
            }
        }

        /// Forfeited and disconnected players are always disjoint, checked
        /// directly against `check_invariants` instead of asserted only at
        /// the call sites that happen to maintain it by hand.
        #[test]
        fn forfeit_and_disconnect_overlap_is_always_caught(
            forfeited in proptest::collection::hash_set(0u32..6, 0..6),
            disconnected in proptest::collection::hash_set(0u32..6, 0..6),
        ) {
            let players = PlayerSet::new((0..6).map(player).collect()).unwrap();
            let mut state = bare_state(players);
            for seat in &forfeited {
                state.forfeited_players.push(PlayerId(format!("p{seat}")));
            }
            for seat in &disconnected {
                state.disconnected_players.insert(PlayerId(format!("p{seat}")), 0.0);
            }

            let expect_ok = forfeited.is_disjoint(&disconnected);
            proptest::prop_assert_eq!(state.check_invariants().is_ok(), expect_ok);
        }

        /// `active_player_ids` and `forfeited_players` always partition the
        /// full player set: every active id is unforfeited, and together
        /// their counts add back up to the total seat count.
        #[test]
        fn active_and_forfeited_players_partition_the_player_set(
            forfeited_seats in proptest::collection::hash_set(0u32..6, 0..6),
        ) {
            let players = PlayerSet::new((0..6).map(player).collect()).unwrap();
            let mut state = bare_state(players);
            for seat in &forfeited_seats {
                state.forfeited_players.push(PlayerId(format!("p{seat}")));
            }

            let active = state.active_player_ids();
            proptest::prop_assert_eq!(active.len() + state.forfeited_players.len(), 6);
            for id in &active {
                proptest::prop_assert!(!state.forfeited_players.contains(id));
            }
        }
    }
}
