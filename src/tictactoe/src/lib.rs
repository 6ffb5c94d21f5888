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

//! Classic 3x3 tic-tac-toe, the fixture `GamePlugin` the session engine and
//! MCTS search are validated against. Kept deliberately simple so a failing
//! test points at the engine rather than at game-specific rules — the same
//! role a small toy game plays in sanity-checking a search algorithm in
//! isolation from a full card game.

use std::collections::HashMap;

use gamecore::error::SessionError;
use gamecore::model::{
    Action, ConcurrentMode, Event, ExpectedAction, GameConfig, GameResult, GameResultReason,
    Phase, PlayerId, PlayerSet, TransitionResult,
};
use gamecore::plugin::{DisconnectPolicy, GamePlugin, PluginMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const WIN_LINES: [[usize; 3]; 8] =
    [[0, 1, 2], [3, 4, 5], [6, 7, 8], [0, 3, 6], [1, 4, 7], [2, 5, 8], [0, 4, 8], [2, 4, 6]];

/// The plugin's internal typed state. Only serialized to `Value` at the
/// `GamePlugin` trait boundary — `scores` is duplicated here (rather than
/// relying solely on the engine's `GameState.scores`) because
/// `get_spectator_summary` is the only signal `mcts::eval::default_eval_fn`
/// can read during a rollout, and that call only sees `game_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Board {
    cells: [Option<u32>; 9],
    current_player: u32,
    scores: HashMap<PlayerId, f64>,
}

fn check_winner(cells: &[Option<u32>; 9]) -> Option<u32> {
    for [a, b, c] in WIN_LINES {
        if let Some(mark) = cells[a] {
            if cells[b] == Some(mark) && cells[c] == Some(mark) {
                return Some(mark);
            }
        }
    }
    None
}

fn is_draw(cells: &[Option<u32>; 9]) -> bool {
    cells.iter().all(Option::is_some)
}

fn read_board(game_data: &Value) -> Result<Board, SessionError> {
    serde_json::from_value(game_data.clone())
        .map_err(|err| SessionError::PluginError(format!("malformed tictactoe board: {err}")))
}

fn make_phase(player_id: PlayerId) -> Phase {
    Phase {
        name: "play".into(),
        concurrent_mode: ConcurrentMode::Sequential,
        expected_actions: vec![ExpectedAction { player_id: Some(player_id), action_type: "play".into() }],
        auto_resolve: false,
        metadata: Value::Null,
    }
}

pub struct TicTacToePlugin;

impl GamePlugin for TicTacToePlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            game_id: "tictactoe".into(),
            display_name: "Tic-Tac-Toe".into(),
            min_players: 2,
            max_players: 2,
            description: "Classic 3x3 tic-tac-toe".into(),
            config_schema: serde_json::json!({}),
            disconnect_policy: DisconnectPolicy::AbandonAll,
        }
    }

    fn create_initial_state(
        &self,
        players: &PlayerSet,
        _config: &GameConfig,
    ) -> Result<(Value, Phase, Vec<Event>), SessionError> {
        if players.len() != 2 {
            return Err(SessionError::InvalidPlayers(format!(
                "tictactoe requires exactly 2 players, got {}",
                players.len()
            )));
        }
        let scores = players.iter().map(|p| (p.player_id.clone(), 0.0)).collect();
        let board = Board { cells: [None; 9], current_player: 0, scores };
        let first = players.by_seat(0).expect("seat 0 present").player_id.clone();
        Ok((serde_json::to_value(board).expect("board always serializes"), make_phase(first), vec![]))
    }

    fn validate_config(&self, _options: &Value) -> Vec<String> {
        Vec::new()
    }

    fn get_valid_actions(&self, game_data: &Value, _phase: &Phase, _player_id: &PlayerId) -> Vec<Value> {
        let Ok(board) = read_board(game_data) else { return Vec::new() };
        board
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| serde_json::json!({ "cell": index }))
            .collect()
    }

    fn validate_action(&self, game_data: &Value, _phase: &Phase, action: &Action) -> Option<String> {
        let Some(cell) = action.payload.get("cell").and_then(Value::as_u64) else {
            return Some("action payload must have an integer `cell`".into());
        };
        if cell >= 9 {
            return Some(format!("cell {cell} is out of range"));
        }
        let board = match read_board(game_data) {
            Ok(board) => board,
            Err(err) => return Some(err.to_string()),
        };
        if board.cells[cell as usize].is_some() {
            return Some(format!("cell {cell} is already occupied"));
        }
        None
    }

    fn apply_action(
        &self,
        game_data: &Value,
        _phase: &Phase,
        action: &Action,
        players: &PlayerSet,
    ) -> Result<TransitionResult, SessionError> {
        let mut board = read_board(game_data)?;
        let cell = action
            .payload
            .get("cell")
            .and_then(Value::as_u64)
            .ok_or_else(|| SessionError::InvalidAction("action payload must have an integer `cell`".into()))?
            as usize;
        if cell >= 9 || board.cells[cell].is_some() {
            return Err(SessionError::InvalidAction(format!("cell {cell} is not playable")));
        }

        let current = board.current_player;
        board.cells[cell] = Some(current);

        if let Some(winner_seat) = check_winner(&board.cells) {
            let winner = players
                .by_seat(winner_seat)
                .ok_or_else(|| SessionError::PluginError(format!("no player at seat {winner_seat}")))?;
            let loser_seat = 1 - winner_seat;
            let loser = players
                .by_seat(loser_seat)
                .ok_or_else(|| SessionError::PluginError(format!("no player at seat {loser_seat}")))?;

            board.scores.insert(winner.player_id.clone(), 1.0);
            board.scores.insert(loser.player_id.clone(), 0.0);
            let scores = board.scores.clone();
            let winner_id = winner.player_id.clone();

            return Ok(TransitionResult {
                game_data: serde_json::to_value(&board).expect("board always serializes"),
                events: vec![],
                next_phase: make_phase(winner_id.clone()),
                scores: scores.clone(),
                game_over: Some(GameResult {
                    winners: vec![winner_id],
                    final_scores: scores,
                    reason: GameResultReason::Normal,
                }),
            });
        }

        if is_draw(&board.cells) {
            for player in players.iter() {
                board.scores.insert(player.player_id.clone(), 0.5);
            }
            let scores = board.scores.clone();
            let first = players.by_seat(0).expect("seat 0 present").player_id.clone();

            return Ok(TransitionResult {
                game_data: serde_json::to_value(&board).expect("board always serializes"),
                events: vec![],
                next_phase: make_phase(first),
                scores: scores.clone(),
                game_over: Some(GameResult {
                    winners: players.iter().map(|p| p.player_id.clone()).collect(),
                    final_scores: scores,
                    reason: GameResultReason::Draw,
                }),
            });
        }

        let next_seat = 1 - current;
        board.current_player = next_seat;
        let next_player = players
            .by_seat(next_seat)
            .ok_or_else(|| SessionError::PluginError(format!("no player at seat {next_seat}")))?;
        let next_player_id = next_player.player_id.clone();

        Ok(TransitionResult {
            game_data: serde_json::to_value(&board).expect("board always serializes"),
            events: vec![],
            next_phase: make_phase(next_player_id),
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

#[cfg(test)]
mod tests {
    use super::*;
    use gamecore::model::{GameConfig, Player};

    fn players() -> PlayerSet {
        PlayerSet::new(vec![
            Player { player_id: PlayerId("p0".into()), display_name: "P0".into(), seat_index: 0, is_bot: false, bot_id: None },
            Player { player_id: PlayerId("p1".into()), display_name: "P1".into(), seat_index: 1, is_bot: false, bot_id: None },
        ])
        .unwrap()
    }

    fn play(plugin: &TicTacToePlugin, game_data: &Value, phase: &Phase, players: &PlayerSet, cell: u64) -> TransitionResult {
        let actor = phase.expected_actions[0].player_id.clone().unwrap();
        let action = Action::new("play", actor, serde_json::json!({ "cell": cell }));
        plugin.apply_action(game_data, phase, &action, players).unwrap()
    }

    #[test]
    fn straight_line_win_ends_the_game() {
        let plugin = TicTacToePlugin;
        let players = players();
        let (mut data, mut phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();

        for cell in [0, 3, 1, 4, 2] {
            let result = play(&plugin, &data, &phase, &players, cell);
            data = result.game_data;
            phase = result.next_phase;
            if let Some(game_over) = result.game_over {
                assert_eq!(game_over.winners, vec![PlayerId("p0".into())]);
                assert_eq!(game_over.reason, GameResultReason::Normal);
                return;
            }
        }
        panic!("expected a winner after the fifth move");
    }

    #[test]
    fn full_board_with_no_line_is_a_draw() {
        let plugin = TicTacToePlugin;
        let players = players();
        let (mut data, mut phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();

        // X O X / X O O / O X X — fills the board with no three in a row.
        for cell in [0, 1, 2, 4, 3, 5, 7, 6, 8] {
            let result = play(&plugin, &data, &phase, &players, cell);
            data = result.game_data;
            phase = result.next_phase;
            if let Some(game_over) = result.game_over {
                assert_eq!(game_over.reason, GameResultReason::Draw);
                assert_eq!(game_over.winners.len(), 2);
                return;
            }
        }
        panic!("expected a draw after the board filled");
    }

    #[test]
    fn valid_actions_shrink_as_cells_fill() {
        let plugin = TicTacToePlugin;
        let players = players();
        let (data, phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();
        assert_eq!(plugin.get_valid_actions(&data, &phase, &PlayerId("p0".into())).len(), 9);

        let result = play(&plugin, &data, &phase, &players, 4);
        assert_eq!(plugin.get_valid_actions(&result.game_data, &result.next_phase, &PlayerId("p1".into())).len(), 8);
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let plugin = TicTacToePlugin;
        let players = players();
        let (data, phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();
        let result = play(&plugin, &data, &phase, &players, 4);

        let actor = result.next_phase.expected_actions[0].player_id.clone().unwrap();
        let action = Action::new("play", actor, serde_json::json!({ "cell": 4 }));
        let message = plugin.validate_action(&result.game_data, &result.next_phase, &action);
        assert!(message.is_some());
    }

    proptest::proptest! {
        /// Playing any single opening cell always removes exactly that cell
        /// from the next player's valid actions, nothing more or less.
        #[test]
        fn playing_a_cell_removes_only_that_cell(cell in 0u64..9) {
            let plugin = TicTacToePlugin;
            let players = players();
            let (data, phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();
            let result = play(&plugin, &data, &phase, &players, cell);
            let actor = result.next_phase.expected_actions[0].player_id.clone().unwrap();
            let valid = plugin.get_valid_actions(&result.game_data, &result.next_phase, &actor);
            proptest::prop_assert_eq!(valid.len(), 8);
            proptest::prop_assert!(!valid.iter().any(|a| a.get("cell").and_then(Value::as_u64) == Some(cell)));
        }

        /// Terminal scores always sum to 1, over a deterministic
        /// pseudo-random playout seeded by the test case.
        #[test]
        fn terminal_scores_always_sum_to_one(seed in proptest::prelude::any::<u64>()) {
            let plugin = TicTacToePlugin;
            let players = players();
            let (mut data, mut phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();
            let mut state = seed | 1;

            loop {
                let actor = phase.expected_actions[0].player_id.clone().unwrap();
                let valid = plugin.get_valid_actions(&data, &phase, &actor);
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let choice = valid[(state as usize) % valid.len()].clone();
                let action = Action::new("play", actor, choice);
                let result = plugin.apply_action(&data, &phase, &action, &players).unwrap();
                data = result.game_data;
                phase = result.next_phase;
                if let Some(game_over) = result.game_over {
                    let total: f64 = game_over.final_scores.values().sum();
                    proptest::prop_assert!((total - 1.0).abs() < 1e-9);
                    break;
                }
            }
        }
    }
}
