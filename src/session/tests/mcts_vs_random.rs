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

//! MCTS should comfortably outplay uniform-random move selection at
//! tic-tac-toe over a batch of games.

mod support;

use bots::BotStrategy;
use gamecore::model::{Action, GameConfig, GameResult, PlayerId};
use gamecore::plugin::GamePlugin;
use mcts::SearchParams;
use tictactoe::TicTacToePlugin;

fn play_one_game(seed: u64) -> GameResult {
    let plugin = TicTacToePlugin;
    let players = support::mcts_vs_random_players();
    let mcts_id = PlayerId("mcts".into());
    let params = SearchParams { num_simulations: 100, num_determinizations: 1, ..SearchParams::default() };
    let random_rng = bots::RandomStrategy::seeded(seed);

    let (mut game_data, mut phase, _) = plugin.create_initial_state(&players, &GameConfig::default()).unwrap();
    loop {
        let actor = phase.expected_actions[0].player_id.clone().expect("tictactoe always names an actor");
        let payload = if actor == mcts_id {
            mcts::mcts_search(&game_data, &phase, &actor, &plugin, &players, &params).unwrap()
        } else {
            random_rng.choose_action(&game_data, &phase, &actor, &plugin, &players).unwrap()
        };

        let action_type = phase.expected_actions[0].action_type.clone();
        let action = Action::new(action_type, actor, payload);
        let result = plugin.apply_action(&game_data, &phase, &action, &players).unwrap();
        game_data = result.game_data;
        phase = result.next_phase;
        if let Some(game_over) = result.game_over {
            return game_over;
        }
    }
}

#[test]
fn mcts_wins_or_draws_at_least_80_percent_of_50_games_against_random() {
    let mcts_id = PlayerId("mcts".into());
    let mut wins_or_draws = 0;

    for seed in 0..50u64 {
        let result = play_one_game(seed);
        let mcts_won_or_drew = result.winners.contains(&mcts_id) || result.winners.len() > 1;
        if mcts_won_or_drew {
            wins_or_draws += 1;
        }
    }

    assert!(
        wins_or_draws >= 40,
        "expected MCTS to win or draw at least 80% of 50 games, got {wins_or_draws}/50"
    );
}
