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

use gamecore::error::SessionError;
use gamecore::model::{Phase, PlayerId, PlayerSet};
use gamecore::plugin::GamePlugin;
use mcts::SearchParams;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde_json::Value;
use std::sync::Mutex;

/// The narrow interface every bot implementation satisfies: given the
/// current state, choose one of `plugin.get_valid_actions`'s payloads.
pub trait BotStrategy: Send + Sync {
    fn choose_action(
        &self,
        game_data: &Value,
        phase: &Phase,
        player_id: &PlayerId,
        plugin: &dyn GamePlugin,
        players: &PlayerSet,
    ) -> Result<Value, SessionError>;
}

/// Uniform random choice over `get_valid_actions`. Seeded for reproducible
/// testing; unseeded instances draw from the OS RNG each call.
pub struct RandomStrategy {
    rng: Mutex<Xoshiro256StarStar>,
}

impl RandomStrategy {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(Xoshiro256StarStar::seed_from_u64(seed)) }
    }

    pub fn from_entropy() -> Self {
        let seed = StdRng::from_entropy().gen::<u64>();
        Self::seeded(seed)
    }
}

impl BotStrategy for RandomStrategy {
    fn choose_action(
        &self,
        game_data: &Value,
        phase: &Phase,
        player_id: &PlayerId,
        plugin: &dyn GamePlugin,
        _players: &PlayerSet,
    ) -> Result<Value, SessionError> {
        let actions = plugin.get_valid_actions(game_data, phase, player_id);
        if actions.is_empty() {
            return Err(SessionError::PluginError(format!(
                "no valid actions for {player_id:?} in phase {:?}",
                phase.name
            )));
        }
        let mut rng = self.rng.lock().expect("random strategy rng poisoned");
        let index = rng.gen_range(0..actions.len());
        Ok(actions[index].clone())
    }
}

/// Forwards to `mcts::mcts_search` with a fixed parameter profile. The
/// `easy | medium | hard` labels in deployment are just three `SearchParams`
/// values; the distinction is purely a difference in search budget, not in
/// code path.
pub struct MctsStrategy {
    params: SearchParams,
}

impl MctsStrategy {
    pub fn new(params: SearchParams) -> Self {
        Self { params }
    }
}

impl BotStrategy for MctsStrategy {
    fn choose_action(
        &self,
        game_data: &Value,
        phase: &Phase,
        player_id: &PlayerId,
        plugin: &dyn GamePlugin,
        players: &PlayerSet,
    ) -> Result<Value, SessionError> {
        mcts::mcts_search(game_data, phase, player_id, plugin, players, &self.params)
    }
}
