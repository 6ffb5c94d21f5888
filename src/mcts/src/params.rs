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

//! Search knobs. A single `SearchParams` value fully determines a search's
//! behavior given `(game_data, phase, player_id)` — the "easy/medium/hard"
//! bot presets in `bots::registry` are just three `SearchParams` values.

/// Tuning parameters for one call to [`crate::search::mcts_search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub num_simulations: u32,
    pub time_limit_ms: Option<u64>,
    /// UCT exploration constant, default `sqrt(2)`.
    pub exploration_constant: f64,
    /// Number of independent determinized subtrees to run and aggregate.
    pub num_determinizations: u32,

    pub pw_c: f64,
    pub pw_alpha: f64,

    pub use_rave: bool,
    pub rave_k: f64,
    /// `0` means unlimited depth.
    pub max_amaf_depth: u32,
    pub rave_fpu: bool,
    pub tile_aware_amaf: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            num_simulations: 1_000,
            time_limit_ms: None,
            exploration_constant: std::f64::consts::SQRT_2,
            num_determinizations: 1,
            pw_c: 4.0,
            pw_alpha: 0.5,
            use_rave: false,
            rave_k: 300.0,
            max_amaf_depth: 0,
            rave_fpu: false,
            tile_aware_amaf: false,
        }
    }
}

impl SearchParams {
    pub fn easy() -> Self {
        Self { num_simulations: 50, num_determinizations: 1, use_rave: false, ..Self::default() }
    }

    pub fn medium() -> Self {
        Self {
            num_simulations: 400,
            num_determinizations: 2,
            use_rave: true,
            ..Self::default()
        }
    }

    pub fn hard() -> Self {
        Self {
            num_simulations: 2_000,
            num_determinizations: 4,
            use_rave: true,
            rave_fpu: true,
            tile_aware_amaf: true,
            ..Self::default()
        }
    }
}
