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

//! The leaf evaluator. Rather than a `RandomPlayoutEvaluator` that plays
//! random moves to a terminal state and then scores it, this search is
//! driven by a heuristic evaluator applied directly to any state — terminal
//! or not — since plugin transitions are synchronous and cheap enough that
//! full rollouts aren't needed for every leaf.

use std::sync::Arc;

use gamecore::model::{GameResultReason, Phase, PlayerId, PlayerSet};
use gamecore::plugin::GamePlugin;
use serde_json::Value;

/// Returns a value in `[0, 1]` from `player_id`'s perspective: `1` is a
/// certain win, `0` a certain loss, `0.5` a dead heat.
pub type EvalFn =
    dyn Fn(&Value, &Phase, &PlayerId, &PlayerSet, &dyn GamePlugin) -> f64 + Send + Sync;

/// Score-differential sigmoid: `1 / (1 + exp(-(mine - best_opponent) / 20))`,
/// using `TransitionResult`-accumulated scores surfaced through
/// `plugin.get_spectator_summary`'s `scores` field when present, falling
/// back to `0.5` when no score signal exists yet (e.g. turn one).
pub fn default_eval_fn(
    game_data: &Value,
    phase: &Phase,
    player_id: &PlayerId,
    players: &PlayerSet,
    plugin: &dyn GamePlugin,
) -> f64 {
    let summary = plugin.get_spectator_summary(game_data, phase, players);
    let Some(scores) = summary.get("scores").and_then(Value::as_object) else {
        return 0.5;
    };

    let mine = scores.get(player_id.as_str()).and_then(Value::as_f64).unwrap_or(0.0);
    let best_opponent = players
        .iter()
        .filter(|p| &p.player_id != player_id)
        .filter_map(|p| scores.get(p.player_id.as_str()).and_then(Value::as_f64))
        .fold(f64::NEG_INFINITY, f64::max);

    let diff = if best_opponent.is_finite() { mine - best_opponent } else { 0.0 };
    1.0 / (1.0 + (-(diff / 20.0)).exp())
}

/// When a plugin transition already reported `game_over`, its winner list is
/// authoritative and skips the heuristic entirely: `1.0` for a sole winner,
/// `0.8` for a player sharing a tied win, `0.0` otherwise, `0.5` for a draw
/// or an empty winner list.
pub fn terminal_value(winners: &[PlayerId], reason: GameResultReason, player_id: &PlayerId) -> f64 {
    if matches!(reason, GameResultReason::Draw) || winners.is_empty() {
        return 0.5;
    }
    if !winners.iter().any(|w| w == player_id) {
        return 0.0;
    }
    if winners.len() == 1 {
        1.0
    } else {
        0.8
    }
}

pub fn default_eval_arc() -> Arc<EvalFn> {
    Arc::new(default_eval_fn)
}
