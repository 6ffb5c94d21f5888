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

//! The auto-resolve stepper: given a plugin and a state, apply one real
//! action and then drive any chain of `auto_resolve` phases to a fixed
//! point. Shared verbatim by the session engine and by MCTS rollouts, so
//! both see identical phase-advancement semantics.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SessionError;
use crate::model::{Action, GameResult, Phase, PlayerId, PlayerSet};
use crate::plugin::GamePlugin;

/// The minimal slice of match state a simulation step needs. Distinct from
/// [`crate::model::GameState`]: no match/game id, no disconnect bookkeeping —
/// just what a plugin transition reads and writes.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub game_data: Value,
    pub phase: Phase,
    pub players: Arc<PlayerSet>,
    pub scores: HashMap<PlayerId, f64>,
    pub game_over: Option<GameResult>,
}

/// A cap on consecutive auto-resolve transitions before treating the chain as
/// a plugin bug rather than looping forever.
pub const MAX_AUTO_RESOLVE_STEPS: u32 = 50;

/// Deep-clones a simulation state. `game_data` is a `serde_json::Value`, so
/// this is a structural clone, not a reference bump — what MCTS needs to
/// branch a tree node without aliasing its parent.
pub fn clone_state(state: &SimulationState) -> SimulationState {
    state.clone()
}

/// Synthesizes the action the engine submits on a player's behalf when an
/// `auto_resolve` phase doesn't wait on real input. `action_type` is the
/// phase name; the acting player is `phase.metadata.player_index` when
/// present, else the first active seat, else a literal `"system"` id for
/// phases with no natural actor (round transitions, scoring phases).
fn synthesize_auto_resolve_action(phase: &Phase, players: &PlayerSet) -> Action {
    let player_id = phase
        .metadata_player_index()
        .and_then(|idx| players.by_seat(idx as u32))
        .map(|p| p.player_id.clone())
        .or_else(|| players.as_slice().first().map(|p| p.player_id.clone()))
        .unwrap_or_else(|| PlayerId("system".into()));

    Action::new(phase.name.clone(), player_id, Value::Null)
}

/// Applies `action` via `plugin.apply_action`, then repeatedly applies
/// synthesized actions for as long as the resulting phase has
/// `auto_resolve == true` and the game hasn't ended, up to
/// [`MAX_AUTO_RESOLVE_STEPS`]. Mutates `state` in place; on error `state` is
/// left at whatever point the chain reached (callers that need atomicity
/// should clone first).
pub fn apply_action_and_resolve(
    plugin: &dyn GamePlugin,
    state: &mut SimulationState,
    action: &Action,
) -> Result<(), SessionError> {
    let mut result = plugin.apply_action(&state.game_data, &state.phase, action, &state.players)?;

    let mut steps = 0;
    loop {
        state.game_data = result.game_data;
        state.phase = result.next_phase;
        for (player_id, score) in result.scores {
            state.scores.insert(player_id, score);
        }
        if let Some(game_over) = result.game_over.take() {
            state.game_over = Some(game_over);
            return Ok(());
        }

        if !state.phase.auto_resolve {
            return Ok(());
        }

        steps += 1;
        if steps > MAX_AUTO_RESOLVE_STEPS {
            return Err(SessionError::PluginError(format!(
                "auto_resolve chain exceeded {MAX_AUTO_RESOLVE_STEPS} steps without settling; phase {:?} looks non-terminating",
                state.phase.name
            )));
        }

        let synthetic = synthesize_auto_resolve_action(&state.phase, &state.players);
        result = plugin.apply_action(&state.game_data, &state.phase, &synthetic, &state.players)?;
    }
}
