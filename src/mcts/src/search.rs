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

//! The determinized search loop: select -> expand -> evaluate ->
//! backpropagate, repeated per determinization subtree, aggregated by action
//! key. Generalizes a `MonteCarloAlgorithm` written against a single fixed
//! `TState` to any [`gamecore::plugin::GamePlugin`], adding RAVE/AMAF and
//! progressive widening on top.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gamecore::error::SessionError;
use gamecore::model::{Action, Phase, PlayerId, PlayerSet};
use gamecore::plugin::GamePlugin;
use gamecore::sim::{apply_action_and_resolve, clone_state, SimulationState};
use petgraph::prelude::EdgeRef;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use serde_json::Value;
use tracing::debug;

use crate::eval::{terminal_value, EvalFn};
use crate::params::SearchParams;
use crate::priority::{action_key, sort_by_priority};
use crate::uct::{blended_value, uct_value};

#[derive(Debug)]
struct SearchNode {
    /// Player whose action produced this node. `None` for the root.
    acting_player: Option<PlayerId>,
    visit_count: u64,
    total_reward: f64,
    untried_actions: Option<Vec<Value>>,
    amaf_visits: HashMap<String, u64>,
    amaf_values: HashMap<String, f64>,
}

impl SearchNode {
    fn new(acting_player: Option<PlayerId>) -> Self {
        Self {
            acting_player,
            visit_count: 0,
            total_reward: 0.0,
            untried_actions: None,
            amaf_visits: HashMap::new(),
            amaf_values: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct SearchEdge {
    action: Value,
    key: String,
}

type SearchGraph = petgraph::graph::Graph<SearchNode, SearchEdge>;
use petgraph::graph::NodeIndex;

/// The player expected to act in `phase`, for an otherwise-sequential,
/// non-auto-resolve decision point: the first `expected_actions` entry's
/// player, falling back to `metadata.player_index`, falling back to seat 0.
/// Mirrors `core::sim`'s auto-resolve actor derivation.
fn current_actor(phase: &Phase, players: &PlayerSet) -> PlayerId {
    if let Some(expected) = phase.expected_actions.first() {
        if let Some(player_id) = &expected.player_id {
            return player_id.clone();
        }
    }
    if let Some(idx) = phase.metadata_player_index() {
        if let Some(player) = players.by_seat(idx as u32) {
            return player.player_id.clone();
        }
    }
    players.as_slice()[0].player_id.clone()
}

/// The `action_type` a payload from `get_valid_actions` should be wrapped
/// with: the matching `expected_actions` entry's type for `actor`, falling
/// back to the phase name (as auto-resolve synthesis does).
fn current_action_type(phase: &Phase, actor: &PlayerId) -> String {
    phase
        .expected_actions
        .iter()
        .find(|e| e.player_id.as_ref().map_or(true, |p| p == actor))
        .map(|e| e.action_type.clone())
        .unwrap_or_else(|| phase.name.clone())
}

/// Entry point. `players` must be non-empty, contain `player_id`, and carry
/// dense `seat_index`es (guaranteed by [`PlayerSet::new`]); violating the
/// containment check is a hard error.
pub fn mcts_search(
    game_data: &Value,
    phase: &Phase,
    player_id: &PlayerId,
    plugin: &dyn GamePlugin,
    players: &PlayerSet,
    params: &SearchParams,
) -> Result<Value, SessionError> {
    if !players.contains(player_id) {
        return Err(SessionError::InvalidPlayers(format!(
            "mcts_search player {player_id:?} is not seated in this match"
        )));
    }

    let mut valid_actions = plugin.get_valid_actions(game_data, phase, player_id);
    if valid_actions.len() < 2 {
        return valid_actions.pop().ok_or_else(|| {
            SessionError::PluginError("mcts_search found no valid actions".into())
        });
    }

    let root_state = SimulationState {
        game_data: game_data.clone(),
        phase: phase.clone(),
        players: std::sync::Arc::new(players.clone()),
        scores: HashMap::new(),
        game_over: None,
    };

    let deadline = params.time_limit_ms.map(|total_ms| {
        let per_tree_ms = total_ms / params.num_determinizations.max(1) as u64;
        Instant::now() + Duration::from_millis(per_tree_ms)
    });

    let mut aggregate: HashMap<String, u64> = HashMap::new();
    let mut payload_by_key: HashMap<String, Value> = HashMap::new();
    let mut seed_rng = Xoshiro256StarStar::seed_from_u64(phase_seed(phase, player_id));

    for determinization in 0..params.num_determinizations.max(1) {
        let mut state = clone_state(&root_state);
        determinize(&mut state, &mut seed_rng);

        let totals = run_one_determinization(&state, player_id, plugin, params, &crate::eval::default_eval_fn, deadline)?;
        debug!(determinization, tree_size = totals.len(), "mcts determinization complete");
        for (key, visits) in totals {
            *aggregate.entry(key).or_insert(0) += visits;
        }
    }

    for action in &valid_actions {
        let key = action_key(action, game_data, params.tile_aware_amaf);
        payload_by_key.entry(key).or_insert_with(|| action.clone());
    }

    let mut ranked: Vec<_> = aggregate.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (key, _) in ranked {
        if let Some(payload) = payload_by_key.get(&key) {
            return Ok(payload.clone());
        }
    }

    // No tree statistics at all (e.g. the budget ran out before any
    // iteration completed) — fall back to the highest-priority valid action.
    sort_by_priority(&mut valid_actions);
    valid_actions
        .into_iter()
        .next()
        .ok_or_else(|| SessionError::PluginError("mcts_search found no valid actions".into()))
}

fn phase_seed(phase: &Phase, player_id: &PlayerId) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    phase.name.hash(&mut hasher);
    player_id.as_str().hash(&mut hasher);
    hasher.finish()
}

/// Shuffles the hidden-information reservoir at `game_data.tile_bag`, if
/// present, with a fresh determinization-local RNG.
fn determinize(state: &mut SimulationState, seed_rng: &mut Xoshiro256StarStar) {
    use rand::RngCore;
    let Some(tile_bag) = state.game_data.get_mut("tile_bag").and_then(Value::as_array_mut) else {
        return;
    };
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed_rng.next_u64());
    tile_bag.shuffle(&mut rng);
}

fn run_one_determinization(
    root_state: &SimulationState,
    searching_player: &PlayerId,
    plugin: &dyn GamePlugin,
    params: &SearchParams,
    eval_fn: &EvalFn,
    deadline: Option<Instant>,
) -> Result<HashMap<String, u64>, SessionError> {
    let mut graph = SearchGraph::new();
    let root = graph.add_node(SearchNode::new(None));

    let per_tree_budget = (params.num_simulations / params.num_determinizations.max(1)).max(1);

    for i in 0..per_tree_budget {
        if let Some(deadline) = deadline {
            if i % 16 == 0 && Instant::now() >= deadline {
                break;
            }
        }

        let mut state = clone_state(root_state);
        let (path, keys) = select_and_expand(&mut graph, &mut state, root, plugin, params)?;
        let value = evaluate_leaf(&state, searching_player, plugin, eval_fn);
        backpropagate(&mut graph, &path, &keys, searching_player, value, params);
    }

    let mut totals = HashMap::new();
    for edge in graph.edges(root) {
        let child = &graph[edge.target()];
        *totals.entry(edge.weight().key.clone()).or_insert(0) += child.visit_count;
    }
    Ok(totals)
}

/// Descends from `root` applying the tree policy, expanding at most one new
/// node per call. Returns the full node path (root to leaf, inclusive) and
/// the action key taken at each step (`keys[i]` led from `path[i]` to
/// `path[i + 1]`).
fn select_and_expand(
    graph: &mut SearchGraph,
    state: &mut SimulationState,
    root: NodeIndex,
    plugin: &dyn GamePlugin,
    params: &SearchParams,
) -> Result<(Vec<NodeIndex>, Vec<String>), SessionError> {
    let mut node = root;
    let mut path = vec![root];
    let mut keys = Vec::new();

    loop {
        if state.game_over.is_some() {
            return Ok((path, keys));
        }

        let actor = current_actor(&state.phase, &state.players);

        if graph[node].untried_actions.is_none() {
            let mut actions = plugin.get_valid_actions(&state.game_data, &state.phase, &actor);
            sort_by_priority(&mut actions);
            graph[node].untried_actions = Some(actions);
        }

        let untried_len = graph[node].untried_actions.as_ref().unwrap().len();
        let existing_children = graph.edges(node).count();

        if untried_len == 0 && existing_children == 0 {
            return Ok((path, keys));
        }

        let max_children =
            ((params.pw_c * (graph[node].visit_count as f64).powf(params.pw_alpha)).floor() as usize)
                .max(1);

        if untried_len > 0 && existing_children < max_children {
            let action_type = current_action_type(&state.phase, &actor);
            let payload = graph[node].untried_actions.as_mut().unwrap().remove(0);
            let key = action_key(&payload, &state.game_data, params.tile_aware_amaf);
            let action = Action::new(action_type, actor.clone(), payload.clone());
            apply_action_and_resolve(plugin, state, &action)?;

            let child = graph.add_node(SearchNode::new(Some(actor)));
            graph.add_edge(node, child, SearchEdge { action: payload, key: key.clone() });
            path.push(child);
            keys.push(key);
            return Ok((path, keys));
        }

        if existing_children == 0 {
            return Ok((path, keys));
        }

        let parent_visits = graph[node].visit_count.max(1) as f64;
        let node_amaf_visits = &graph[node].amaf_visits;
        let node_amaf_values = &graph[node].amaf_values;

        let mut best_score = f64::NEG_INFINITY;
        let mut best_target = None;
        let mut best_payload = None;
        let mut best_key = None;

        for edge in graph.edges(node) {
            let child = &graph[edge.target()];
            let key = &edge.weight().key;
            let amaf_v = *node_amaf_visits.get(key).unwrap_or(&0) as f64;
            let amaf_r = *node_amaf_values.get(key).unwrap_or(&0.0);

            let score = if child.visit_count == 0 {
                if params.rave_fpu && amaf_v > 0.0 {
                    1.0 + amaf_r / amaf_v
                } else {
                    f64::INFINITY
                }
            } else if params.use_rave {
                blended_value(
                    parent_visits,
                    child.visit_count as f64,
                    child.total_reward,
                    amaf_v,
                    amaf_r,
                    params.exploration_constant,
                    params.rave_k,
                )
            } else {
                uct_value(parent_visits, child.visit_count as f64, child.total_reward, params.exploration_constant)
            };

            if score > best_score {
                best_score = score;
                best_target = Some(edge.target());
                best_payload = Some(edge.weight().action.clone());
                best_key = Some(key.clone());
            }
        }

        let target = best_target.expect("node has at least one edge");
        let payload = best_payload.unwrap();
        let key = best_key.unwrap();
        let action_type = current_action_type(&state.phase, &actor);
        let action = Action::new(action_type, actor.clone(), payload);
        apply_action_and_resolve(plugin, state, &action)?;

        node = target;
        path.push(node);
        keys.push(key);
    }
}

fn evaluate_leaf(
    state: &SimulationState,
    searching_player: &PlayerId,
    plugin: &dyn GamePlugin,
    eval_fn: &EvalFn,
) -> f64 {
    if let Some(game_over) = &state.game_over {
        return terminal_value(&game_over.winners, game_over.reason, searching_player);
    }
    eval_fn(&state.game_data, &state.phase, searching_player, &state.players, plugin)
}

/// Walks `path` root-to-leaf, crediting each node with `value` if it was
/// acted by `searching_player` (or is the root) and `1 - value` otherwise,
/// then updates AMAF statistics for every action played below each ancestor,
/// bounded by `max_amaf_depth` plies when set.
fn backpropagate(
    graph: &mut SearchGraph,
    path: &[NodeIndex],
    keys: &[String],
    searching_player: &PlayerId,
    value: f64,
    params: &SearchParams,
) {
    for &node in path {
        let weight = &mut graph[node];
        weight.visit_count += 1;
        let perspective = match &weight.acting_player {
            None => value,
            Some(p) if p == searching_player => value,
            Some(_) => 1.0 - value,
        };
        weight.total_reward += perspective;
    }

    if !params.use_rave {
        return;
    }

    for (i, &ancestor) in path.iter().enumerate() {
        let max_j = if params.max_amaf_depth > 0 {
            (i + params.max_amaf_depth as usize + 1).min(keys.len())
        } else {
            keys.len()
        };
        for j in i..max_j {
            let key = &keys[j];
            let acted_by = path.get(j + 1).and_then(|n| graph[*n].acting_player.clone());
            let perspective = match &acted_by {
                None => value,
                Some(p) if p == searching_player => value,
                Some(_) => 1.0 - value,
            };
            let weight = &mut graph[ancestor];
            *weight.amaf_visits.entry(key.clone()).or_insert(0) += 1;
            *weight.amaf_values.entry(key.clone()).or_insert(0.0) += perspective;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_action_type_falls_back_to_phase_name() {
        let phase = Phase {
            name: "main".into(),
            concurrent_mode: gamecore::model::ConcurrentMode::Sequential,
            expected_actions: vec![],
            auto_resolve: false,
            metadata: Value::Null,
        };
        assert_eq!(current_action_type(&phase, &PlayerId("p0".into())), "main");
    }

    fn two_player_tictactoe() -> (tictactoe::TicTacToePlugin, PlayerSet) {
        let players = PlayerSet::new(vec![
            gamecore::model::Player {
                player_id: PlayerId("p0".into()),
                display_name: "p0".into(),
                seat_index: 0,
                is_bot: true,
                bot_id: None,
            },
            gamecore::model::Player {
                player_id: PlayerId("p1".into()),
                display_name: "p1".into(),
                seat_index: 1,
                is_bot: true,
                bot_id: None,
            },
        ])
        .unwrap();
        (tictactoe::TicTacToePlugin, players)
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(20))]

        /// The returned action is always a member of `get_valid_actions`,
        /// for any reasonable simulation/determinization budget.
        #[test]
        fn returned_action_is_always_among_the_valid_actions(
            num_simulations in 10u32..80,
            num_determinizations in 1u32..3,
        ) {
            let (plugin, players) = two_player_tictactoe();
            let (game_data, phase, _) =
                plugin.create_initial_state(&players, &gamecore::model::GameConfig::default()).unwrap();
            let player_id = phase.expected_actions[0].player_id.clone().unwrap();
            let params = SearchParams { num_simulations, num_determinizations, ..SearchParams::default() };

            let action = mcts_search(&game_data, &phase, &player_id, &plugin, &players, &params).unwrap();
            let valid_actions = plugin.get_valid_actions(&game_data, &phase, &player_id);
            proptest::prop_assert!(valid_actions.contains(&action));
        }

        /// Whenever a plugin offers exactly one legal action, `mcts_search`
        /// must return it verbatim without spending any simulation budget.
        #[test]
        fn single_valid_action_short_circuits_regardless_of_budget(
            num_simulations in 1u32..500,
        ) {
            let (plugin, players) = two_player_tictactoe();
            let (mut game_data, mut phase, _) =
                plugin.create_initial_state(&players, &gamecore::model::GameConfig::default()).unwrap();
            // Leaves cell 5 as the only empty one, with no line completed early.
            for cell in [0u64, 1, 2, 3, 4, 6, 7, 8] {
                let actor = phase.expected_actions[0].player_id.clone().unwrap();
                let action = Action::new("play", actor, serde_json::json!({ "cell": cell }));
                let result = plugin.apply_action(&game_data, &phase, &action, &players).unwrap();
                proptest::prop_assert!(result.game_over.is_none(), "board should not have finished early");
                game_data = result.game_data;
                phase = result.next_phase;
            }

            let actor = phase.expected_actions[0].player_id.clone().unwrap();
            let valid_actions = plugin.get_valid_actions(&game_data, &phase, &actor);
            proptest::prop_assert_eq!(valid_actions.len(), 1);

            let params = SearchParams { num_simulations, ..SearchParams::default() };
            let action = mcts_search(&game_data, &phase, &actor, &plugin, &players, &params).unwrap();
            proptest::prop_assert_eq!(Some(&action), valid_actions.first());
        }
    }
}
