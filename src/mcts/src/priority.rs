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

//! The action priority heuristic and canonical action key. Domain-aware (it
//! knows about tile placements and meeple spots) but lives here because both
//! rules are applied opaquely to any plugin's `serde_json::Value` payload —
//! no plugin-specific code is required to use either.

use serde_json::Value;

fn meeple_prefix_rank(spot: &str) -> u32 {
    if spot.starts_with("city") {
        0
    } else if spot.starts_with("monastery") {
        1
    } else if spot.starts_with("road") {
        2
    } else if spot.starts_with("field") {
        3
    } else {
        4
    }
}

/// Lower is higher priority: tile placements with integer `x,y,rotation`
/// (ranked ascending by Manhattan distance `|x|+|y|` from the origin), then
/// `meeple_spot` placements (ranked by prefix), then anything else, then
/// `skip: true` last.
pub fn priority(action: &Value) -> u32 {
    if let (Some(x), Some(y), Some(_rotation)) = (
        action.get("x").and_then(Value::as_i64),
        action.get("y").and_then(Value::as_i64),
        action.get("rotation").and_then(Value::as_i64),
    ) {
        let manhattan = x.unsigned_abs().saturating_add(y.unsigned_abs());
        return u32::try_from(manhattan).unwrap_or(u32::MAX - 1).min(PLACEMENT_BUCKET_END);
    }
    if let Some(spot) = action.get("meeple_spot").and_then(Value::as_str) {
        return MEEPLE_BUCKET_START + meeple_prefix_rank(spot);
    }
    if action.get("skip").and_then(Value::as_bool) == Some(true) {
        return SKIP_BUCKET;
    }
    OTHER_BUCKET
}

const PLACEMENT_BUCKET_END: u32 = 999;
const MEEPLE_BUCKET_START: u32 = 1_000;
const OTHER_BUCKET: u32 = 1_500;
const SKIP_BUCKET: u32 = 2_000;

/// Sorts `actions` by [`priority`] (stable, so equal-priority actions keep
/// their original relative order).
pub fn sort_by_priority(actions: &mut [Value]) {
    actions.sort_by_key(priority);
}

/// A canonical, hashable string identity for an action payload, used to
/// dedupe untried actions against tree edges and as the RAVE/AMAF key.
pub fn action_key(action: &Value, game_data: &Value, tile_aware_amaf: bool) -> String {
    let base = if let (Some(x), Some(y), Some(rotation)) = (
        action.get("x").and_then(Value::as_i64),
        action.get("y").and_then(Value::as_i64),
        action.get("rotation").and_then(Value::as_i64),
    ) {
        format!("{x},{y},{rotation}")
    } else if let Some(spot) = action.get("meeple_spot").and_then(Value::as_str) {
        format!("meeple:{spot}")
    } else if action.get("skip").and_then(Value::as_bool) == Some(true) {
        "skip".to_string()
    } else {
        canonical_json(action)
    };

    if tile_aware_amaf {
        if let Some(tile) = game_data.get("current_tile") {
            return format!("{}|{base}", canonical_json(tile));
        }
    }
    base
}

/// Sorted-keys JSON serialization, so structurally identical objects with
/// keys inserted in a different order still produce the same key.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let body = entries
                .into_iter()
                .map(|(k, v)| format!("{:?}:{}", k, canonical_json(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        Value::Array(items) => {
            let body = items.iter().map(canonical_json).collect::<Vec<_>>().join(",");
            format!("[{body}]")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn city_before_field_before_skip() {
        let city = json!({"meeple_spot": "city_N"});
        let field = json!({"meeple_spot": "field_NE"});
        let skip = json!({"skip": true});
        assert!(priority(&city) < priority(&field));
        assert!(priority(&field) < priority(&skip));
    }

    #[test]
    fn placements_rank_by_manhattan_distance_ascending() {
        let near = json!({"x": 1, "y": 0, "rotation": 0});
        let far = json!({"x": 3, "y": -4, "rotation": 180});
        assert!(priority(&near) < priority(&far));
    }

    #[test]
    fn placements_outrank_meeple_spots_and_skip() {
        let placement = json!({"x": -2, "y": 5, "rotation": 90});
        let meeple = json!({"meeple_spot": "city_N"});
        let skip = json!({"skip": true});
        assert!(priority(&placement) < priority(&meeple));
        assert!(priority(&meeple) < priority(&skip));
    }

    #[test]
    fn action_key_placement() {
        let action = json!({"x": 1, "y": -2, "rotation": 90});
        assert_eq!(action_key(&action, &Value::Null, false), "1,-2,90");
    }

    #[test]
    fn action_key_tile_aware_prefixes_current_tile() {
        let action = json!({"skip": true});
        let game_data = json!({"current_tile": "T7"});
        let key = action_key(&action, &game_data, true);
        assert!(key.ends_with("|skip"));
        assert_ne!(key, action_key(&action, &game_data, false));
    }
}
