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

//! Child-selection scoring. Generalizes `ai/src/monte_carlo/uct1.rs`'s
//! `Uct1::score` with a RAVE blend term.

/// Plain UCT1: `Q(v')/N(v') + c * sqrt(2 * ln(N(v)) / N(v'))`.
pub fn uct_value(parent_visits: f64, child_visits: f64, child_reward: f64, exploration_constant: f64) -> f64 {
    let exploitation = child_reward / child_visits;
    let exploration = f64::sqrt(2.0 * f64::ln(parent_visits) / child_visits);
    exploitation + exploration_constant * exploration
}

/// `beta(N, k) = sqrt(k / (3N + k))`. Strictly decreasing in `N`; `-> 1` as
/// `N -> 0`, `-> 0` as `N -> infinity`.
pub fn rave_beta(parent_visits: f64, k: f64) -> f64 {
    f64::sqrt(k / (3.0 * parent_visits + k))
}

/// UCT value blended with the AMAF (all-moves-as-first) estimate:
/// `(1 - beta)*Q_uct + beta*Q_amaf`.
pub fn blended_value(
    parent_visits: f64,
    child_visits: f64,
    child_reward: f64,
    amaf_visits: f64,
    amaf_reward: f64,
    exploration_constant: f64,
    rave_k: f64,
) -> f64 {
    let q_uct = uct_value(parent_visits, child_visits, child_reward, exploration_constant);
    if amaf_visits <= 0.0 {
        return q_uct;
    }
    let beta = rave_beta(parent_visits, rave_k);
    let q_amaf = amaf_reward / amaf_visits;
    (1.0 - beta) * q_uct + beta * q_amaf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rave_beta_bounds() {
        assert!(rave_beta(0.0, 300.0) > 0.99);
        assert!(rave_beta(1_000_000.0, 300.0) < 0.01);
    }

    #[test]
    fn rave_beta_strictly_decreasing() {
        let mut prev = rave_beta(0.0, 300.0);
        for n in [1.0, 10.0, 100.0, 1_000.0, 10_000.0] {
            let next = rave_beta(n, 300.0);
            assert!(next < prev, "beta should strictly decrease, {next} >= {prev} at N={n}");
            prev = next;
        }
    }
}
