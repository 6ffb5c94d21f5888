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

//! Game-agnostic Monte Carlo Tree Search with determinization, progressive
//! widening, and optional RAVE/AMAF. Generalizes a UCT1 search written
//! against a fixed `TState: GameStateNode` to any
//! [`gamecore::plugin::GamePlugin`].

pub mod eval;
pub mod params;
pub mod priority;
pub mod search;
pub mod uct;

pub use params::SearchParams;
pub use search::mcts_search;
