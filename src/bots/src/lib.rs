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

//! Bot strategies: a narrow `choose_action` interface with two
//! implementations, random play and MCTS-backed play, plus a registry
//! mapping `bot_id` to a strategy factory.

pub mod registry;
pub mod strategy;

pub use registry::BotRegistry;
pub use strategy::{BotStrategy, MctsStrategy, RandomStrategy};
