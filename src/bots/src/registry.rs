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

//! Maps `bot_id -> factory()`. An unregistered id is a hard error at
//! construction time, not a deferred failure the first time the bot is
//! asked to move.

use std::collections::HashMap;
use std::sync::Arc;

use gamecore::error::SessionError;
use mcts::SearchParams;

use crate::strategy::{BotStrategy, MctsStrategy, RandomStrategy};

type Factory = Arc<dyn Fn() -> Arc<dyn BotStrategy> + Send + Sync>;

pub struct BotRegistry {
    factories: HashMap<String, Factory>,
}

impl BotRegistry {
    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Registers `random`, `easy`, `medium`, `hard` — the presets
    /// `server::bootstrap` wires up at startup.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("random", || Arc::new(RandomStrategy::from_entropy()));
        registry.register("easy", || Arc::new(MctsStrategy::new(SearchParams::easy())));
        registry.register("medium", || Arc::new(MctsStrategy::new(SearchParams::medium())));
        registry.register("hard", || Arc::new(MctsStrategy::new(SearchParams::hard())));
        registry
    }

    pub fn register<F, S>(&mut self, bot_id: impl Into<String>, factory: F)
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: BotStrategy + 'static,
    {
        let boxed: Factory = Arc::new(move || Arc::new(factory()) as Arc<dyn BotStrategy>);
        self.factories.insert(bot_id.into(), boxed);
    }

    pub fn create(&self, bot_id: &str) -> Result<Arc<dyn BotStrategy>, SessionError> {
        let factory =
            self.factories.get(bot_id).ok_or_else(|| SessionError::UnknownBot(bot_id.to_string()))?;
        Ok(factory())
    }

    pub fn known_bot_ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
