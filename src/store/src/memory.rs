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

//! In-memory adapters. No persistence across process restarts; used by
//! tests and by `server::bootstrap` when no `store.backend` is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use gamecore::error::SessionError;
use gamecore::model::{GameState, GameStatus, MatchId, PersistedEvent};
use tokio::sync::Mutex;

use crate::traits::{EventStore, StateStore};

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<MatchId, Vec<PersistedEvent>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_events(&self, match_id: &MatchId, events: &[PersistedEvent]) -> Result<(), SessionError> {
        let mut guard = self.events.lock().await;
        let log = guard.entry(match_id.clone()).or_default();
        for event in events {
            let expected = log.len() as u64;
            if event.sequence_number != expected {
                return Err(SessionError::PersistenceError(format!(
                    "append_events gap for {match_id:?}: expected sequence {expected}, got {}",
                    event.sequence_number
                )));
            }
            log.push(event.clone());
        }
        Ok(())
    }

    async fn get_events(&self, match_id: &MatchId, from_sequence: u64) -> Result<Vec<PersistedEvent>, SessionError> {
        let guard = self.events.lock().await;
        Ok(guard
            .get(match_id)
            .map(|log| {
                log.iter().filter(|e| e.sequence_number >= from_sequence).cloned().collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<MatchId, GameState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save_state(&self, state: &GameState) -> Result<(), SessionError> {
        let mut guard = self.states.lock().await;
        guard.insert(state.match_id.clone(), state.clone());
        Ok(())
    }

    async fn load_state(&self, match_id: &MatchId) -> Result<Option<GameState>, SessionError> {
        let guard = self.states.lock().await;
        Ok(guard.get(match_id).cloned())
    }

    async fn delete_state(&self, match_id: &MatchId) -> Result<(), SessionError> {
        let mut guard = self.states.lock().await;
        guard.remove(match_id);
        Ok(())
    }

    async fn list_active_matches(&self) -> Result<Vec<MatchId>, SessionError> {
        let guard = self.states.lock().await;
        Ok(guard
            .values()
            .filter(|state| matches!(state.status, GameStatus::Active))
            .map(|state| state.match_id.clone())
            .collect())
    }
}
