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

use async_trait::async_trait;
use gamecore::error::SessionError;
use gamecore::model::{GameState, MatchId, PersistedEvent};

/// Append-only, sequence-numbered event log per match. Implementations must
/// preserve append order and leave no gaps in `sequence_number`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_events(&self, match_id: &MatchId, events: &[PersistedEvent]) -> Result<(), SessionError>;

    /// Ordered replay starting at (and including) `from_sequence`.
    async fn get_events(&self, match_id: &MatchId, from_sequence: u64) -> Result<Vec<PersistedEvent>, SessionError>;
}

/// Whole-state key/value store, keyed by `match_id`.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_state(&self, state: &GameState) -> Result<(), SessionError>;

    async fn load_state(&self, match_id: &MatchId) -> Result<Option<GameState>, SessionError>;

    async fn delete_state(&self, match_id: &MatchId) -> Result<(), SessionError>;

    async fn list_active_matches(&self) -> Result<Vec<MatchId>, SessionError>;
}
