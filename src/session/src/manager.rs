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

//! Owns the `MatchId -> GameSession` map: create, recover, cleanup, and
//! remove. Also carries the plugin registry (`game_id -> GamePlugin`), since
//! create and recover both need to resolve one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bots::BotRegistry;
use gamecore::error::SessionError;
use gamecore::model::{GameConfig, GameId, GameState, MatchId, Player, PlayerSet};
use gamecore::plugin::GamePlugin;
use store::{EventStore, StateStore};
use tokio::sync::RwLock;

use crate::bot_runner::BotRunner;
use crate::game_session::{expected_actor, GameSession};
use crate::transport::Transport;

/// `game_id -> GamePlugin` factory map, in the same register/create shape as
/// `bots::BotRegistry` — unknown `game_id` is a hard error at `create` time.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<GameId, Arc<dyn GamePlugin>>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn GamePlugin>) {
        let game_id = GameId(plugin.metadata().game_id);
        self.plugins.insert(game_id, plugin);
    }

    pub fn get(&self, game_id: &GameId) -> Result<Arc<dyn GamePlugin>, SessionError> {
        self.plugins
            .get(game_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(format!("no plugin registered for game {game_id:?}")))
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<MatchId, Arc<GameSession>>>,
    plugins: PluginRegistry,
    event_store: Arc<dyn EventStore>,
    state_store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
    bot_registry: Arc<BotRegistry>,
    grace_period: Duration,
    /// Matches left active with no hot session for longer than this are
    /// marked abandoned.
    stale_after: Duration,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plugins: PluginRegistry,
        event_store: Arc<dyn EventStore>,
        state_store: Arc<dyn StateStore>,
        transport: Arc<dyn Transport>,
        bot_registry: Arc<BotRegistry>,
        grace_period: Duration,
        stale_after: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            plugins,
            event_store,
            state_store,
            transport,
            bot_registry,
            grace_period,
            stale_after,
        }
    }

    pub async fn create(
        &self,
        match_id: MatchId,
        game_id: GameId,
        players: Vec<Player>,
        config: GameConfig,
    ) -> Result<Arc<GameSession>, SessionError> {
        let plugin = self.plugins.get(&game_id)?;
        let player_set = PlayerSet::new(players)?;
        let (game_data, phase, events) = plugin.create_initial_state(&player_set, &config)?;

        let created_at = unix_timestamp_seconds();
        let game = GameState {
            match_id: match_id.clone(),
            game_id,
            players: player_set,
            config,
            current_phase: phase,
            status: gamecore::model::GameStatus::Active,
            turn_number: 0,
            action_number: 0,
            game_data,
            scores: HashMap::new(),
            disconnected_players: HashMap::new(),
            forfeited_players: Vec::new(),
            created_at,
        };

        let mut next_sequence = 0u64;
        if !events.is_empty() {
            let persisted: Vec<_> = events
                .into_iter()
                .enumerate()
                .map(|(offset, event)| gamecore::model::PersistedEvent {
                    match_id: match_id.clone(),
                    sequence_number: next_sequence + offset as u64,
                    event_type: event.event_type,
                    player_id: event.player_id,
                    payload: event.payload,
                    timestamp: created_at,
                })
                .collect();
            next_sequence += persisted.len() as u64;
            self.event_store.append_events(&match_id, &persisted).await?;
        }

        self.state_store.save_state(&game).await?;

        let session = GameSession::new(
            match_id.clone(),
            plugin,
            game,
            next_sequence,
            Arc::clone(&self.event_store),
            Arc::clone(&self.state_store),
            Arc::clone(&self.transport),
            Arc::clone(&self.bot_registry),
            self.grace_period,
        );

        self.sessions.write().await.insert(match_id, Arc::clone(&session));

        // Run auto-resolve to a fixpoint before returning, so the first
        // phase a client sees already needs a human action.
        session.run_initial_auto_resolve().await?;

        let snapshot = session.snapshot().await;
        if matches!(snapshot.status, gamecore::model::GameStatus::Active) {
            if let Some(actor) = expected_actor(&snapshot.current_phase, &snapshot.players) {
                if snapshot.players.by_id(&actor).is_some_and(|p| p.is_bot) {
                    BotRunner::schedule_bot_move_if_needed(Arc::clone(&session));
                }
            }
        }

        Ok(session)
    }

    /// At startup: reload every match the state store says is active,
    /// recover `next_sequence` from the event log's length, and re-arm or
    /// synchronously expire each disconnect timer.
    pub async fn recover(&self) -> Result<usize, SessionError> {
        let match_ids = self.state_store.list_active_matches().await?;
        let now = unix_timestamp_seconds();
        let mut recovered = 0;

        for match_id in match_ids {
            let Some(game) = self.state_store.load_state(&match_id).await? else {
                continue;
            };
            let plugin = self.plugins.get(&game.game_id)?;
            let events = self.event_store.get_events(&match_id, 0).await?;
            let next_sequence = events.len() as u64;

            let session = GameSession::new(
                match_id.clone(),
                plugin,
                game.clone(),
                next_sequence,
                Arc::clone(&self.event_store),
                Arc::clone(&self.state_store),
                Arc::clone(&self.transport),
                Arc::clone(&self.bot_registry),
                self.grace_period,
            );
            self.sessions.write().await.insert(match_id.clone(), Arc::clone(&session));
            recovered += 1;

            for (player_id, disconnect_ts) in game.disconnected_players {
                let elapsed = Duration::from_secs_f64((now - disconnect_ts).max(0.0));
                if elapsed >= self.grace_period {
                    session.force_expire_grace(player_id).await?;
                } else {
                    let remaining = self.grace_period - elapsed;
                    session.rearm_grace_timer(player_id, remaining).await;
                }
            }
        }

        Ok(recovered)
    }

    /// For matches the state store still marks active but with no in-memory
    /// session older than `stale_after` — a process crash left them
    /// orphaned. Marks them abandoned in place.
    pub async fn cleanup_stale(&self) -> Result<usize, SessionError> {
        let match_ids = self.state_store.list_active_matches().await?;
        let now = unix_timestamp_seconds();
        let sessions = self.sessions.read().await;
        let mut cleaned = 0;

        for match_id in match_ids {
            if sessions.contains_key(&match_id) {
                continue;
            }
            let Some(mut game) = self.state_store.load_state(&match_id).await? else {
                continue;
            };
            let age = Duration::from_secs_f64((now - game.created_at).max(0.0));
            if age < self.stale_after {
                continue;
            }
            game.status = gamecore::model::GameStatus::Abandoned;
            self.state_store.save_state(&game).await?;
            cleaned += 1;
        }

        Ok(cleaned)
    }

    /// Evicts a finished session from memory. Leaves its persisted state
    /// alone — finished matches remain queryable through the store.
    pub async fn remove(&self, match_id: &MatchId) {
        self.sessions.write().await.remove(match_id);
    }

    pub async fn get(&self, match_id: &MatchId) -> Option<Arc<GameSession>> {
        self.sessions.read().await.get(match_id).cloned()
    }

    /// The operator escape hatch a bot failure or a stuck plugin should
    /// never require: ends the match immediately regardless of plugin
    /// state, bypassing plugin logic entirely.
    pub async fn force_finish(&self, match_id: &MatchId) -> Result<(), SessionError> {
        let session = self
            .get(match_id)
            .await
            .ok_or_else(|| SessionError::NotFound(format!("no active session for {match_id:?}")))?;
        session.force_finish().await
    }
}

fn unix_timestamp_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
