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

//! One `GameSession` per live match. State lives behind a `tokio::sync::Mutex`
//! held across the persistence/broadcast await points that make up a
//! transition, so concurrent callers serialize on one mutex per session
//! rather than racing on the underlying state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bots::BotRegistry;
use gamecore::error::SessionError;
use gamecore::model::{
    Action, ConcurrentMode, GameResult, GameResultReason, GameState, GameStatus, MatchId, Phase,
    PlayerId, PlayerSet, PlayerView,
};
use gamecore::plugin::{DisconnectPolicy, GamePlugin};
use gamecore::sim::MAX_AUTO_RESOLVE_STEPS;
use serde_json::Value;
use store::{EventStore, StateStore};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::bot_runner::BotRunner;
use crate::transport::Transport;

struct Locked {
    game: GameState,
    next_sequence: u64,
}

pub struct GameSession {
    match_id: MatchId,
    plugin: Arc<dyn GamePlugin>,
    locked: Mutex<Locked>,
    disconnect_timers: Mutex<HashMap<PlayerId, JoinHandle<()>>>,
    event_store: Arc<dyn EventStore>,
    state_store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
    bot_registry: Arc<BotRegistry>,
    grace_period: Duration,
}

impl GameSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        match_id: MatchId,
        plugin: Arc<dyn GamePlugin>,
        game: GameState,
        next_sequence: u64,
        event_store: Arc<dyn EventStore>,
        state_store: Arc<dyn StateStore>,
        transport: Arc<dyn Transport>,
        bot_registry: Arc<BotRegistry>,
        grace_period: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            match_id,
            plugin,
            locked: Mutex::new(Locked { game, next_sequence }),
            disconnect_timers: Mutex::new(HashMap::new()),
            event_store,
            state_store,
            transport,
            bot_registry,
            grace_period,
        })
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub(crate) fn plugin(&self) -> &Arc<dyn GamePlugin> {
        &self.plugin
    }

    pub(crate) fn bot_registry(&self) -> &Arc<BotRegistry> {
        &self.bot_registry
    }

    pub async fn snapshot(&self) -> GameState {
        self.locked.lock().await.game.clone()
    }

    /// Re-arms a disconnect timer with `remaining` budget, for recovery.
    /// Panics are not possible here; callers that need immediate
    /// forfeit/abandon because
    /// `remaining <= 0` should call [`Self::force_expire_grace`] instead.
    pub async fn rearm_grace_timer(self: &Arc<Self>, player_id: PlayerId, remaining: Duration) {
        self.start_grace_timer(player_id, remaining).await;
    }

    /// Drives auto-resolve on a freshly created match before it is ever
    /// visible, so the first phase a client sees already needs a human
    /// action — `SessionManager::create`'s "crucially" step.
    pub async fn run_initial_auto_resolve(self: &Arc<Self>) -> Result<(), SessionError> {
        let mut guard = self.locked.lock().await;
        self.run_auto_resolve_and_forfeit_skip(&mut guard).await
    }

    /// Synchronously applies the disconnect policy as if the grace timer had
    /// just fired, for recovery when the computed remaining budget is `<= 0`.
    pub async fn force_expire_grace(self: &Arc<Self>, player_id: PlayerId) -> Result<(), SessionError> {
        let mut guard = self.locked.lock().await;
        if !guard.game.disconnected_players.contains_key(&player_id) {
            return Ok(());
        }
        self.apply_disconnect_policy(&mut guard, player_id).await
    }

    /// Status, forfeiture, concurrent-mode, turn-order, and plugin
    /// validation all go through this one routine regardless of caller.
    fn validate_envelope(game: &GameState, action: &Action, plugin: &dyn GamePlugin) -> Result<(), SessionError> {
        if !matches!(game.status, GameStatus::Active) {
            return Err(SessionError::GameNotActive(game.status));
        }
        if game.forfeited_players.contains(&action.player_id) {
            return Err(SessionError::PlayerForfeited(action.player_id.clone()));
        }
        if game.current_phase.concurrent_mode != ConcurrentMode::Sequential {
            return Err(SessionError::UnsupportedConcurrentMode(game.current_phase.concurrent_mode));
        }
        if let Some(expected) = expected_actor(&game.current_phase, &game.players) {
            if expected != action.player_id {
                return Err(SessionError::NotYourTurn {
                    expected: Some(expected),
                    actual: action.player_id.clone(),
                });
            }
        }
        if let Some(message) = plugin.validate_action(&game.game_data, &game.current_phase, action) {
            return Err(SessionError::InvalidAction(message));
        }
        Ok(())
    }

    pub async fn handle_action(self: &Arc<Self>, action: Action) -> Result<(), SessionError> {
        let mut guard = self.locked.lock().await;

        if let Err(err) = Self::validate_envelope(&guard.game, &action, self.plugin.as_ref()) {
            drop(guard);
            self.transport.send_error(&action.player_id, error_kind(&err), &err.to_string()).await;
            return Err(err);
        }

        let result = match self.plugin.apply_action(
            &guard.game.game_data,
            &guard.game.current_phase,
            &action,
            &guard.game.players,
        ) {
            Ok(result) => result,
            Err(err) => {
                drop(guard);
                self.transport.send_error(&action.player_id, error_kind(&err), &err.to_string()).await;
                return Err(err);
            }
        };

        if let Err(err) = self.apply_result(&mut guard, result).await {
            drop(guard);
            self.transport.send_error(&action.player_id, error_kind(&err), &err.to_string()).await;
            return Err(err);
        }

        self.run_auto_resolve_and_forfeit_skip(&mut guard).await?;

        let notify_bot = Self::next_actor_is_bot(&guard.game);
        drop(guard);

        if notify_bot {
            BotRunner::schedule_bot_move_if_needed(Arc::clone(self));
        }

        Ok(())
    }

    /// Mutates `GameState` in place, appends each emitted event with the
    /// next sequence number, persists, broadcasts, and finishes the match if
    /// `result.game_over` is set. Missing `scores` entries mean "unchanged",
    /// not "zero" — only keys present in `result.scores` are overlaid onto
    /// the running totals.
    async fn apply_result(&self, locked: &mut Locked, result: gamecore::model::TransitionResult) -> Result<(), SessionError> {
        let snapshot_game = locked.game.clone();
        let snapshot_seq = locked.next_sequence;

        locked.game.game_data = result.game_data;
        locked.game.current_phase = result.next_phase;
        for (player_id, score) in result.scores {
            locked.game.scores.insert(player_id, score);
        }
        locked.game.action_number += 1;

        let timestamp = unix_timestamp_seconds();
        let mut persisted = Vec::with_capacity(result.events.len());
        for event in result.events {
            persisted.push(gamecore::model::PersistedEvent {
                match_id: self.match_id.clone(),
                sequence_number: locked.next_sequence,
                event_type: event.event_type,
                player_id: event.player_id,
                payload: event.payload,
                timestamp,
            });
            locked.next_sequence += 1;
        }

        if let Err(err) = self.persist(locked, &persisted).await {
            locked.game = snapshot_game;
            locked.next_sequence = snapshot_seq;
            return Err(err);
        }

        self.broadcast(&locked.game).await;

        if let Some(game_over) = result.game_over {
            self.finish_game(locked, game_over).await?;
        }

        Ok(())
    }

    async fn persist(&self, locked: &Locked, events: &[gamecore::model::PersistedEvent]) -> Result<(), SessionError> {
        if !events.is_empty() {
            self.event_store.append_events(&self.match_id, events).await?;
        }
        self.state_store.save_state(&locked.game).await
    }

    async fn append_lifecycle_event(
        &self,
        locked: &mut Locked,
        event_type: &str,
        player_id: Option<PlayerId>,
        payload: Value,
    ) -> Result<(), SessionError> {
        let event = gamecore::model::PersistedEvent {
            match_id: self.match_id.clone(),
            sequence_number: locked.next_sequence,
            event_type: event_type.to_string(),
            player_id,
            payload,
            timestamp: unix_timestamp_seconds(),
        };
        locked.next_sequence += 1;
        self.event_store.append_events(&self.match_id, std::slice::from_ref(&event)).await
    }

    async fn broadcast(&self, game: &GameState) {
        for player in game.players.iter() {
            let view = self.build_player_view(game, Some(&player.player_id));
            self.transport.send_state_update(&view).await;
        }
    }

    fn build_player_view(&self, game: &GameState, viewer: Option<&PlayerId>) -> PlayerView {
        let game_data = self.plugin.get_player_view(&game.game_data, &game.current_phase, viewer, &game.players);
        let can_act = matches!(game.status, GameStatus::Active)
            && viewer.is_some_and(|id| !game.forfeited_players.contains(id));
        let valid_actions = if can_act {
            viewer
                .map(|id| self.plugin.get_valid_actions(&game.game_data, &game.current_phase, id))
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        PlayerView {
            match_id: game.match_id.clone(),
            game_id: game.game_id.clone(),
            game_data,
            valid_actions,
            current_phase: game.current_phase.clone(),
            scores: game.scores.clone(),
            status: game.status,
            forfeited_players: game.forfeited_players.clone(),
            disconnected_players: game.disconnected_players.keys().cloned().collect(),
            viewer_id: viewer.cloned(),
            is_spectator: viewer.is_none(),
        }
    }

    /// Drives auto-resolve to a fixpoint and, whenever the expected actor is
    /// forfeited, asks the plugin to skip their turn — interleaved, since
    /// either can produce a phase that needs the other.
    async fn run_auto_resolve_and_forfeit_skip(&self, locked: &mut Locked) -> Result<(), SessionError> {
        let mut steps: u32 = 0;
        loop {
            if !matches!(locked.game.status, GameStatus::Active) {
                return Ok(());
            }
            let phase = locked.game.current_phase.clone();

            if let Some(expected) = expected_actor(&phase, &locked.game.players) {
                if locked.game.forfeited_players.contains(&expected) {
                    match self.plugin.on_player_forfeit(&locked.game.game_data, &phase, &expected, &locked.game.players) {
                        Some(result) => {
                            self.apply_result(locked, result).await?;
                            steps += 1;
                            if steps > MAX_AUTO_RESOLVE_STEPS {
                                tracing::warn!(match_id = ?self.match_id, "forfeit-skip loop exceeded safety cap");
                                return Ok(());
                            }
                            continue;
                        }
                        None => {
                            tracing::warn!(match_id = ?self.match_id, player = ?expected, "plugin declined to skip forfeited player's turn");
                            return Ok(());
                        }
                    }
                }
            }

            if !phase.auto_resolve {
                return Ok(());
            }

            steps += 1;
            if steps > MAX_AUTO_RESOLVE_STEPS {
                tracing::warn!(match_id = ?self.match_id, "auto-resolve loop exceeded safety cap");
                return Ok(());
            }

            let actor = expected_actor(&phase, &locked.game.players).unwrap_or_else(|| PlayerId("system".into()));
            let synthetic = Action::new(phase.name.clone(), actor, Value::Null);
            let result = self.plugin.apply_action(&locked.game.game_data, &phase, &synthetic, &locked.game.players)?;
            self.apply_result(locked, result).await?;
        }
    }

    fn next_actor_is_bot(game: &GameState) -> bool {
        if !matches!(game.status, GameStatus::Active) {
            return false;
        }
        expected_actor(&game.current_phase, &game.players)
            .and_then(|id| game.players.by_id(&id).cloned())
            .map(|p| p.is_bot)
            .unwrap_or(false)
    }

    pub async fn handle_player_disconnect(self: &Arc<Self>, player_id: PlayerId) -> Result<(), SessionError> {
        {
            let mut guard = self.locked.lock().await;
            if !guard.game.players.contains(&player_id) {
                return Err(SessionError::InvalidPlayers(format!(
                    "{player_id:?} is not seated in this match"
                )));
            }
            guard.game.disconnected_players.insert(player_id.clone(), unix_timestamp_seconds());
            guard.game.check_invariants()?;
            self.append_lifecycle_event(&mut guard, "player_disconnected", Some(player_id.clone()), Value::Null)
                .await?;
            self.state_store.save_state(&guard.game).await?;
            self.broadcast(&guard.game).await;
        }
        self.transport.send_player_disconnected(&player_id, self.grace_period.as_secs()).await;
        self.start_grace_timer(player_id, self.grace_period).await;
        Ok(())
    }

    pub async fn handle_player_reconnect(self: &Arc<Self>, player_id: PlayerId) -> Result<(), SessionError> {
        {
            let mut timers = self.disconnect_timers.lock().await;
            if let Some(handle) = timers.remove(&player_id) {
                handle.abort();
            }
        }

        let mut guard = self.locked.lock().await;
        if guard.game.disconnected_players.remove(&player_id).is_none() {
            return Ok(());
        }
        self.append_lifecycle_event(&mut guard, "player_reconnected", Some(player_id.clone()), Value::Null).await?;
        self.state_store.save_state(&guard.game).await?;
        self.broadcast(&guard.game).await;
        drop(guard);
        self.transport.send_player_reconnected(&player_id).await;
        Ok(())
    }

    async fn start_grace_timer(self: &Arc<Self>, player_id: PlayerId, grace: Duration) {
        let session = Arc::clone(self);
        let timer_player = player_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            session.handle_grace_expiry(timer_player).await;
        });
        let mut timers = self.disconnect_timers.lock().await;
        if let Some(old) = timers.insert(player_id, handle) {
            old.abort();
        }
    }

    async fn handle_grace_expiry(self: Arc<Self>, player_id: PlayerId) {
        let mut guard = self.locked.lock().await;
        if !matches!(guard.game.status, GameStatus::Active) {
            return;
        }
        if !guard.game.disconnected_players.contains_key(&player_id) {
            return;
        }
        if let Err(err) = self.apply_disconnect_policy(&mut guard, player_id.clone()).await {
            tracing::error!(match_id = ?self.match_id, ?player_id, error = %err, "grace expiry policy failed");
        }
    }

    async fn apply_disconnect_policy(&self, locked: &mut Locked, player_id: PlayerId) -> Result<(), SessionError> {
        locked.game.disconnected_players.remove(&player_id);

        let forfeited: HashSet<PlayerId> = locked.game.forfeited_players.iter().cloned().collect();
        let active: Vec<PlayerId> = locked
            .game
            .players
            .iter()
            .map(|p| p.player_id.clone())
            .filter(|id| id != &player_id && !forfeited.contains(id))
            .collect();

        if active.len() >= 2 {
            match self.plugin.metadata().disconnect_policy {
                DisconnectPolicy::ForfeitPlayer => {
                    self.mark_forfeited(locked, player_id).await?;
                    self.run_auto_resolve_and_forfeit_skip(locked).await?;
                }
                DisconnectPolicy::AbandonAll => {
                    let result = GameResult {
                        winners: vec![],
                        final_scores: locked.game.scores.clone(),
                        reason: GameResultReason::Abandonment,
                    };
                    self.finish_game(locked, result).await?;
                }
            }
        } else if active.len() == 1 {
            self.mark_forfeited(locked, player_id).await?;
            let result = GameResult {
                winners: vec![active[0].clone()],
                final_scores: locked.game.scores.clone(),
                reason: GameResultReason::Forfeit,
            };
            self.finish_game(locked, result).await?;
        } else {
            let result = GameResult {
                winners: vec![],
                final_scores: locked.game.scores.clone(),
                reason: GameResultReason::Abandonment,
            };
            self.finish_game(locked, result).await?;
        }
        Ok(())
    }

    async fn mark_forfeited(&self, locked: &mut Locked, player_id: PlayerId) -> Result<(), SessionError> {
        locked.game.forfeited_players.push(player_id.clone());
        locked.game.check_invariants()?;
        self.append_lifecycle_event(locked, "player_forfeited", Some(player_id.clone()), Value::Null).await?;
        self.state_store.save_state(&locked.game).await?;
        self.broadcast(&locked.game).await;
        self.transport.send_player_forfeited(&player_id).await;
        Ok(())
    }

    /// Sets terminal status, overlays final scores, persists, broadcasts
    /// `game_over`, and cancels every outstanding disconnect timer. This is
    /// also where the match record that tracks end-time/per-player result
    /// gets its last write — `state_store.save_state` with a terminal
    /// `status` and populated `scores` is the whole of that sync, since this
    /// workspace doesn't carry a match-summary table separate from state.
    async fn finish_game(&self, locked: &mut Locked, result: GameResult) -> Result<(), SessionError> {
        locked.game.status = match result.reason {
            GameResultReason::Abandonment => GameStatus::Abandoned,
            _ => GameStatus::Finished,
        };
        for (player_id, score) in &result.final_scores {
            locked.game.scores.insert(player_id.clone(), *score);
        }
        self.state_store.save_state(&locked.game).await?;
        self.broadcast(&locked.game).await;
        self.transport.send_game_over(&result).await;
        self.cancel_all_timers().await;
        Ok(())
    }

    async fn cancel_all_timers(&self) {
        let mut timers = self.disconnect_timers.lock().await;
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    /// Ends the match bypassing plugin logic entirely — an escape hatch for
    /// an operator who needs to force-finish a match with no well-defined
    /// outcome.
    pub async fn force_finish(self: &Arc<Self>) -> Result<(), SessionError> {
        let mut guard = self.locked.lock().await;
        let result = GameResult {
            winners: vec![],
            final_scores: guard.game.scores.clone(),
            reason: GameResultReason::AdminTerminated,
        };
        self.finish_game(&mut guard, result).await
    }
}

pub(crate) fn expected_actor(phase: &Phase, players: &PlayerSet) -> Option<PlayerId> {
    if let Some(expected) = phase.expected_actions.first() {
        if let Some(player_id) = &expected.player_id {
            return Some(player_id.clone());
        }
    }
    phase.metadata_player_index().and_then(|idx| players.by_seat(idx as u32)).map(|p| p.player_id.clone())
}

fn error_kind(err: &SessionError) -> &'static str {
    match err {
        SessionError::InvalidAction(_) => "invalid_action",
        SessionError::NotYourTurn { .. } => "not_your_turn",
        SessionError::GameNotActive(_) => "game_not_active",
        SessionError::PlayerForfeited(_) => "player_forfeited",
        SessionError::PluginError(_) => "plugin_error",
        SessionError::PersistenceError(_) => "persistence_error",
        SessionError::InvalidPlayers(_) => "invalid_players",
        SessionError::UnsupportedConcurrentMode(_) => "unsupported_concurrent_mode",
        SessionError::UnknownBot(_) => "unknown_bot",
        SessionError::NotFound(_) => "not_found",
    }
}

fn unix_timestamp_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
