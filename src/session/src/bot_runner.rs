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

//! Schedules a bot's move after a small human-like delay, the way a human
//! opponent wouldn't respond instantly. Errors are logged and swallowed —
//! a bot move is best-effort; a player's own actions are never blocked on it.

use std::sync::Arc;
use std::time::Duration;

use gamecore::model::{Action, GameStatus};
use rand::Rng;

use crate::game_session::{expected_actor, GameSession};

pub struct BotRunner;

impl BotRunner {
    /// Fire-and-forget: spawns a task that waits, re-checks that a bot is
    /// still expected to move, and submits its chosen action through the
    /// normal `handle_action` path so it is validated exactly like a human's.
    pub fn schedule_bot_move_if_needed(session: Arc<GameSession>) {
        tokio::spawn(async move {
            let delay_ms = rand::thread_rng().gen_range(500..=1500);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            let game = session.snapshot().await;
            if !matches!(game.status, GameStatus::Active) {
                return;
            }
            let Some(actor_id) = expected_actor(&game.current_phase, &game.players) else {
                return;
            };
            let Some(player) = game.players.by_id(&actor_id) else {
                return;
            };
            if !player.is_bot {
                return;
            }
            let Some(bot_id) = player.bot_id.clone() else {
                return;
            };

            let strategy = match session.bot_registry().create(&bot_id) {
                Ok(strategy) => strategy,
                Err(err) => {
                    tracing::error!(match_id = ?session.match_id(), bot_id, error = %err, "unknown bot id, cannot move");
                    return;
                }
            };

            let payload = match strategy.choose_action(
                &game.game_data,
                &game.current_phase,
                &actor_id,
                session.plugin().as_ref(),
                &game.players,
            ) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!(match_id = ?session.match_id(), ?actor_id, error = %err, "bot strategy failed to choose an action");
                    return;
                }
            };

            let action_type = game
                .current_phase
                .expected_actions
                .first()
                .map(|expected| expected.action_type.clone())
                .unwrap_or_else(|| game.current_phase.name.clone());
            let action = Action::new(action_type, actor_id.clone(), payload);

            if let Err(err) = session.handle_action(action).await {
                tracing::error!(match_id = ?session.match_id(), ?actor_id, error = %err, "bot move rejected");
            }
        });
    }
}
