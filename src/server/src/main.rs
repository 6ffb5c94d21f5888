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

//! Demo binary: wires a [`SessionManager`] over the in-process engine, loads
//! settings, recovers any matches an in-memory store can't actually have,
//! then plays one bot-vs-bot match end to end and logs the result. A real
//! deployment swaps [`LoggingTransport`] and the store adapter for a
//! WebSocket/HTTP layer and `SqliteStore`; everything it would call through
//! is already exercised here.

mod command_line_parser;
mod config;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use bots::BotRegistry;
use clap::Parser;
use gamecore::model::{GameConfig, GameId, GameStatus, MatchId, Player, PlayerId};
use session::{LoggingTransport, PluginRegistry, SessionManager};
use store::{EventStore, StateStore};
use tictactoe::TicTacToePlugin;
use tracing::info;

use crate::command_line_parser::CommandLineParser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    logging::initialize();

    let args = CommandLineParser::parse();
    let settings = config::ServerConfig::load(args.config.as_deref())?;

    let mut plugins = PluginRegistry::empty();
    plugins.register(Arc::new(TicTacToePlugin));

    let (event_store, state_store): (Arc<dyn EventStore>, Arc<dyn StateStore>) =
        match &settings.sqlite_path {
            Some(path) => {
                let store = Arc::new(store::sqlite::SqliteStore::open(path)?);
                (store.clone(), store)
            }
            None => (
                Arc::new(store::memory::MemoryEventStore::new()),
                Arc::new(store::memory::MemoryStateStore::new()),
            ),
        };

    let manager = SessionManager::new(
        plugins,
        event_store,
        state_store,
        Arc::new(LoggingTransport),
        Arc::new(BotRegistry::with_defaults()),
        settings.grace_period(),
        settings.stale_after(),
    );

    let recovered = manager.recover().await?;
    info!(recovered, "recovered active matches from the previous run");

    let players = vec![
        Player {
            player_id: PlayerId("bot-a".into()),
            display_name: format!("bot:{}", args.bot_a),
            seat_index: 0,
            is_bot: true,
            bot_id: Some(args.bot_a.clone()),
        },
        Player {
            player_id: PlayerId("bot-b".into()),
            display_name: format!("bot:{}", args.bot_b),
            seat_index: 1,
            is_bot: true,
            bot_id: Some(args.bot_b.clone()),
        },
    ];

    let match_id = MatchId(format!("demo-{}", args.game_id));
    let session = manager
        .create(match_id, GameId(args.game_id), players, GameConfig::default())
        .await?;

    // `SessionManager::create` already scheduled seat 0's opening move; each
    // `handle_action` call schedules whichever bot is expected next, so the
    // match plays itself out. Poll until it settles.
    loop {
        let snapshot = session.snapshot().await;
        if !matches!(snapshot.status, GameStatus::Active) {
            info!(
                status = ?snapshot.status,
                forfeited = ?snapshot.forfeited_players,
                scores = ?snapshot.scores,
                "demo match finished"
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}
