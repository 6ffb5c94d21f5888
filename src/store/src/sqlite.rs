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

//! SQLite-backed adapter. Generalizes an `Arc<Mutex<Connection>>`
//! smart-pointer pattern and JSON-blob columns from a single fixed
//! `GameState`/`UserState` pair to the opaque `match_id`-keyed contracts in
//! [`crate::traits`]. `rusqlite` is synchronous, so every query runs inside
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gamecore::error::SessionError;
use gamecore::model::{GameState, GameStatus, MatchId, PersistedEvent};
use rusqlite::{params, Connection, OptionalExtension};

use crate::traits::{EventStore, StateStore};

/// A single connection shared by both the event log and the state table.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let connection = Connection::open(path.as_ref())
            .map_err(|err| SessionError::PersistenceError(format!("opening sqlite store: {err}")))?;

        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS match_events (
                   match_id        TEXT NOT NULL,
                   sequence_number INTEGER NOT NULL,
                   event_type      TEXT NOT NULL,
                   player_id       TEXT,
                   payload         BLOB NOT NULL,
                   timestamp       REAL NOT NULL,
                   PRIMARY KEY (match_id, sequence_number)
                 ) STRICT;
                 CREATE TABLE IF NOT EXISTS match_states (
                   match_id TEXT PRIMARY KEY,
                   status   TEXT NOT NULL,
                   data     BLOB NOT NULL
                 ) STRICT;",
            )
            .map_err(|err| SessionError::PersistenceError(format!("creating sqlite tables: {err}")))?;

        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SessionError> {
        self.connection
            .lock()
            .map_err(|_| SessionError::PersistenceError("sqlite connection lock poisoned".into()))
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn append_events(&self, match_id: &MatchId, events: &[PersistedEvent]) -> Result<(), SessionError> {
        let store = self.clone();
        let match_id = match_id.clone();
        let events = events.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut conn = store.lock()?;
            let tx = conn
                .transaction()
                .map_err(|err| SessionError::PersistenceError(format!("starting transaction: {err}")))?;
            for event in &events {
                let payload = serde_json::to_vec(&event.payload)
                    .map_err(|err| SessionError::PersistenceError(format!("serializing event payload: {err}")))?;
                tx.execute(
                    "INSERT INTO match_events (match_id, sequence_number, event_type, player_id, payload, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        match_id.as_str(),
                        event.sequence_number as i64,
                        event.event_type,
                        event.player_id.as_ref().map(|p| p.as_str().to_string()),
                        payload,
                        event.timestamp,
                    ],
                )
                .map_err(|err| SessionError::PersistenceError(format!("appending event: {err}")))?;
            }
            tx.commit().map_err(|err| SessionError::PersistenceError(format!("committing transaction: {err}")))
        })
        .await
        .map_err(|err| SessionError::PersistenceError(format!("blocking task panicked: {err}")))?
    }

    async fn get_events(&self, match_id: &MatchId, from_sequence: u64) -> Result<Vec<PersistedEvent>, SessionError> {
        let store = self.clone();
        let match_id = match_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.lock()?;
            let mut stmt = conn
                .prepare(
                    "SELECT sequence_number, event_type, player_id, payload, timestamp
                     FROM match_events WHERE match_id = ?1 AND sequence_number >= ?2
                     ORDER BY sequence_number ASC",
                )
                .map_err(|err| SessionError::PersistenceError(format!("preparing query: {err}")))?;

            let rows = stmt
                .query_map(params![match_id.as_str(), from_sequence as i64], |row| {
                    let sequence_number: i64 = row.get(0)?;
                    let event_type: String = row.get(1)?;
                    let player_id: Option<String> = row.get(2)?;
                    let payload: Vec<u8> = row.get(3)?;
                    let timestamp: f64 = row.get(4)?;
                    Ok((sequence_number, event_type, player_id, payload, timestamp))
                })
                .map_err(|err| SessionError::PersistenceError(format!("running query: {err}")))?;

            let mut events = Vec::new();
            for row in rows {
                let (sequence_number, event_type, player_id, payload, timestamp) =
                    row.map_err(|err| SessionError::PersistenceError(format!("reading row: {err}")))?;
                let payload = serde_json::from_slice(&payload)
                    .map_err(|err| SessionError::PersistenceError(format!("deserializing event payload: {err}")))?;
                events.push(PersistedEvent {
                    match_id: match_id.clone(),
                    sequence_number: sequence_number as u64,
                    event_type,
                    player_id: player_id.map(Into::into),
                    payload,
                    timestamp,
                });
            }
            Ok(events)
        })
        .await
        .map_err(|err| SessionError::PersistenceError(format!("blocking task panicked: {err}")))?
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn save_state(&self, state: &GameState) -> Result<(), SessionError> {
        let store = self.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.lock()?;
            let data = serde_json::to_vec(&state)
                .map_err(|err| SessionError::PersistenceError(format!("serializing state: {err}")))?;
            let status = status_label(state.status);
            conn.execute(
                "INSERT INTO match_states (match_id, status, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(match_id) DO UPDATE SET status = ?2, data = ?3",
                params![state.match_id.as_str(), status, data],
            )
            .map_err(|err| SessionError::PersistenceError(format!("writing state: {err}")))?;
            Ok(())
        })
        .await
        .map_err(|err| SessionError::PersistenceError(format!("blocking task panicked: {err}")))?
    }

    async fn load_state(&self, match_id: &MatchId) -> Result<Option<GameState>, SessionError> {
        let store = self.clone();
        let match_id = match_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.lock()?;
            let data: Option<Vec<u8>> = conn
                .query_row("SELECT data FROM match_states WHERE match_id = ?1", params![match_id.as_str()], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|err| SessionError::PersistenceError(format!("loading state: {err}")))?;
            data.map(|data| {
                serde_json::from_slice(&data)
                    .map_err(|err| SessionError::PersistenceError(format!("deserializing state: {err}")))
            })
            .transpose()
        })
        .await
        .map_err(|err| SessionError::PersistenceError(format!("blocking task panicked: {err}")))?
    }

    async fn delete_state(&self, match_id: &MatchId) -> Result<(), SessionError> {
        let store = self.clone();
        let match_id = match_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.lock()?;
            conn.execute("DELETE FROM match_states WHERE match_id = ?1", params![match_id.as_str()])
                .map_err(|err| SessionError::PersistenceError(format!("deleting state: {err}")))?;
            Ok(())
        })
        .await
        .map_err(|err| SessionError::PersistenceError(format!("blocking task panicked: {err}")))?
    }

    async fn list_active_matches(&self) -> Result<Vec<MatchId>, SessionError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.lock()?;
            let mut stmt = conn
                .prepare("SELECT match_id FROM match_states WHERE status = ?1")
                .map_err(|err| SessionError::PersistenceError(format!("preparing query: {err}")))?;
            let rows = stmt
                .query_map(params![status_label(GameStatus::Active)], |row| row.get::<_, String>(0))
                .map_err(|err| SessionError::PersistenceError(format!("running query: {err}")))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(MatchId::from(row.map_err(|err| {
                    SessionError::PersistenceError(format!("reading row: {err}"))
                })?));
            }
            Ok(ids)
        })
        .await
        .map_err(|err| SessionError::PersistenceError(format!("blocking task panicked: {err}")))?
    }
}

fn status_label(status: GameStatus) -> &'static str {
    match status {
        GameStatus::Active => "active",
        GameStatus::Paused => "paused",
        GameStatus::Finished => "finished",
        GameStatus::Abandoned => "abandoned",
    }
}
