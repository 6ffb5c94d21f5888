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

//! The persistence contracts (`EventStore`, `StateStore`) plus two adapters:
//! an in-memory implementation for tests and single-process demos, and a
//! SQLite-backed one generalizing a single fixed-schema connection wrapper
//! into an opaque, `match_id`-keyed pair of tables.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use traits::{EventStore, StateStore};
