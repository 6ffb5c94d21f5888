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

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Runs a demo multiplayer session over the in-process game-agnostic engine")]
pub struct CommandLineParser {
    /// Path to a config file (TOML/JSON/YAML, extension-detected), without
    /// the extension; layered under built-in defaults and SERVER_* env vars.
    #[arg(long)]
    pub config: Option<String>,

    /// `game_id` to demo; must be a plugin this binary registers.
    #[arg(long, default_value = "tictactoe")]
    pub game_id: String,

    /// Bot preset for seat 0.
    #[arg(long, default_value = "medium")]
    pub bot_a: String,

    /// Bot preset for seat 1.
    #[arg(long, default_value = "random")]
    pub bot_b: String,
}
