// Copyright (c) 2026 BSS Map Helper Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Parser;

/// Map parser tool to list BSS symbols by size.
#[derive(Parser, Debug)]
#[command(name = "bss-map-helper", version, about)]
pub struct Cli {
    /// Input map file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Do not print symbols with size below this value
    #[arg(short = 'm', long = "min", default_value_t = 0)]
    pub min: u64,

    /// Add hex format for sizes
    #[arg(short = 'x', long = "hexa", default_value_t = false)]
    pub hexa: bool,

    /// List SDK symbols
    #[arg(short = 's', long = "sdk", default_value_t = false)]
    pub sdk: bool,

    /// Emit the parsed symbol table as JSON instead of the text report
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    pub debug: bool,
}
