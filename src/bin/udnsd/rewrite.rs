// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the `rewrite` command, which writes zone files back out
//! with their SOA serials incremented.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info};

use udns::zone::Zone;

use crate::args::RewriteArgs;
use crate::run::log_error_chain;

/// Rewrites each zone file given on the command line to `<file>new`.
pub fn run(args: RewriteArgs) {
    env_logger::init_from_env(Env::new().default_filter_or("info"));

    let mut failed = 0;
    for path in &args.files {
        match rewrite(path) {
            Ok(target) => info!("Wrote {}.", target.display()),
            Err(e) => {
                log_error_chain(&format!("Failed to rewrite {}:", path.display()), &e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        error!("{failed} of {} zone files failed.", args.files.len());
        process::exit(1);
    }
}

fn rewrite(path: &Path) -> Result<PathBuf> {
    let zone = Zone::load(path).context("failed to load the zone")?;
    zone.write_zone_file().context("failed to write the zone file")
}
