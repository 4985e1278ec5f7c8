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

//! Reloading of zones when their zone files change.
//!
//! [`spawn`] starts a task that watches the directory holding a zone's
//! file and calls [`Zone::reload`] whenever the file is created or
//! modified. Since reloads are gated on the SOA serial, edits that do
//! not increment the serial are not picked up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::zone::Zone;

/// The number of file system events that may be queued before the
/// notifier thread blocks.
const EVENT_QUEUE_LEN: usize = 64;

/// Starts watching `zone`'s file. The watch is in place when this
/// returns; must be called within a Tokio runtime.
///
/// A failure to set up the watch, or an error reported by the watch
/// later on, is logged and ends the returned task. Other zones are not
/// affected.
pub fn spawn(zone: Arc<Zone>) -> JoinHandle<()> {
    let (sender, receiver) = mpsc::channel(EVENT_QUEUE_LEN);
    let watcher = match watch_directory_of(zone.path(), sender) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            error!(
                "Zone {}: cannot watch {}: {e}",
                zone.origin(),
                zone.path().display()
            );
            None
        }
    };
    tokio::spawn(async move {
        if let Some(watcher) = watcher {
            run(zone, watcher, receiver).await;
        }
    })
}

fn watch_directory_of(
    path: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
) -> notify::Result<RecommendedWatcher> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // An error means the receiving task is gone.
        let _ = sender.blocking_send(res);
    })?;
    watcher.watch(directory, RecursiveMode::NonRecursive)?;
    debug!("Watching {} for changes.", directory.display());
    Ok(watcher)
}

/// The watch loop. `_watcher` is held so that the watch lasts as long
/// as the loop.
async fn run(
    zone: Arc<Zone>,
    _watcher: RecommendedWatcher,
    mut events: mpsc::Receiver<notify::Result<Event>>,
) {
    let target = canonical(zone.path());
    while let Some(res) = events.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                error!("Zone {}: watch failed: {e}", zone.origin());
                return;
            }
        };
        if !changes(&event, &target) {
            continue;
        }

        let reloading = zone.clone();
        match tokio::task::spawn_blocking(move || reloading.reload()).await {
            Ok(Ok(outcome)) => info!("Zone {}: {outcome}.", zone.origin()),
            Ok(Err(e)) => warn!("Zone {}: reload failed, keeping current data: {e}", zone.origin()),
            Err(e) => {
                error!("Zone {}: reload task failed: {e}", zone.origin());
                return;
            }
        }
    }
}

/// Returns whether `event` creates or modifies the file at `target`.
fn changes(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path == target || canonical(path) == target)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_owned())
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
