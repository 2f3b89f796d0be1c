//! File-system watch loop.
//!
//! Recursive watch of a target directory, filtered to modify events on
//! watched source extensions, debounced, and strictly serialized: analysis
//! cycles run inline on the loop's own thread, so at most one analyzer
//! invocation is ever in flight and events arriving mid-cycle queue in the
//! channel for the next cycle.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Message type delivered by the notify subscription.
pub type EventMessage = Result<Event, notify::Error>;

/// Configuration for watch mode.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory to watch recursively.
    pub root: PathBuf,
    /// Source-file extensions (without dot) that trigger re-analysis.
    pub extensions: Vec<String>,
    /// Quiet period after the last qualifying event before a cycle runs.
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: vec!["dart".to_string()],
            debounce: Duration::from_millis(250),
        }
    }
}

impl WatchConfig {
    /// Check if a path has a watched source extension.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|w| w == ext))
    }
}

/// Debounce state owned by the watch loop: the set of changed paths since
/// the last flush and the deadline at which they are flushed. Reset after
/// each cycle.
#[derive(Debug, Default)]
struct WatchState {
    pending: BTreeSet<PathBuf>,
    deadline: Option<Instant>,
}

impl WatchState {
    /// Record a qualifying change and restart the debounce timer.
    fn note(&mut self, path: PathBuf, debounce: Duration) {
        self.pending.insert(path);
        self.deadline = Some(Instant::now() + debounce);
    }

    /// Take the coalesced change set and reset.
    fn drain(&mut self) -> Vec<PathBuf> {
        self.deadline = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

/// The watch-and-analyze control loop.
///
/// Drains a channel of file-system events on a single sequencing thread.
/// The loop ends only when the event channel disconnects.
pub struct WatchLoop {
    config: WatchConfig,
    rx: Receiver<EventMessage>,
    // Keeps the subscription alive for the loop's lifetime. None when the
    // loop is driven from an external channel (tests).
    _watcher: Option<RecommendedWatcher>,
    state: WatchState,
}

impl WatchLoop {
    /// Subscribe to recursive change notifications under the config root.
    ///
    /// A failure to start watching at all (inaccessible directory) is the
    /// one error allowed to abort watch mode.
    pub fn subscribe(config: WatchConfig) -> Result<Self, notify::Error> {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: EventMessage| {
                // Receiver may have dropped on shutdown
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&config.root, RecursiveMode::Recursive)?;

        Ok(Self {
            config,
            rx,
            _watcher: Some(watcher),
            state: WatchState::default(),
        })
    }

    /// Drive the loop from an explicit event channel, without a file-system
    /// subscription.
    pub fn from_channel(config: WatchConfig, rx: Receiver<EventMessage>) -> Self {
        Self {
            config,
            rx,
            _watcher: None,
            state: WatchState::default(),
        }
    }

    /// Run until the event channel disconnects.
    ///
    /// `cycle` is invoked once per debounce flush with the coalesced set of
    /// changed paths, inline on this thread - never concurrently. Pending
    /// changes still buffered at disconnect get one final cycle.
    pub fn run<F: FnMut(&[PathBuf])>(mut self, mut cycle: F) {
        loop {
            let message = match self.state.deadline {
                None => match self.rx.recv() {
                    Ok(m) => m,
                    Err(_) => break,
                },
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let changed = self.state.drain();
                        cycle(&changed);
                        continue;
                    }
                    match self.rx.recv_timeout(deadline - now) {
                        Ok(m) => m,
                        Err(RecvTimeoutError::Timeout) => {
                            let changed = self.state.drain();
                            cycle(&changed);
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            };

            if let Ok(event) = message {
                self.absorb(event);
            }
        }

        if !self.state.pending.is_empty() {
            let changed = self.state.drain();
            cycle(&changed);
        }
    }

    /// Fold one file-system event into the debounce state. Only modify
    /// events on watched extensions qualify; everything else is ignored.
    fn absorb(&mut self, event: Event) {
        if !matches!(event.kind, EventKind::Modify(_)) {
            return;
        }
        for path in event.paths {
            if self.config.matches_extension(&path) {
                self.state.note(path, self.config.debounce);
            }
        }
    }
}

impl std::fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchLoop")
            .field("config", &self.config)
            .field("subscribed", &self._watcher.is_some())
            .field("pending", &self.state.pending.len())
            .finish()
    }
}
