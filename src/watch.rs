//! File system watcher for `check --watch`.
//!
//! Monitors the content, shortcode and static directories and the config
//! file, and re-runs validation after changes settle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────┐    ┌──────────┐    ┌────────────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│    handle_changes()    │  │
//! │  │ events   │    │ (300ms)  │    │                        │  │
//! │  └──────────┘    └──────────┘    │  config: reload, clear │  │
//! │                                  │          parse cache   │  │
//! │                                  │  other:  re-check,     │  │
//! │                                  │          cache reused  │  │
//! │                                  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::{
    check::check_once,
    config::SiteConfig,
    content::ParseCache,
    log,
    utils::category::{FileCategory, categorize_path, is_temp_file},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<PathBuf> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// What a batch of changed paths requires.
#[derive(Debug, Default, PartialEq, Eq)]
struct Changes {
    config: bool,
    /// Changed files other than the config, relative to the root.
    files: Vec<String>,
}

fn classify(paths: &[PathBuf], config: &SiteConfig) -> Changes {
    let root = config.get_root();
    let mut changes = Changes::default();

    for path in paths {
        match categorize_path(path, config) {
            FileCategory::Config => changes.config = true,
            FileCategory::Content | FileCategory::Shortcodes | FileCategory::Static => {
                changes.files.push(rel_path(path, root))
            }
            FileCategory::Unknown => {}
        }
    }

    changes
}

/// Format path as relative for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Re-run the check for a batch of changes, reloading the config first when
/// it changed. Returns true when the watched locations may have moved.
fn handle_changes(
    paths: &[PathBuf],
    config: &mut SiteConfig,
    cache: &ParseCache,
    reload: &impl Fn() -> Result<SiteConfig>,
) -> bool {
    let changes = classify(paths, config);
    let mut rewatch = false;

    if changes.config {
        match reload() {
            Ok(fresh) => {
                log!("watch"; "config changed, re-checking everything");
                *config = fresh;
                cache.clear();
                rewatch = true;
            }
            Err(e) => {
                log!("watch"; "config reload failed, keeping previous config");
                log!("error"; "{e:#}");
                return false;
            }
        }
    } else if changes.files.is_empty() {
        return false;
    } else {
        log!(
            "watch";
            "{} changed, re-checking ({} parses cached)",
            changes.files.join(", "),
            cache.len()
        );
    }

    if let Err(e) = check_once(config, cache) {
        log!("error"; "{e:#}");
    }
    eprintln!(); // Blank line to separate check sessions
    rewatch
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Watched locations that currently exist, with their recursion mode.
fn watch_targets(config: &SiteConfig) -> Vec<(PathBuf, RecursiveMode)> {
    FileCategory::WATCHED
        .iter()
        .filter_map(|&cat| {
            let path = cat.path(config)?;
            let mode = if cat.is_directory() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            path.exists().then(|| (path.to_path_buf(), mode))
        })
        .collect()
}

fn setup_watchers(
    watcher: &mut impl Watcher,
    config: &SiteConfig,
) -> Result<Vec<PathBuf>> {
    let root = config.get_root();
    let mut watched = Vec::new();

    for (path, mode) in watch_targets(config) {
        watcher
            .watch(&path, mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        watched.push(path);
    }

    let names: Vec<String> = watched.iter().map(|p| rel_path(p, root)).collect();
    log!("watch"; "watching {}", names.join(", "));
    eprintln!(); // Blank line to separate init logs from change events
    Ok(watched)
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Block forever, re-checking the site after every settled batch of changes.
///
/// `reload` re-reads the configuration the same way startup did.
pub fn watch_for_changes_blocking(
    mut config: SiteConfig,
    cache: &ParseCache,
    reload: impl Fn() -> Result<SiteConfig>,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    let mut watched = setup_watchers(&mut watcher, &config)?;

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                if handle_changes(&debouncer.take(), &mut config, cache, &reload) {
                    for path in watched.drain(..) {
                        watcher.unwatch(&path).ok();
                    }
                    watched = setup_watchers(&mut watcher, &config)?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            // Irrelevant events, timeout without pending changes, etc.
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.set_root(dir);
        config.config_path = dir.join("quire.toml");
        config.content.dir = dir.join("content");
        config.content.static_dir = dir.join("static");
        config.content.shortcodes = dir.join("layouts/shortcodes");
        config
    }

    #[test]
    fn test_debouncer_filters_temp_files() {
        let mut debouncer = Debouncer::new();
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/c/a.md"))
            .add_path(PathBuf::from("/c/.a.md.swp"))
            .add_path(PathBuf::from("/c/a.md~"));
        debouncer.add(event);

        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_millis(DEBOUNCE_MS));
        assert_eq!(debouncer.take(), vec![PathBuf::from("/c/a.md")]);
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(&Event::new(EventKind::Modify(ModifyKind::Any))));
        assert!(!is_relevant(&Event::new(EventKind::Access(
            notify::event::AccessKind::Any
        ))));
    }

    #[test]
    fn test_classify() {
        let config = config_in(Path::new("/site"));
        let changes = classify(
            &[
                PathBuf::from("/site/content/posts/a.md"),
                PathBuf::from("/site/static/img.png"),
                PathBuf::from("/site/target/x"),
            ],
            &config,
        );
        assert!(!changes.config);
        assert_eq!(changes.files, vec!["content/posts/a.md", "static/img.png"]);

        let changes = classify(&[PathBuf::from("/site/quire.toml")], &config);
        assert!(changes.config);
    }

    #[test]
    fn test_watch_targets_skip_missing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("quire.toml"), "").unwrap();

        let targets = watch_targets(&config_in(dir.path()));
        let paths: Vec<&Path> = targets.iter().map(|(p, _)| p.as_path()).collect();
        assert_eq!(paths, vec![dir.path().join("content"), dir.path().join("quire.toml")]);
    }

    #[test]
    fn test_failed_reload_keeps_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        let cache = ParseCache::new();

        let rewatch = handle_changes(
            &[dir.path().join("quire.toml")],
            &mut config,
            &cache,
            &|| anyhow::bail!("broken"),
        );
        assert!(!rewatch);
        assert_eq!(config.content.dir, dir.path().join("content"));
    }
}
