use std::path::Path;
use std::time::Duration;

use notify_debouncer_mini::notify;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use serde::Serialize;
use tracing::warn;

use crate::error::AppError;

/// Events settle for this long before being reported, so a file still being
/// written does not fire a burst of notifications.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Updated,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
    pub name: String,
    pub timestamp: String,
}

/// Keeps the underlying watcher alive; dropping it stops the watch.
pub struct WatcherHandle {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

/// Watch one directory level for changes. Hidden entries are ignored and
/// events are debounced; each surviving event is handed to `on_change`.
pub fn start_watching<F>(directory: &Path, on_change: F) -> Result<WatcherHandle, AppError>
where
    F: Fn(FileChangeEvent) + Send + 'static,
{
    if !directory.is_dir() {
        return Err(AppError::Watcher(format!(
            "not a directory: {}",
            directory.display()
        )));
    }

    let mut debouncer = new_debouncer(
        DEBOUNCE_DELAY,
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    if !matches!(
                        event.kind,
                        DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                    ) {
                        continue;
                    }
                    let name = event
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    if name.is_empty() || name.starts_with('.') {
                        continue;
                    }
                    let kind = if event.path.exists() {
                        ChangeKind::Updated
                    } else {
                        ChangeKind::Removed
                    };
                    on_change(FileChangeEvent {
                        kind,
                        path: event.path.to_string_lossy().to_string(),
                        name,
                        timestamp: chrono::Utc::now().to_rfc3339(),
                    });
                }
            }
            Err(err) => {
                warn!("watcher error: {err:?}");
            }
        },
    )
    .map_err(|err| AppError::Watcher(err.to_string()))?;

    debouncer
        .watcher()
        .watch(directory, notify::RecursiveMode::NonRecursive)
        .map_err(|err| AppError::Watcher(err.to_string()))?;

    Ok(WatcherHandle {
        _debouncer: debouncer,
    })
}
