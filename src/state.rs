use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::AppConfig;
use crate::services::ai_service::AiService;
use crate::services::watcher_service::WatcherHandle;

/// Long-lived application state owned by the shell for the lifetime of the
/// process. The config mutex guards persisted settings; the AI client keeps
/// its own snapshot and is refreshed through `reconfigure`.
pub struct AppState {
    pub config_path: PathBuf,
    pub desktop_root: PathBuf,
    pub config: Mutex<AppConfig>,
    pub ai: AiService,
    pub watcher_handle: Mutex<Option<WatcherHandle>>,
}

impl AppState {
    /// Load persisted settings and wire up the client against them.
    pub fn new(config_path: PathBuf, desktop_root: PathBuf) -> Self {
        let config = crate::config::load(&config_path);
        let ai = AiService::new(&config);
        Self {
            config_path,
            desktop_root,
            config: Mutex::new(config),
            ai,
            watcher_handle: Mutex::new(None),
        }
    }
}
