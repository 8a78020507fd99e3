use crate::config::{self, AppConfig, SettingsPatch};
use crate::error::AppError;
use crate::state::AppState;

pub fn get_settings(state: &AppState) -> AppConfig {
    state
        .config
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Overlay the patch, persist the whole config file, and refresh the AI
/// client so subsequent calls pick up the new values.
pub fn save_settings(state: &AppState, patch: &SettingsPatch) -> Result<AppConfig, AppError> {
    let mut guard = state
        .config
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.apply(patch);
    config::save(&state.config_path, &guard)?;
    state.ai.reconfigure(&guard);
    Ok(guard.clone())
}
