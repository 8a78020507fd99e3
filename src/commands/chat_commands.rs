use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::chat::{ChatAction, ChatReply};
use crate::models::file_entry::FileEntry;
use crate::services::ai_service::CallOptions;
use crate::services::organize_service::{self, ActionOutcome};
use crate::services::{file_service, prompt_service, response_service};
use crate::state::AppState;

const CHAT_MAX_TOKENS: u32 = 1000;

/// Answer one user message. The desktop listing is read fresh on every call
/// as ambient context; an unreadable desktop degrades to no context rather
/// than failing the chat.
pub async fn chat(state: &AppState, message: &str) -> Result<ChatReply, AppError> {
    debug!("chat message: {message}");

    let desktop_files: Vec<FileEntry> = match file_service::list_directory(&state.desktop_root) {
        Ok(entries) => entries.into_iter().filter(|f| f.is_file).collect(),
        Err(err) => {
            warn!("could not read desktop for chat context: {err}");
            Vec::new()
        }
    };

    let prompt = prompt_service::build_chat_prompt(message, &desktop_files);
    let options = CallOptions {
        max_tokens: Some(CHAT_MAX_TOKENS),
        ..CallOptions::default()
    };
    let raw = state.ai.call(&prompt, options).await?;

    Ok(response_service::parse_chat_reply(&raw))
}

/// Execute an action the model attached to a chat reply.
pub async fn run_action(
    state: &AppState,
    action: &ChatAction,
) -> Result<ActionOutcome, AppError> {
    organize_service::dispatch(&state.ai, action, &state.desktop_root).await
}
