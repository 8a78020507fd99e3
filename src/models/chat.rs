use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Action types the chat protocol understands. Anything else deserializes
/// to `Unknown` and is ignored at dispatch rather than failing the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ActionKind {
    OrganizeDesktop,
    FindFiles,
    CleanDuplicates,
    Unknown,
}

impl From<String> for ActionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "organize_desktop" => Self::OrganizeDesktop,
            "find_files" => Self::FindFiles,
            "clean_duplicates" => Self::CleanDuplicates,
            _ => Self::Unknown,
        }
    }
}

/// A structured action request embedded in a chat reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// A natural-language response, optionally paired with one action request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub action: Option<ChatAction>,
}

impl ChatReply {
    /// Plain-text reply with no action attached.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action: None,
        }
    }
}
