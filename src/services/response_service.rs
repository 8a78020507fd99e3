use serde_json::Value;
use tracing::debug;

use crate::error::AppError;
use crate::models::chat::{ChatAction, ChatReply};
use crate::models::organize::ClassificationPlan;

/// Label used when a model-proposed folder name sanitizes down to nothing.
const FALLBACK_FOLDER: &str = "uncategorized";

/// Strip one leading ```` ```json ````/```` ``` ```` fence and one trailing
/// ```` ``` ```` fence, then trim. Models frequently wrap the requested JSON
/// in a markdown code block even when told not to.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if text
        .get(..7)
        .is_some_and(|head| head.eq_ignore_ascii_case("```json"))
    {
        text = text[7..].trim_start();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text.to_string()
}

/// Replace characters that are illegal in folder names on common file
/// systems, then trim. Plan folder names become real directory names.
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a model response into a classification plan. Strict: a response
/// without a `folders` array is a parse error and the caller must re-issue
/// a fresh request, not resend the same text.
pub fn parse_classification(raw: &str) -> Result<ClassificationPlan, AppError> {
    let text = strip_code_fences(raw);
    let mut plan: ClassificationPlan = serde_json::from_str(&text)
        .map_err(|err| AppError::Parse(format!("malformed classification response: {err}")))?;

    for folder in &mut plan.folders {
        let name = sanitize_folder_name(&folder.name);
        folder.name = if name.is_empty() {
            FALLBACK_FOLDER.to_string()
        } else {
            name
        };
    }

    Ok(plan)
}

/// Parse a model response into a chat reply. Never fails: anything that is
/// not a JSON object carrying a `message` string becomes a plain-text reply.
pub fn parse_chat_reply(raw: &str) -> ChatReply {
    let text = strip_code_fences(raw);

    let Ok(value) = serde_json::from_str::<Value>(&text) else {
        return ChatReply::text(raw);
    };

    let message = value
        .as_object()
        .and_then(|obj| obj.get("message"))
        .and_then(Value::as_str);

    match message {
        Some(message) => {
            let action = value.get("action").and_then(parse_action);
            ChatReply {
                message: message.to_string(),
                action,
            }
        }
        // Valid JSON, wrong shape: surface the value itself as text.
        None => ChatReply::text(value.to_string()),
    }
}

fn parse_action(value: &Value) -> Option<ChatAction> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<ChatAction>(value.clone()) {
        Ok(action) => Some(action),
        Err(err) => {
            debug!("discarding malformed action payload: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ActionKind;

    #[test]
    fn strips_json_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\":1}\n```"),
            "{\"a\":1}"
        );
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```JSON\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn parse_classification_strips_fences() {
        let plan = parse_classification("```json\n{\"folders\":[],\"summary\":\"x\"}\n```").unwrap();
        assert!(plan.folders.is_empty());
        assert_eq!(plan.summary, "x");
    }

    #[test]
    fn parse_classification_requires_folders_array() {
        let err = parse_classification("{\"summary\":\"x\"}").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));

        let err = parse_classification("{\"folders\":\"nope\"}").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));

        let err = parse_classification("not json at all").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn parse_classification_sanitizes_folder_names() {
        let plan = parse_classification(
            r#"{"folders":[{"name":"a/b:c*d","files":[]},{"name":"***","files":[]}],"summary":""}"#,
        )
        .unwrap();
        assert_eq!(plan.folders[0].name, "a_b_c_d");
        assert_eq!(plan.folders[1].name, "___");
    }

    #[test]
    fn parse_classification_falls_back_when_name_sanitizes_to_nothing() {
        let plan =
            parse_classification(r#"{"folders":[{"name":"  ","files":[]}],"summary":""}"#).unwrap();
        assert_eq!(plan.folders[0].name, "uncategorized");
    }

    #[test]
    fn sanitize_folder_name_replaces_illegal_characters() {
        assert_eq!(sanitize_folder_name("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_folder_name(r#"x?"<>|y"#), "x_____y");
    }

    #[test]
    fn sanitize_folder_name_is_idempotent_on_clean_input() {
        assert_eq!(sanitize_folder_name("Documents"), "Documents");
        assert_eq!(
            sanitize_folder_name(&sanitize_folder_name("a/b")),
            sanitize_folder_name("a/b")
        );
    }

    #[test]
    fn chat_reply_with_message_and_action() {
        let reply = parse_chat_reply(
            r#"{"message":"on it","action":{"type":"find_files","params":{"keyword":"img"}}}"#,
        );
        assert_eq!(reply.message, "on it");
        let action = reply.action.unwrap();
        assert_eq!(action.kind, ActionKind::FindFiles);
        assert_eq!(action.params.get("keyword").unwrap(), "img");
    }

    #[test]
    fn chat_reply_without_action() {
        let reply = parse_chat_reply(r#"{"message":"hi"}"#);
        assert_eq!(reply.message, "hi");
        assert!(reply.action.is_none());
    }

    #[test]
    fn chat_reply_falls_back_to_raw_text() {
        let reply = parse_chat_reply("not json at all");
        assert_eq!(reply.message, "not json at all");
        assert!(reply.action.is_none());
    }

    #[test]
    fn chat_reply_wraps_objects_without_message() {
        let reply = parse_chat_reply(r#"{"status":"ok"}"#);
        assert_eq!(reply.message, r#"{"status":"ok"}"#);
        assert!(reply.action.is_none());
    }

    #[test]
    fn chat_reply_wraps_non_object_json() {
        let reply = parse_chat_reply("[1,2,3]");
        assert_eq!(reply.message, "[1,2,3]");
        assert!(reply.action.is_none());
    }

    #[test]
    fn chat_reply_ignores_malformed_action() {
        let reply = parse_chat_reply(r#"{"message":"ok","action":{"params":{}}}"#);
        assert_eq!(reply.message, "ok");
        assert!(reply.action.is_none());
    }

    #[test]
    fn chat_reply_strips_fences_before_parsing() {
        let reply = parse_chat_reply("```json\n{\"message\":\"fenced\"}\n```");
        assert_eq!(reply.message, "fenced");
    }
}
