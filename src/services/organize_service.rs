use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::chat::{ActionKind, ChatAction};
use crate::models::file_entry::FileEntry;
use crate::models::organize::{ClassificationPlan, FileOpResult, OrganizeOutcome};
use crate::services::ai_service::{AiService, CallOptions};
use crate::services::file_service;
use crate::services::prompt_service;
use crate::services::response_service;

const CLASSIFY_TEMPERATURE: f64 = 0.3;
const CLASSIFY_MAX_TOKENS: u32 = 1500;

/// What a dispatched chat action produced.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ActionOutcome {
    Organized(OrganizeOutcome),
    FilesFound(Vec<FileEntry>),
    Notice(String),
    Ignored,
}

/// Ask the model for a classification plan covering `files`.
pub async fn analyze_files(
    ai: &AiService,
    files: &[FileEntry],
) -> Result<ClassificationPlan, AppError> {
    if files.is_empty() {
        return Err(AppError::General("no files to analyze".to_string()));
    }

    let prompt = prompt_service::build_classification_prompt(files);
    let options = CallOptions {
        temperature: Some(CLASSIFY_TEMPERATURE),
        max_tokens: Some(CLASSIFY_MAX_TOKENS),
        ..CallOptions::default()
    };
    let raw = ai.call(&prompt, options).await?;
    debug!("classification response: {raw}");

    response_service::parse_classification(&raw)
}

/// Execute a classification plan against `dest_root`.
///
/// Folders are created if absent; listed files absent from `file_index` or
/// from disk are skipped without a ledger row; each failed move (including
/// an occupied destination, which is never overwritten) is recorded and the
/// run continues.
pub fn execute_plan(
    plan: &ClassificationPlan,
    file_index: &[FileEntry],
    dest_root: &Path,
) -> Result<(Vec<FileOpResult>, String), AppError> {
    let mut ledger = Vec::new();

    for folder in &plan.folders {
        let folder_path = dest_root.join(&folder.name);
        file_service::ensure_dir(&folder_path)?;

        for file_name in &folder.files {
            let Some(entry) = file_index.iter().find(|f| &f.name == file_name) else {
                debug!("plan references unknown file, skipping: {file_name}");
                continue;
            };

            let source = Path::new(&entry.path);
            if !source.exists() {
                debug!("source vanished before move, skipping: {file_name}");
                continue;
            }

            let target = folder_path.join(file_name);
            match file_service::move_file(source, &target) {
                Ok(()) => {
                    info!("moved {file_name} -> {}/", folder.name);
                    ledger.push(FileOpResult::ok(file_name, &folder.name));
                }
                Err(err) => {
                    warn!("failed to move {file_name}: {err}");
                    ledger.push(FileOpResult::failed(file_name, &folder.name, err.to_string()));
                }
            }
        }
    }

    let summary = if plan.summary.is_empty() {
        format!("Organized files into {} folders", plan.folders.len())
    } else {
        plan.summary.clone()
    };

    Ok((ledger, summary))
}

/// Case-insensitive substring match on file names; directories are ignored.
/// Truncation for display is the presentation layer's concern.
pub fn find_files(keyword: &str, file_index: &[FileEntry]) -> Vec<FileEntry> {
    let needle = keyword.to_lowercase();
    file_index
        .iter()
        .filter(|f| f.is_file && f.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Route one chat action. `organize_desktop` re-reads the directory rather
/// than trusting any earlier snapshot; unknown action types are logged and
/// ignored.
pub async fn dispatch(
    ai: &AiService,
    action: &ChatAction,
    root: &Path,
) -> Result<ActionOutcome, AppError> {
    match action.kind {
        ActionKind::OrganizeDesktop => {
            let files: Vec<FileEntry> = file_service::list_directory(root)?
                .into_iter()
                .filter(|f| f.is_file)
                .collect();

            if files.is_empty() {
                return Ok(ActionOutcome::Notice(
                    "There are no files to organize.".to_string(),
                ));
            }

            let classification = analyze_files(ai, &files).await?;
            let (results, summary) = execute_plan(&classification, &files, root)?;
            Ok(ActionOutcome::Organized(OrganizeOutcome {
                classification,
                results,
                summary,
            }))
        }
        ActionKind::FindFiles => {
            let keyword = action.params.get("keyword").map(String::as_str).unwrap_or("");
            let files = file_service::list_directory(root)?;
            Ok(ActionOutcome::FilesFound(find_files(keyword, &files)))
        }
        ActionKind::CleanDuplicates => Ok(ActionOutcome::Notice(
            "Duplicate cleanup is not implemented yet.".to_string(),
        )),
        ActionKind::Unknown => {
            warn!("ignoring unknown action type");
            Ok(ActionOutcome::Ignored)
        }
    }
}
