use tracing::info;

use crate::error::AppError;
use crate::models::file_entry::FileEntry;
use crate::models::organize::OrganizeOutcome;
use crate::services::organize_service;
use crate::state::AppState;

/// Classify the given files and move them into the proposed folders under
/// the desktop root. Per-file move failures are reported in the ledger, not
/// raised; only an upstream classification failure errors the command.
pub async fn organize_files(
    state: &AppState,
    files: &[FileEntry],
) -> Result<OrganizeOutcome, AppError> {
    info!("organizing {} files", files.len());

    let classification = organize_service::analyze_files(&state.ai, files).await?;
    let (results, summary) =
        organize_service::execute_plan(&classification, files, &state.desktop_root)?;

    Ok(OrganizeOutcome {
        classification,
        results,
        summary,
    })
}
