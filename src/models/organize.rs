use serde::{Deserialize, Serialize};

/// One proposed folder in a classification plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFolder {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Model-proposed mapping of folder names to file lists. Folder names are
/// sanitized by the response interpreter before this struct is handed out;
/// `files` entries are matched against the real file index at execution
/// time, never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationPlan {
    pub folders: Vec<PlanFolder>,
    #[serde(default)]
    pub summary: String,
}

/// One row of the organize ledger: the outcome of a single attempted move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOpResult {
    pub file: String,
    pub folder: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOpResult {
    pub fn ok(file: &str, folder: &str) -> Self {
        Self {
            file: file.to_string(),
            folder: folder.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(file: &str, folder: &str, error: String) -> Self {
        Self {
            file: file.to_string(),
            folder: folder.to_string(),
            success: false,
            error: Some(error),
        }
    }
}

/// Envelope returned by the organize command: the plan that was executed,
/// the per-file ledger, and a human-readable summary. File-level failures
/// live in the ledger; only an upstream classification failure surfaces as
/// an error at the command boundary.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeOutcome {
    pub classification: ClassificationPlan,
    pub results: Vec<FileOpResult>,
    pub summary: String,
}
