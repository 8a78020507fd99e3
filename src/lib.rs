pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use config::{AppConfig, SettingsPatch};
pub use error::AppError;
pub use models::chat::{ActionKind, ChatAction, ChatReply};
pub use models::file_entry::FileEntry;
pub use models::organize::{ClassificationPlan, FileOpResult, OrganizeOutcome, PlanFolder};
pub use services::ai_service::{AiService, CallOptions};
pub use state::AppState;

/// Install the global tracing subscriber. Filtering comes from `RUST_LOG`
/// when set; repeated calls are a no-op so embedding shells can call this
/// unconditionally.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("deskpet=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
