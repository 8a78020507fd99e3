use crate::models::file_entry::FileEntry;

/// How many desktop file names the chat prompt carries as ambient context.
const MAX_CONTEXT_FILES: usize = 20;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// Human-readable size, binary units, one decimal above bytes.
pub fn human_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else if bytes < GIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    }
}

/// Render the classification request for a list of files. The model is
/// instructed to answer with JSON only, in the ClassificationPlan shape.
pub fn build_classification_prompt(files: &[FileEntry]) -> String {
    let file_list = files
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let extension = f
                .extension
                .as_deref()
                .filter(|e| !e.is_empty())
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| "no extension".to_string());
            format!("{}. {} ({}, {})", i + 1, f.name, extension, human_size(f.size))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a smart file-organization assistant. Classify the following files \
by name, extension and type.

Files:
{file_list}

Classification rules:
1. Group files by type (documents, images, videos, audio, archives, code, ...).
2. If a file name clearly indicates a topic or project, prefer grouping by that topic.
3. Files of the same kind belong in the same folder.
4. Folder names must be short and clear.

Reply with JSON only, in exactly this shape:
{{
  \"folders\": [
    {{
      \"name\": \"folder name\",
      \"description\": \"what this folder holds\",
      \"files\": [\"file1.txt\", \"file2.doc\"]
    }}
  ],
  \"summary\": \"one-line description of the proposed layout\"
}}

Notes:
- Return JSON only, with no surrounding text.
- Folder names must not contain any of: / \\ : * ? \" < > |
- Every listed file must be assigned to some folder.
- Even a single file gets a suitable folder."
    )
}

/// Render the chat instruction: persona framing, the user's message, up to
/// the first 20 desktop file names as context, and the action protocol with
/// worked examples. Conversational input should come back as plain text.
pub fn build_chat_prompt(message: &str, desktop_files: &[FileEntry]) -> String {
    let mut prompt = format!(
        "You are Deskpet, a friendly desktop companion. You help the user organize \
files, find files and keep their desktop tidy.

User instruction: {message}

"
    );

    if !desktop_files.is_empty() {
        let names = desktop_files
            .iter()
            .take(MAX_CONTEXT_FILES)
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!("Current desktop files: {names}\n\n"));
    }

    prompt.push_str(
        "Work out the user's intent and reply. If the user wants a file operation, \
answer with JSON in this shape:
{
  \"message\": \"a friendly reply for the user\",
  \"action\": {
    \"type\": \"action type\",
    \"params\": { \"parameter\": \"value\" }
  }
}

Supported action types:
- \"organize_desktop\": tidy up the desktop (optional param: filter, a file-type filter)
- \"find_files\": look for files (param: keyword)
- \"clean_duplicates\": remove duplicate files

For ordinary conversation, reply with plain text and no JSON.

Examples:
User: \"please tidy my desktop\"
Reply: { \"message\": \"On it, tidying your desktop now!\", \"action\": { \"type\": \"organize_desktop\", \"params\": {} } }

User: \"find my vacation photos\"
Reply: { \"message\": \"Looking for vacation photos...\", \"action\": { \"type\": \"find_files\", \"params\": { \"keyword\": \"vacation\" } } }

User: \"hello\"
Reply: Hi there! I'm Deskpet. What can I do for you?",
    );

    prompt
}
