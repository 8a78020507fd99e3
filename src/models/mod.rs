pub mod chat;
pub mod file_entry;
pub mod organize;
