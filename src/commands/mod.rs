pub mod chat_commands;
pub mod organize_commands;
pub mod settings_commands;
