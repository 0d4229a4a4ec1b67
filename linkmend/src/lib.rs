pub mod commands;
pub mod handlers;

// Re-export commonly used helpers for convenience
pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{
    describe_suggestion, describe_verdict, is_affirmative, load_settings, load_settings_with,
    resolve_branch, resolve_format, resolve_path,
};
