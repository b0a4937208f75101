pub mod diff_source;
pub mod file_blocks;
pub mod filenames;
pub mod git;
pub mod prompt;

pub use diff_source::DiffSource;
pub use file_blocks::FileContentFormatter;
pub use prompt::PromptBuilder;
