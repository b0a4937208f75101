use tracing::warn;

use crate::core::file_blocks::FileContentFormatter;
use crate::core::filenames::{extract_valid_filenames, retain_valid};

pub const DEFAULT_REQUEST: &str =
    "Reply on how to improve the code for style, clarity, comments, and tests (below)\n";

/// The voice the reviewer speaks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Developer,
    KentBeck,
    MarcBenioff,
    Yoda,
}

impl Persona {
    /// Resolves a persona key, falling back to [`Persona::Developer`] for
    /// anything unrecognised.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "developer" => Persona::Developer,
            "kent_beck" => Persona::KentBeck,
            "marc_benioff" => Persona::MarcBenioff,
            "yoda" => Persona::Yoda,
            other => {
                warn!("Unknown persona '{}', using 'developer'", other);
                Persona::default()
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Persona::Developer => "You are an experienced software developer in a variety of programming languages and methodologies. You create efficient, scalable, and fault-tolerant solutions",
            Persona::KentBeck => "You are Kent Beck. You are known for software design patterns, test-driven development (TDD), and agile methodologies",
            Persona::MarcBenioff => "You are Marc Benioff, internet entrepreneur and experienced software developer",
            Persona::Yoda => "You are Yoda, legendary Jedi Master. Speak like Yoda",
        }
    }
}

/// How the feedback should be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Concise,
    Zen,
}

impl Style {
    /// Resolves a style key, falling back to [`Style::Concise`].
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "concise" => Style::Concise,
            "zen" => Style::Zen,
            other => {
                warn!("Unknown style '{}', using 'concise'", other);
                Style::default()
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Style::Concise => "Format feedback concisely with numbered list",
            Style::Zen => "Format feedback in the style of a zen koan",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub persona: Persona,
    pub style: Style,
    pub include_files: bool,
    pub request: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            style: Style::default(),
            include_files: false,
            request: DEFAULT_REQUEST.to_string(),
        }
    }
}

pub struct PromptBuilder {
    config: PromptConfig,
    formatter: FileContentFormatter,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig, formatter: FileContentFormatter) -> Self {
        Self { config, formatter }
    }

    /// Builds the prompt as persona, style, request, a newline, the diff, and
    /// (when enabled) the referenced files. When `filenames` is `None` the
    /// files are extracted from the diff.
    pub fn build_prompt(&self, diff: &str, filenames: Option<&[String]>) -> String {
        let mut prompt = String::new();
        prompt.push_str(self.config.persona.description());
        prompt.push('.');
        prompt.push_str(self.config.style.description());
        prompt.push('.');
        prompt.push_str(&self.config.request);
        prompt.push('\n');
        prompt.push_str(diff);

        if self.config.include_files {
            let names = match filenames {
                Some(names) => retain_valid(names.iter().cloned()),
                None => extract_valid_filenames(diff),
            };
            prompt.push('\n');
            prompt.push_str(&self.formatter.format(&names));
        }

        prompt
    }
}
