use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapters::llm::{GenerationParams, ModelConfig, Provider, ReviewError};
use crate::core::file_blocks::DEFAULT_MAX_FILE_CHARS;
use crate::core::prompt::{Persona, PromptConfig, Style, DEFAULT_REQUEST};

const CONFIG_FILE_NAMES: &[&str] = &[".diffcritic.yml", ".diffcritic.yaml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_persona")]
    pub persona: String,

    #[serde(default = "default_style")]
    pub style: String,

    #[serde(default)]
    pub include_files: bool,

    /// Replaces the built-in review instruction.
    pub request: Option<String>,

    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,
}

/// Values given on the command line (or their environment fallbacks).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub persona: Option<String>,
    pub style: Option<String>,
    pub include_files: Option<bool>,
    pub base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            persona: default_persona(),
            style: default_style(),
            include_files: false,
            request: None,
            api_key: None,
            base_url: None,
            timeout_secs: None,
            max_file_chars: default_max_file_chars(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."), dirs::home_dir())
    }

    /// Reads the first config file found in `dir`, then in `home`, falling
    /// back to defaults when there is none.
    pub fn load_from(dir: &Path, home: Option<PathBuf>) -> Result<Self> {
        let candidates = CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .chain(home.map(|home| home.join(CONFIG_FILE_NAMES[0])));

        for path in candidates {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let config: Config = serde_yaml::from_str(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    pub fn merge_with_cli(&mut self, cli: CliOverrides) {
        if let Some(provider) = cli.provider {
            // A key from the config file belongs to the file's provider.
            if !same_provider(&provider, &self.provider) {
                self.api_key = None;
            }
            self.provider = provider;
        }
        if let Some(model) = cli.model {
            self.model = model;
        }
        if let Some(temperature) = cli.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = cli.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(persona) = cli.persona {
            self.persona = persona;
        }
        if let Some(style) = cli.style {
            self.style = style;
        }
        if let Some(include_files) = cli.include_files {
            self.include_files = include_files;
        }
        if let Some(base_url) = cli.base_url {
            self.base_url = Some(base_url);
        }
    }

    pub fn normalize(&mut self) {
        if !self.temperature.is_finite() {
            self.temperature = default_temperature();
        }
        self.temperature = self.temperature.clamp(0.0, 2.0);
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
    }

    pub fn provider(&self) -> Result<Provider, ReviewError> {
        self.provider.parse()
    }

    /// Fills a missing credential from the provider's environment variable.
    pub fn resolve_api_key<F>(&mut self, lookup: F) -> Result<(), ReviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_some() {
            return Ok(());
        }
        if let Some(env_name) = self.provider()?.api_key_env() {
            self.api_key = lookup(env_name);
        }
        Ok(())
    }

    pub fn model_config(&self) -> Result<ModelConfig, ReviewError> {
        Ok(ModelConfig {
            provider: self.provider()?,
            params: GenerationParams {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        })
    }

    pub fn prompt_config(&self) -> PromptConfig {
        PromptConfig {
            persona: Persona::from_key(&self.persona),
            style: Style::from_key(&self.style),
            include_files: self.include_files,
            request: self
                .request
                .clone()
                .unwrap_or_else(|| DEFAULT_REQUEST.to_string()),
        }
    }
}

fn same_provider(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> usize {
    1024
}

fn default_persona() -> String {
    "developer".to_string()
}

fn default_style() -> String {
    "concise".to_string()
}

fn default_max_file_chars() -> usize {
    DEFAULT_MAX_FILE_CHARS
}
