//! Operator input providers.
//!
//! Steps never read the terminal directly; they ask a [`Prompter`]. Each
//! question carries a stable `key` so a [`ScriptedPrompter`] can answer it
//! from an answers file (unattended runs) or a test.
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

use crate::error::PromptError;

/// Source of operator answers.
pub trait Prompter: Send + Sync + std::fmt::Debug {
    /// Ask for a line of text. An empty answer with no default yields `""`.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be obtained.
    fn input(&self, key: &str, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Ask for a secret. Never echoed, never logged.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be obtained.
    fn password(&self, key: &str, prompt: &str) -> Result<String>;

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be obtained.
    fn confirm(&self, key: &str, prompt: &str, default: bool) -> Result<bool>;

    /// Ask the operator to pick one of `items`. Returns the zero-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid answer can be obtained.
    fn select(&self, key: &str, prompt: &str, items: &[String], default: Option<usize>)
    -> Result<usize>;
}

/// Interactive prompter backed by `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

fn terminal_error(err: dialoguer::Error) -> anyhow::Error {
    PromptError::Terminal(err.to_string()).into()
}

impl Prompter for TerminalPrompter {
    fn input(&self, _key: &str, prompt: &str, default: Option<&str>) -> Result<String> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map(|s| s.trim().to_string())
            .map_err(terminal_error)
    }

    fn password(&self, _key: &str, prompt: &str) -> Result<String> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(terminal_error)
    }

    fn confirm(&self, _key: &str, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(terminal_error)
    }

    fn select(
        &self,
        _key: &str,
        prompt: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize> {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(default.unwrap_or(0))
            .interact()
            .map_err(terminal_error)
    }
}

/// Prompter that answers from a fixed table of values.
///
/// Each key holds a queue of answers consumed in order, so a key asked
/// repeatedly (such as the menu) can be scripted as a list. When a key is
/// exhausted the prompt's default is used; a prompt without a default fails
/// with [`PromptError::Unanswered`].
///
/// Answer files are TOML tables:
///
/// ```toml
/// menu = [3, 4, 8]
/// bench_name = "frappe-bench"
/// site_name = "erp.example.com"
/// overwrite_site = false
/// ```
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<HashMap<String, VecDeque<String>>>,
}

impl ScriptedPrompter {
    /// Create a prompter with no answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for `key`.
    #[must_use]
    pub fn answer(self, key: &str, value: impl Into<String>) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers
                .entry(key.to_string())
                .or_default()
                .push_back(value.into());
        }
        self
    }

    /// Parse an answers table from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a TOML table of scalars or arrays
    /// of scalars.
    pub fn from_toml(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text).context("parsing answers")?;
        let mut prompter = Self::new();
        for (key, value) in table {
            let values = match value {
                toml::Value::Array(items) => items,
                scalar => vec![scalar],
            };
            for value in values {
                prompter = prompter.answer(&key, scalar_to_string(&key, value)?);
            }
        }
        Ok(prompter)
    }

    /// Load an answers file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading answers file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    fn next(&self, key: &str) -> Option<String> {
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.get_mut(key).and_then(VecDeque::pop_front))
    }
}

fn scalar_to_string(key: &str, value: toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => anyhow::bail!("unsupported answer type for '{key}': {}", other.type_str()),
    }
}

fn parse_bool(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, key: &str, _prompt: &str, default: Option<&str>) -> Result<String> {
        match (self.next(key), default) {
            (Some(answer), Some(default)) if answer.trim().is_empty() => Ok(default.to_string()),
            (Some(answer), _) => Ok(answer.trim().to_string()),
            (None, Some(default)) => Ok(default.to_string()),
            (None, None) => Err(PromptError::Unanswered(key.to_string()).into()),
        }
    }

    fn password(&self, key: &str, _prompt: &str) -> Result<String> {
        self.next(key)
            .ok_or_else(|| PromptError::Unanswered(key.to_string()).into())
    }

    fn confirm(&self, key: &str, _prompt: &str, default: bool) -> Result<bool> {
        match self.next(key) {
            Some(answer) => parse_bool(&answer)
                .ok_or_else(|| anyhow::anyhow!("'{answer}' is not a yes/no answer for '{key}'")),
            None => Ok(default),
        }
    }

    fn select(
        &self,
        key: &str,
        _prompt: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize> {
        let Some(answer) = self.next(key) else {
            return default.ok_or_else(|| PromptError::Unanswered(key.to_string()).into());
        };
        let answer = answer.trim();
        // Menu items are numbered from 1 on screen; labels also match.
        if let Ok(n) = answer.parse::<usize>()
            && (1..=items.len()).contains(&n)
        {
            return Ok(n - 1);
        }
        items
            .iter()
            .position(|item| item.eq_ignore_ascii_case(answer))
            .ok_or_else(|| anyhow::anyhow!("'{answer}' is not a valid choice for '{key}'"))
    }
}
