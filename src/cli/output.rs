use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::error::{ErrorCode, Result, SearchError, StructuredError};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable formatted output with colors (default)
    #[default]
    Human,
    /// Pretty-printed JSON envelope
    Json,
    /// Plain text without colors or formatting
    Plain,
}

impl OutputFormat {
    /// `--json` wins over an explicit format.
    #[must_use]
    pub fn from_args(json: bool, format: Option<OutputFormat>) -> Self {
        if json {
            OutputFormat::Json
        } else {
            format.unwrap_or_default()
        }
    }

    #[must_use]
    pub const fn use_colors(&self) -> bool {
        matches!(self, OutputFormat::Human)
    }

    #[must_use]
    pub const fn is_machine_readable(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// JSON envelope for every command in machine mode.
#[derive(Serialize)]
pub struct Response<T> {
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Error {
        code: ErrorCode,
        numeric_code: u16,
        message: String,
        suggestion: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
        recoverable: bool,
        category: String,
    },
}

impl From<StructuredError> for Status {
    fn from(err: StructuredError) -> Self {
        Status::Error {
            code: err.code,
            numeric_code: err.numeric_code,
            message: err.message,
            suggestion: err.suggestion,
            context: err.context,
            recoverable: err.recoverable,
            category: err.category,
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> Response<T> {
    Response {
        status: Status::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
    }
}

pub fn error_response(err: &SearchError) -> Response<serde_json::Value> {
    Response {
        status: StructuredError::from_search_error(err).into(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
    }
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| SearchError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
    color: bool,
}

impl HumanLayout {
    #[must_use]
    pub const fn new(color: bool) -> Self {
        Self {
            lines: Vec::new(),
            key_width: 18,
            color,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        let line = if self.color { text.bold().to_string() } else { text.to_string() };
        self.lines.push(line);
        self.lines.push(String::new());
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let key = format!("{key:width$}", width = self.key_width);
        let key = if self.color { key.dimmed().to_string() } else { key };
        self.lines.push(format!("{key} {value}"));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: &HumanLayout) {
    println!("{}", layout.build());
}
