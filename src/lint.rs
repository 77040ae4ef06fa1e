use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    pub file_path: String,
    #[serde(default)]
    pub messages: Vec<LintMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    #[serde(default)]
    pub rule_id: Option<String>,
    // 1 = warning, 2 = error.
    pub severity: u8,
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub fatal: bool,
}

impl LintMessage {
    fn is_error(&self) -> bool {
        self.fatal || self.severity >= 2
    }
}

pub type LintFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<LintResult>>> + Send + 'a>>;

pub trait Linter {
    fn lint_files<'a>(&'a self, patterns: &'a [String]) -> LintFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct EslintCommand {
    command: Vec<String>,
}

impl EslintCommand {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Linter for EslintCommand {
    fn lint_files<'a>(&'a self, patterns: &'a [String]) -> LintFuture<'a> {
        Box::pin(async move {
            let Some((program, leading_args)) = self.command.split_first() else {
                bail!("HALPT_LINT_COMMAND is empty");
            };
            debug!(%program, ?patterns, "running linter");

            let output = Command::new(program)
                .args(leading_args)
                .args(["--format", "json"])
                .args(patterns)
                .output()
                .await
                .with_context(|| {
                    format!("Failed to run '{program}'. Is ESLint installed? Set HALPT_LINT_COMMAND to override.")
                })?;

            // ESLint exits 1 when it found problems; anything past that is a crash or bad config.
            match output.status.code() {
                Some(0 | 1) => {}
                code => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(?code, "linter exited abnormally");
                    bail!(
                        "Linter exited with status {}: {}",
                        code.map_or_else(|| "unknown".to_string(), |code| code.to_string()),
                        stderr.trim()
                    );
                }
            }

            serde_json::from_slice(&output.stdout).context("Failed to parse linter JSON report")
        })
    }
}

pub fn format_stylish(results: &[LintResult]) -> String {
    let mut out = String::new();
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for result in results.iter().filter(|result| !result.messages.is_empty()) {
        let rows: Vec<(String, &LintMessage)> = result
            .messages
            .iter()
            .map(|message| {
                let position = format!(
                    "{}:{}",
                    message.line.unwrap_or(0),
                    message.column.unwrap_or(0)
                );
                (position, message)
            })
            .collect();
        let position_width = rows.iter().map(|(pos, _)| pos.len()).max().unwrap_or(0);
        let text_width = rows
            .iter()
            .map(|(_, message)| message.message.chars().count())
            .max()
            .unwrap_or(0);

        out.push('\n');
        out.push_str(&result.file_path.underline().to_string());
        out.push('\n');

        for (position, message) in &rows {
            let kind = if message.is_error() {
                errors += 1;
                format!("{:<7}", "error").red()
            } else {
                warnings += 1;
                format!("{:<7}", "warning").yellow()
            };
            let rule = message.rule_id.as_deref().unwrap_or("");
            let row = format!(
                "  {}  {}  {:<text_width$}  {}",
                format!("{position:>position_width$}").dimmed(),
                kind,
                message.message,
                rule.dimmed()
            );
            out.push_str(row.trim_end());
            out.push('\n');
        }
    }

    let total = errors + warnings;
    if total == 0 {
        return String::new();
    }

    let summary = format!(
        "\u{2716} {} problem{} ({} error{}, {} warning{})",
        total,
        plural(total),
        errors,
        plural(errors),
        warnings,
        plural(warnings)
    );
    out.push('\n');
    if errors > 0 {
        out.push_str(&summary.red().bold().to_string());
    } else {
        out.push_str(&summary.yellow().bold().to_string());
    }
    out.push('\n');
    out
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
