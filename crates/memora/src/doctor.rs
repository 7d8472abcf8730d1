// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `memora doctor` command implementation.
//!
//! Opens the store (running pending migrations), health-checks it and
//! reports entity counts alongside the resolved embedding and LLM settings.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use memora_config::MemoraConfig;
use memora_core::{HealthStatus, MemoraError, PluginAdapter, StorageAdapter};
use memora_embeddings::{is_known_model, resolve_dimension};
use memora_router::BUILTIN_DEFAULT_PROVIDER;
use memora_storage::SqliteStorage;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs every check and prints the report. Returns the number of failures.
pub async fn run_doctor(config: &MemoraConfig, plain: bool) -> Result<usize, MemoraError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(config),
        check_database(config).await,
        check_embedding(config),
        check_llm(config),
    ];

    println!();
    println!("  memora doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
            CheckStatus::Pass => {}
        }
        println!("{}", format_line(result, use_color));
    }

    println!();
    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(fail_count)
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// The configuration was loaded and validated before the command ran.
fn check_config(config: &MemoraConfig) -> CheckResult {
    let start = Instant::now();
    CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        format!("valid (agent.name={})", config.agent.name),
        start,
    )
}

/// Opens and migrates the store, then reports its contents.
async fn check_database(config: &MemoraConfig) -> CheckResult {
    let start = Instant::now();
    let storage = SqliteStorage::new(config.storage.clone());

    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }

    let result = match storage.health_check().await {
        Ok(HealthStatus::Healthy) => match storage.stats().await {
            Ok(stats) => {
                let summary = format!(
                    "{} sessions, {} messages, {} memories, {} chunks",
                    stats.sessions, stats.messages, stats.memories, stats.chunks
                );
                if stats.unembedded_chunks > 0 {
                    CheckResult::new(
                        "Database",
                        CheckStatus::Warn,
                        format!("{summary} ({} awaiting embeddings)", stats.unembedded_chunks),
                        start,
                    )
                } else {
                    CheckResult::new("Database", CheckStatus::Pass, summary, start)
                }
            }
            Err(e) => {
                CheckResult::new("Database", CheckStatus::Fail, format!("stats failed: {e}"), start)
            }
        },
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Database", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Database", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("health check failed: {e}"),
            start,
        ),
    };

    if let Err(e) = storage.close().await {
        tracing::warn!(error = %e, "failed to close storage after doctor checks");
    }
    result
}

/// Reports the embedding model and the dimension vectors will have.
fn check_embedding(config: &MemoraConfig) -> CheckResult {
    let start = Instant::now();
    let embedding = &config.embedding;
    let dimension = resolve_dimension(embedding);
    if embedding.dimensions.is_none() && !is_known_model(&embedding.model) {
        return CheckResult::new(
            "Embedding",
            CheckStatus::Warn,
            format!(
                "unknown model {}; assuming {dimension} dimensions (set embedding.dimensions)",
                embedding.model
            ),
            start,
        );
    }
    CheckResult::new(
        "Embedding",
        CheckStatus::Pass,
        format!("{} ({dimension} dimensions)", embedding.model),
        start,
    )
}

/// Reports which provider calls without an explicit choice will use.
fn check_llm(config: &MemoraConfig) -> CheckResult {
    let start = Instant::now();
    let message = match &config.llm.default_provider {
        Some(name) => format!("default provider {name} (configured)"),
        None => format!("default provider {BUILTIN_DEFAULT_PROVIDER} (builtin)"),
    };
    CheckResult::new("LLM", CheckStatus::Pass, message, start)
}
