// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./memora.toml` > `~/.config/memora/memora.toml` >
//! `/etc/memora/memora.toml` with environment variable overrides via the
//! `MEMORA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MemoraConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/memora/memora.toml";
pub(crate) const LOCAL_CONFIG: &str = "memora.toml";

/// Top-level sections an environment variable may address.
const SECTIONS: &[&str] = &[
    "agent",
    "storage",
    "embedding",
    "memory",
    "retrieval",
    "chat",
    "llm",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("memora").join("memora.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/memora/memora.toml` (system-wide)
/// 3. `~/.config/memora/memora.toml` (user XDG config)
/// 4. `./memora.toml` (local directory)
/// 5. `MEMORA_*` environment variables
pub fn load_config() -> Result<MemoraConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// No files and no environment are consulted.
pub fn load_config_from_str(toml_content: &str) -> Result<MemoraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MemoraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MemoraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MemoraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MemoraConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `MEMORA_<SECTION>_<KEY>` onto `<section>.<key>`.
///
/// Figment hands over the key with the prefix stripped but its case intact,
/// so it is lowercased before sections are matched.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `MEMORA_LLM_DEFAULT_PROVIDER` must become
/// `llm.default_provider`, not `llm.default.provider`.
fn env_provider() -> Env {
    Env::prefixed("MEMORA_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            if !rest.is_empty() {
                return format!("{section}.{rest}");
            }
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("llm_default_provider"), "llm.default_provider");
        assert_eq!(map_env_key("embedding_batch_size"), "embedding.batch_size");
        assert_eq!(
            map_env_key("retrieval_similarity_threshold"),
            "retrieval.similarity_threshold"
        );
        assert_eq!(map_env_key("memory_chunk_size"), "memory.chunk_size");
    }

    #[test]
    fn env_keys_arrive_uppercase() {
        assert_eq!(map_env_key("LLM_DEFAULT_PROVIDER"), "llm.default_provider");
        assert_eq!(map_env_key("Embedding_Batch_Size"), "embedding.batch_size");
        assert_eq!(map_env_key("AGENT_LOG_LEVEL"), "agent.log_level");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("logging_level"), "logging_level");
        assert_eq!(map_env_key("llm"), "llm");
    }
}
