// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the hierarchy `./mnemon.toml` > `~/.config/mnemon/mnemon.toml`
//! with environment variable overrides via the `MNEMON_` prefix
//! (nested keys separated by `__`, e.g. `MNEMON_SEARCH__RERANK_OVERFETCH`).

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MnemonConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `~/.config/mnemon/mnemon.toml` (user config)
/// 3. `./mnemon.toml` (local directory)
/// 4. `MNEMON_*` environment variables
pub fn load_config() -> Result<MnemonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemonConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mnemon/mnemon.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mnemon.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string over compiled defaults.
///
/// Used for testing and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MnemonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemonConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MnemonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemonConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

fn env_provider() -> Env {
    Env::prefixed("MNEMON_").split("__")
}
