//! Loader and game version detection from a server's environment.
//!
//! Detection is table-driven: the first matching rule in `LOADER_RULES`
//! wins, and the first non-empty key in `VERSION_KEYS` supplies the game
//! version. A key counts as present even when its value is empty.

use std::collections::HashMap;

use craftdeploy_protocol::constants::DEFAULT_GAME_VERSION;
use craftdeploy_protocol::{Loader, ServerConfig, ServerContext};

/// How a rule inspects its environment key.
#[derive(Debug, Clone, Copy)]
enum Match {
    /// The key exists, whatever its value.
    Present,
    /// The key's value contains this lower-case substring (case-insensitive).
    Contains(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct LoaderRule {
    key: &'static str,
    matcher: Match,
    loader: Loader,
}

impl LoaderRule {
    const fn present(key: &'static str, loader: Loader) -> Self {
        Self {
            key,
            matcher: Match::Present,
            loader,
        }
    }

    const fn contains(key: &'static str, needle: &'static str, loader: Loader) -> Self {
        Self {
            key,
            matcher: Match::Contains(needle),
            loader,
        }
    }

    fn matches(&self, env: &HashMap<String, String>) -> bool {
        let Some(value) = env.get(self.key) else {
            return false;
        };
        match self.matcher {
            Match::Present => true,
            Match::Contains(needle) => value.to_ascii_lowercase().contains(needle),
        }
    }
}

/// Ordered loader precedence. `neoforge` is tested before `forge` in the
/// `TYPE` fallback because it contains it.
const LOADER_RULES: &[LoaderRule] = &[
    LoaderRule::present("FABRIC_VERSION", Loader::Fabric),
    LoaderRule::present("QUILT_VERSION", Loader::Quilt),
    LoaderRule::present("NEOFORGE_VERSION", Loader::NeoForge),
    LoaderRule::present("FORGE_VERSION", Loader::Forge),
    LoaderRule::contains("BUILD_TYPE", "recommended", Loader::Forge),
    LoaderRule::contains("TYPE", "fabric", Loader::Fabric),
    LoaderRule::contains("TYPE", "quilt", Loader::Quilt),
    LoaderRule::contains("TYPE", "neoforge", Loader::NeoForge),
    LoaderRule::contains("TYPE", "forge", Loader::Forge),
];

/// Loader used when no rule matches.
const FALLBACK_LOADER: Loader = Loader::Forge;

/// Environment keys that may carry the game version, in precedence order.
const VERSION_KEYS: &[&str] = &["MC_VERSION", "VERSION", "MINECRAFT_VERSION", "GAME_VERSION"];

/// Derives loader and game version from an environment map. Pure.
pub fn detect(env: &HashMap<String, String>) -> ServerConfig {
    let loader = LOADER_RULES
        .iter()
        .find(|rule| rule.matches(env))
        .map(|rule| rule.loader)
        .unwrap_or(FALLBACK_LOADER);

    let game_version = VERSION_KEYS
        .iter()
        .filter_map(|key| env.get(*key))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .unwrap_or(DEFAULT_GAME_VERSION)
        .to_string();

    ServerConfig {
        loader,
        game_version,
    }
}

/// Derives the server config, letting pre-detected values override detection.
///
/// A pre-supplied `Unknown` loader is ignored so the resolver never sees it.
pub fn detect_server_config(ctx: &ServerContext) -> ServerConfig {
    let detected = detect(&ctx.environment);

    let loader = match ctx.mod_loader {
        Some(loader) if loader != Loader::Unknown => loader,
        _ => detected.loader,
    };
    let game_version = ctx.version.clone().unwrap_or(detected.game_version);

    ServerConfig {
        loader,
        game_version,
    }
}
