//! Runtime configuration for the scoring engine.

use std::path::PathBuf;

use crate::adapters::IntegrityPolicy;
use crate::domain::DEFAULT_BACKGROUND_SIZE;

/// Permutations per request for the sampling-based explainer.
pub const DEFAULT_SAMPLING_PERMUTATIONS: usize = 64;

/// Seed for the sampling-based explainer.
pub const DEFAULT_SAMPLING_SEED: u64 = 42;

const MAX_SAMPLING_PERMUTATIONS: usize = 4096;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding the fitted artifacts
    pub model_dir: PathBuf,

    /// Rows in the synthesized background when none was persisted
    pub background_size: usize,

    /// Permutations drawn by the sampling-based explainer
    pub sampling_permutations: usize,

    /// Seed for the sampling-based explainer
    pub sampling_seed: u64,

    /// Refuse artifacts without a verified signature
    pub require_signed_artifacts: bool,

    /// Base64 Ed25519 key that signs `manifest.json`
    pub artifact_pubkey_b64: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            background_size: DEFAULT_BACKGROUND_SIZE,
            sampling_permutations: DEFAULT_SAMPLING_PERMUTATIONS,
            sampling_seed: DEFAULT_SAMPLING_SEED,
            require_signed_artifacts: false,
            artifact_pubkey_b64: None,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn parse_positive(v: &str, max: usize) -> Option<usize> {
    v.trim().parse::<usize>().ok().filter(|&x| x > 0 && x <= max)
}

impl EngineConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - GLYCORISK_MODEL_DIR
    /// - GLYCORISK_BACKGROUND_SIZE
    /// - GLYCORISK_SAMPLING_PERMUTATIONS
    /// - GLYCORISK_SAMPLING_SEED
    /// - GLYCORISK_REQUIRE_SIGNED_ARTIFACTS
    /// - GLYCORISK_ARTIFACT_PUBKEY_B64
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env_or_default`] with an explicit variable source.
    /// Invalid values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("GLYCORISK_MODEL_DIR") {
            if !v.trim().is_empty() {
                cfg.model_dir = PathBuf::from(v.trim());
            }
        }

        if let Some(x) = lookup("GLYCORISK_BACKGROUND_SIZE").and_then(|v| parse_positive(&v, 10_000)) {
            cfg.background_size = x;
        }

        if let Some(x) = lookup("GLYCORISK_SAMPLING_PERMUTATIONS")
            .and_then(|v| parse_positive(&v, MAX_SAMPLING_PERMUTATIONS))
        {
            cfg.sampling_permutations = x;
        }

        if let Some(x) = lookup("GLYCORISK_SAMPLING_SEED").and_then(|v| v.trim().parse::<u64>().ok()) {
            cfg.sampling_seed = x;
        }

        if let Some(b) = lookup("GLYCORISK_REQUIRE_SIGNED_ARTIFACTS").and_then(|v| parse_bool(&v)) {
            cfg.require_signed_artifacts = b;
        }

        if let Some(v) = lookup("GLYCORISK_ARTIFACT_PUBKEY_B64") {
            if !v.trim().is_empty() {
                cfg.artifact_pubkey_b64 = Some(v.trim().to_string());
            }
        }

        cfg
    }

    /// Integrity policy for opening the artifact directory.
    #[must_use]
    pub fn integrity_policy(&self) -> IntegrityPolicy {
        IntegrityPolicy {
            require_signature: self.require_signed_artifacts,
            public_key_b64: self.artifact_pubkey_b64.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::from_lookup(|_| None);
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.background_size, 50);
        assert!(!cfg.require_signed_artifacts);
    }

    #[test]
    fn test_overrides() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("GLYCORISK_MODEL_DIR", "/srv/models"),
            ("GLYCORISK_BACKGROUND_SIZE", "20"),
            ("GLYCORISK_SAMPLING_PERMUTATIONS", "128"),
            ("GLYCORISK_SAMPLING_SEED", "7"),
            ("GLYCORISK_REQUIRE_SIGNED_ARTIFACTS", "true"),
            ("GLYCORISK_ARTIFACT_PUBKEY_B64", " abc= "),
        ]));
        assert_eq!(cfg.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(cfg.background_size, 20);
        assert_eq!(cfg.sampling_permutations, 128);
        assert_eq!(cfg.sampling_seed, 7);
        assert!(cfg.integrity_policy().require_signature);
        assert_eq!(cfg.artifact_pubkey_b64.as_deref(), Some("abc="));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("GLYCORISK_BACKGROUND_SIZE", "0"),
            ("GLYCORISK_SAMPLING_PERMUTATIONS", "1000000"),
            ("GLYCORISK_REQUIRE_SIGNED_ARTIFACTS", "maybe"),
        ]));
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_explanation_length_is_not_configurable() {
        let cfg = EngineConfig::from_lookup(lookup(&[("GLYCORISK_TOP_K", "3")]));
        assert_eq!(cfg, EngineConfig::default());
    }
}
