//! Artifact directory adapter: loads the fitted models from JSON files.
//!
//! # Layout
//!
//! ```text
//! <dir>/metadata.json      feature order, band thresholds, model versions
//! <dir>/preprocessor.json  fitted column transforms
//! <dir>/gb_model.json      gradient-boosted risk model
//! <dir>/lr_model.json      logistic surrogate
//! <dir>/background.json    transformed background sample (optional)
//! <dir>/manifest.json      SHA-256 of each file (optional)
//! <dir>/model.sig          Ed25519 signature over manifest.json (optional)
//! ```
//!
//! # Security
//!
//! - When a manifest is present, every listed file must match its digest and
//!   every artifact read must be listed.
//! - When a signature is present and a verifying key is configured, the
//!   manifest bytes must verify before anything else is trusted.
//! - With `require_signature`, a missing manifest, signature or key is fatal.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::gbdt::GradientBoostedTrees;
use super::logistic::LogisticSurrogate;
use crate::domain::{BackgroundSample, FittedPreprocessor};
use crate::ports::{ArtifactError, ArtifactSource, Classifier, LinearClassifier, ModelMetadata};

pub const METADATA_FILE: &str = "metadata.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const RISK_MODEL_FILE: &str = "gb_model.json";
pub const SURROGATE_FILE: &str = "lr_model.json";
pub const BACKGROUND_FILE: &str = "background.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Files a manifest is expected to bind, in load order.
pub const ARTIFACT_FILES: [&str; 5] = [
    METADATA_FILE,
    PREPROCESSOR_FILE,
    RISK_MODEL_FILE,
    SURROGATE_FILE,
    BACKGROUND_FILE,
];

const MANIFEST_VERSION: u32 = 1;

/// Digest list written next to the artifacts by the signing tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Relative file name → lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Hash every artifact present in `dir`.
    ///
    /// # Errors
    /// Returns error if a present artifact cannot be read.
    pub fn for_directory(dir: &Path, created_at: Option<i64>) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for name in ARTIFACT_FILES {
            let path = dir.join(name);
            if !path.exists() {
                continue;
            }
            let bytes = fs::read(&path)
                .map_err(|e| ArtifactError::Read(format!("{}: {e}", path.display())))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at,
            files,
        })
    }
}

/// How strictly artifact integrity is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityPolicy {
    /// Refuse to load anything without a verified signature.
    pub require_signature: bool,
    /// Base64 Ed25519 verifying key (32 bytes).
    pub public_key_b64: Option<String>,
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns error if the key is not valid base64 or not a 32-byte point.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Integrity("Invalid public key base64".into()))?;
    let pubkey: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Integrity("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&pubkey)
        .map_err(|_| ArtifactError::Integrity("Invalid verifying key".into()))
}

/// Artifact source backed by a local directory.
#[derive(Debug, Clone)]
pub struct ArtifactDirectory {
    dir: PathBuf,
    manifest: Option<ArtifactManifest>,
}

impl ArtifactDirectory {
    /// Open `dir`, verifying the manifest and signature per `policy`.
    ///
    /// # Errors
    /// Returns error if the directory is missing or integrity checks fail.
    pub fn open(dir: impl Into<PathBuf>, policy: &IntegrityPolicy) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ArtifactError::NotFound(format!(
                "Model directory {}",
                dir.display()
            )));
        }
        let manifest = Self::verify_manifest(&dir, policy)?;
        Ok(Self { dir, manifest })
    }

    /// Open `dir` without any integrity policy.
    ///
    /// # Errors
    /// Returns error if the directory is missing or a present manifest is bad.
    pub fn open_unverified(dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        Self::open(dir, &IntegrityPolicy::default())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.manifest.is_some()
    }

    fn verify_manifest(
        dir: &Path,
        policy: &IntegrityPolicy,
    ) -> Result<Option<ArtifactManifest>, ArtifactError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let sig_path = dir.join(SIGNATURE_FILE);

        if !manifest_path.exists() {
            if policy.require_signature {
                tracing::error!(dir = %dir.display(), "Signed manifest required but not found");
                return Err(ArtifactError::Integrity(
                    "Signed manifest required but manifest.json is missing".into(),
                ));
            }
            tracing::warn!(dir = %dir.display(), "Loading artifacts without a manifest");
            return Ok(None);
        }

        let manifest_content = fs::read(&manifest_path)
            .map_err(|e| ArtifactError::Read(format!("Failed to read manifest: {e}")))?;

        if sig_path.exists() || policy.require_signature {
            Self::verify_signature(&sig_path, &manifest_content, policy)?;
        }

        let manifest: ArtifactManifest = serde_json::from_slice(&manifest_content)
            .map_err(|e| ArtifactError::Malformed(format!("Invalid manifest.json format: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::Integrity(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }
        if manifest.files.is_empty() {
            return Err(ArtifactError::Integrity(
                "manifest.json contains no files".into(),
            ));
        }

        for (rel, expected_hex) in &manifest.files {
            let path = dir.join(rel);
            let bytes = fs::read(&path).map_err(|e| {
                ArtifactError::Integrity(format!(
                    "Manifest references missing/unreadable file {}: {e}",
                    path.display()
                ))
            })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex) {
                return Err(ArtifactError::Integrity(format!(
                    "File hash mismatch for {rel}"
                )));
            }
        }

        tracing::info!(files = manifest.files.len(), "Artifact manifest verified");
        Ok(Some(manifest))
    }

    fn verify_signature(
        sig_path: &Path,
        manifest_content: &[u8],
        policy: &IntegrityPolicy,
    ) -> Result<(), ArtifactError> {
        let Some(key_b64) = policy.public_key_b64.as_deref() else {
            if policy.require_signature {
                return Err(ArtifactError::Integrity(
                    "Signature required but no verifying key is configured".into(),
                ));
            }
            tracing::warn!("model.sig present but no verifying key configured; signature not checked");
            return Ok(());
        };

        if !sig_path.exists() {
            return Err(ArtifactError::Integrity(
                "Artifact signature required but model.sig is missing".into(),
            ));
        }

        let sig_bytes = fs::read(sig_path)
            .map_err(|e| ArtifactError::Read(format!("Failed to read signature: {e}")))?;
        let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            ArtifactError::Integrity("Invalid signature length (expected 64 bytes)".into())
        })?;
        let signature = Signature::from_bytes(&sig_array);

        verifying_key_from_b64(key_b64)?
            .verify(manifest_content, &signature)
            .map_err(|_| ArtifactError::Integrity("Invalid artifact signature".into()))?;

        tracing::info!("Artifact signature verified");
        Ok(())
    }

    fn read_bytes(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.display().to_string()));
        }
        let bytes =
            fs::read(&path).map_err(|e| ArtifactError::Read(format!("{}: {e}", path.display())))?;

        if let Some(manifest) = &self.manifest {
            let expected = manifest.files.get(name).ok_or_else(|| {
                ArtifactError::Integrity(format!("{name} is not bound by manifest.json"))
            })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected) {
                return Err(ArtifactError::Integrity(format!(
                    "File hash mismatch for {name}"
                )));
            }
        }
        Ok(bytes)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let bytes = self.read_bytes(name)?;
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Malformed(format!("{name}: {e}")))
    }
}

impl ArtifactSource for ArtifactDirectory {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn load_metadata(&self) -> Result<ModelMetadata, ArtifactError> {
        let metadata: ModelMetadata = self.read_json(METADATA_FILE)?;
        metadata
            .risk_bands
            .validate()
            .map_err(|e| ArtifactError::Malformed(format!("{METADATA_FILE}: {e}")))?;
        Ok(metadata)
    }

    fn load_preprocessor(&self) -> Result<FittedPreprocessor, ArtifactError> {
        let preprocessor: FittedPreprocessor = self.read_json(PREPROCESSOR_FILE)?;
        preprocessor
            .validate()
            .map_err(|e| ArtifactError::Malformed(format!("{PREPROCESSOR_FILE}: {e}")))?;
        Ok(preprocessor)
    }

    fn load_risk_model(&self) -> Result<Arc<dyn Classifier>, ArtifactError> {
        let model: GradientBoostedTrees = self.read_json(RISK_MODEL_FILE)?;
        model.validate()?;
        tracing::debug!(trees = model.n_trees(), "Risk model parsed");
        Ok(Arc::new(model))
    }

    fn load_surrogate(&self) -> Result<Arc<dyn LinearClassifier>, ArtifactError> {
        let model: LogisticSurrogate = self.read_json(SURROGATE_FILE)?;
        model.validate()?;
        Ok(Arc::new(model))
    }

    fn load_background(&self) -> Result<Option<BackgroundSample>, ArtifactError> {
        if !self.dir.join(BACKGROUND_FILE).exists() {
            return Ok(None);
        }
        self.read_json(BACKGROUND_FILE).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    fn demo_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models")
    }

    fn copy_demo_artifacts(dest: &Path) {
        for name in ARTIFACT_FILES {
            fs::copy(demo_dir().join(name), dest.join(name)).expect("copy artifact");
        }
    }

    fn signing_key() -> SigningKey {
        let mut sk = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut sk);
        SigningKey::from_bytes(&sk)
    }

    fn write_signed_manifest(dir: &Path, key: &SigningKey) -> String {
        let manifest = ArtifactManifest::for_directory(dir, Some(1_700_000_000)).expect("manifest");
        let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let signature: Signature = key.sign(&bytes);
        fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write signature");
        base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes())
    }

    #[test]
    fn test_loads_demo_artifacts() {
        let source = ArtifactDirectory::open_unverified(demo_dir()).expect("open demo dir");
        let metadata = source.load_metadata().expect("metadata");
        let preprocessor = source.load_preprocessor().expect("preprocessor");
        let risk = source.load_risk_model().expect("risk model");
        let surrogate = source.load_surrogate().expect("surrogate");
        let background = source.load_background().expect("background");

        assert_eq!(metadata.features.len(), preprocessor.width());
        assert_eq!(risk.n_features(), preprocessor.width());
        assert_eq!(surrogate.n_features(), preprocessor.width());
        assert!(background.is_some_and(|b| b.check(preprocessor.width()).is_ok()));
    }

    #[test]
    fn test_missing_directory() {
        let temp = tempdir().expect("tempdir");
        let err = ArtifactDirectory::open_unverified(temp.path().join("nope"))
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_missing_background_is_none() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());
        fs::remove_file(temp.path().join(BACKGROUND_FILE)).expect("remove background");

        let source = ArtifactDirectory::open_unverified(temp.path()).expect("open");
        assert!(source.load_background().expect("load").is_none());
    }

    #[test]
    fn test_signed_manifest_verifies() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());
        let key = signing_key();
        let pubkey_b64 = write_signed_manifest(temp.path(), &key);

        let policy = IntegrityPolicy {
            require_signature: true,
            public_key_b64: Some(pubkey_b64),
        };
        let source = ArtifactDirectory::open(temp.path(), &policy).expect("verified open");
        assert!(source.is_verified());
        source.load_risk_model().expect("risk model");
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());
        write_signed_manifest(temp.path(), &signing_key());

        let other = base64::engine::general_purpose::STANDARD
            .encode(signing_key().verifying_key().to_bytes());
        let policy = IntegrityPolicy {
            require_signature: false,
            public_key_b64: Some(other),
        };
        let err = ArtifactDirectory::open(temp.path(), &policy).expect_err("must fail");
        assert!(err.to_string().contains("Invalid artifact signature"));
    }

    #[test]
    fn test_tampered_file_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());
        let pubkey_b64 = write_signed_manifest(temp.path(), &signing_key());

        fs::write(
            temp.path().join(SURROGATE_FILE),
            r#"{"weights": [9.0], "bias": 0.0}"#,
        )
        .expect("tamper");

        let policy = IntegrityPolicy {
            require_signature: true,
            public_key_b64: Some(pubkey_b64),
        };
        let err = ArtifactDirectory::open(temp.path(), &policy).expect_err("must fail");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_unlisted_artifact_is_rejected() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());

        let mut manifest =
            ArtifactManifest::for_directory(temp.path(), None).expect("manifest");
        manifest.files.remove(BACKGROUND_FILE);
        fs::write(
            temp.path().join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).expect("serialize"),
        )
        .expect("write manifest");

        let source = ArtifactDirectory::open_unverified(temp.path()).expect("open");
        source.load_metadata().expect("listed file loads");
        let err = source.load_background().expect_err("unlisted must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_required_signature_without_manifest() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());
        let policy = IntegrityPolicy {
            require_signature: true,
            public_key_b64: None,
        };
        assert!(ArtifactDirectory::open(temp.path(), &policy).is_err());
    }

    #[test]
    fn test_malformed_model_is_reported() {
        let temp = tempdir().expect("tempdir");
        copy_demo_artifacts(temp.path());
        fs::write(temp.path().join(RISK_MODEL_FILE), "{not json").expect("write");

        let source = ArtifactDirectory::open_unverified(temp.path()).expect("open");
        let err = source.load_risk_model().expect_err("must fail");
        assert!(matches!(err, ArtifactError::Malformed(_)));
    }
}
