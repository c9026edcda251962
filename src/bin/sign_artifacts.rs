//! Artifact signing utility.
//!
//! Writes `manifest.json` (SHA-256 of every artifact in the directory) and
//! `model.sig` (Ed25519 signature over the manifest bytes).
//!
//! # Usage
//!
//! ```bash
//! sign_artifacts <model_dir>
//! sign_artifacts --generate-key
//! ```
//!
//! The signing seed (base64, 32 bytes) is read from the file named by
//! `GLYCORISK_SIGNING_KEY_B64_FILE`, or from `GLYCORISK_SIGNING_KEY_B64` in
//! debug builds. The verifying key printed at the end goes into
//! `GLYCORISK_ARTIFACT_PUBKEY_B64`.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use glycorisk::adapters::artifact_dir::{MANIFEST_FILE, SIGNATURE_FILE};
use glycorisk::adapters::ArtifactManifest;

const KEY_FILE_ENV: &str = "GLYCORISK_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "GLYCORISK_SIGNING_KEY_B64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        );
        return Ok(Zeroizing::new(content.trim().to_string()));
    }

    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_ENV) {
            return Ok(Zeroizing::new(v.trim().to_string()));
        }
    }

    bail!("Missing signing key. Set {KEY_FILE_ENV} (or {KEY_ENV} in debug builds).")
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    if b64.is_empty() {
        bail!("Empty signing key");
    }
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| anyhow!("Invalid base64 in signing key: {e}"))?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn unix_now() -> Option<i64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
}

fn generate_key() {
    let mut seed = Seed([0u8; 32]);
    rand::rngs::OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);

    println!("Signing seed (keep secret): {}", general_purpose::STANDARD.encode(seed.0));
    println!(
        "GLYCORISK_ARTIFACT_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
    );
}

fn sign(model_dir: PathBuf) -> Result<()> {
    if !model_dir.is_dir() {
        bail!("{} is not a directory", model_dir.display());
    }

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = ArtifactManifest::for_directory(&model_dir, unix_now())?;
    if manifest.files.is_empty() {
        bail!("No artifacts found in {}", model_dir.display());
    }

    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest.json")?;
    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes())
        .with_context(|| format!("Failed to write {}", sig_path.display()))?;

    for name in manifest.files.keys() {
        println!("Bound: {name}");
    }
    println!("Signed manifest: {}", manifest_path.display());
    println!("Wrote signature: {}", sig_path.display());
    println!(
        "GLYCORISK_ARTIFACT_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
    );
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [flag] if flag == "--generate-key" => {
            generate_key();
            Ok(())
        }
        [dir] if !dir.starts_with('-') => sign(PathBuf::from(dir)),
        _ => bail!("Usage: sign_artifacts <model_dir> | --generate-key"),
    }
}
