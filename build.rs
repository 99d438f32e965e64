//! Build script for tunehub.
//!
//! Copies the provider configuration template to the user's local data
//! directory so an annotated example sits next to the generated
//! `providers.json` after installation.

use std::{env, fs, path::PathBuf};

/// Copies `providers.example.json` from the crate root into the data directory.
///
/// # Destination Location
///
/// - Linux: `~/.local/share/tunehub/providers.example.json`
/// - macOS: `~/Library/Application Support/tunehub/providers.example.json`
/// - Windows: `%LOCALAPPDATA%/tunehub/providers.example.json`
///
/// # Error Handling
///
/// A missing template or an unwritable data directory only produces a
/// `cargo:warning`; sandboxed builds must not fail because of it. Failing to
/// read `CARGO_MANIFEST_DIR` is fatal.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=providers.example.json");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join("providers.example.json");
    if !template.is_file() {
        println!(
            "cargo:warning=providers.example.json not found at {}",
            template.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("tunehub");
    if let Err(e) = fs::create_dir_all(&out_dir) {
        println!("cargo:warning=cannot create {}: {}", out_dir.display(), e);
        return Ok(());
    }

    if let Err(e) = fs::copy(&template, out_dir.join("providers.example.json")) {
        println!("cargo:warning=cannot copy configuration template: {}", e);
    }

    Ok(())
}
