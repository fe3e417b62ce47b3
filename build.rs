use std::{env, path::PathBuf};

use anyhow::Result;
use fs_extra::dir::{CopyOptions, copy};

/// Mirrors `assets/` into `OUT_DIR` so packaged builds carry the textures and
/// the typeface next to the binary.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.is_dir() {
        println!("cargo:warning=no assets directory, the scene will start without textures and text");
        return Ok(());
    }

    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy(&assets, env::var("OUT_DIR")?, &options)?;
    Ok(())
}
