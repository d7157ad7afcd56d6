use std::path::Path;

use ambonmud_engine::world::{load_world, read_zone_directory};
use ambonmud_shared::config::GameplayConfig;
use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("validate-world") => {
            let dir = args.next().unwrap_or_else(|| "world".to_string());
            validate_world(&dir)
        }
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  validate-world [dir]\n  arch-check"),
    }
}

/// Loads every zone document under `dir` and runs them through the same
/// merge-and-validate pass the engine runs at boot, without starting a
/// server. Exits non-zero with the first validation failure.
fn validate_world(dir: &str) -> anyhow::Result<()> {
    let documents = read_zone_directory(Path::new(dir)).context("reading zone documents")?;
    if documents.is_empty() {
        anyhow::bail!("no zone documents found under '{dir}'");
    }

    let mob_tiers = GameplayConfig::default().mob_tiers;
    let world = load_world(&documents, &mob_tiers, &Default::default()).context("merging zone documents")?;

    println!(
        "ok: {} zone document(s), {} room(s), {} mob spawn(s), {} item spawn(s)",
        documents.len(),
        world.rooms.len(),
        world.mob_spawns.len(),
        world.item_spawns.len(),
    );
    Ok(())
}

fn arch_check() -> anyhow::Result<()> {
    // Minimal placeholder; actual check implemented after crates are wired.
    // We keep it functional so `cargo run -p xtask -- arch-check` works.
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    Ok(())
}
