//! Implementation of the `meld init` command.
//!
//! Creates the `.meld/` working directories and writes a default
//! `config.yaml` if none exists. Running it again is harmless: an existing
//! config is left untouched.

use crate::cli::InitArgs;
use crate::config::Config;
use crate::context::{BuildContext, resolve_context};
use crate::error::Result;
use crate::events::{Event, EventAction, append_event};
use crate::fs::atomic_write_file;
use serde_json::json;

pub fn cmd_init(args: InitArgs) -> Result<()> {
    let ctx = resolve_context(args.root.as_deref())?;
    let wrote_config = init_build_root(&ctx)?;

    println!("Initialized meld in {}", ctx.root.display());
    println!();
    println!("  {}", ctx.config_path().display());
    if !wrote_config {
        println!("    (existing config kept)");
    }
    println!("  {}", ctx.logs_dir.display());
    println!("  {}", ctx.export_dir.display());
    println!();
    println!("Edit config.yaml to point at your compiler driver, then run `meld build <agenda>`.");

    Ok(())
}

/// Create the working layout. Returns true if a default config was written.
fn init_build_root(ctx: &BuildContext) -> Result<bool> {
    ctx.ensure_dirs()?;

    let config_path = ctx.config_path();
    let wrote_config = !config_path.exists();
    if wrote_config {
        atomic_write_file(&config_path, &Config::default().to_yaml()?)?;
    }

    append_event(
        ctx,
        &Event::new(EventAction::Init).with_details(json!({
            "root": ctx.root.display().to_string(),
            "wrote_config": wrote_config,
        })),
    )?;

    Ok(wrote_config)
}
