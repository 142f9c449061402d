// Writes the gantry man page: `generate-man [OUT_DIR]` (default: man/)

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::CommandFactory;
use gantry::cli::Cli;

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let command = Cli::command();
    let mut page = Vec::new();
    clap_mangen::Man::new(command.clone()).render(&mut page)?;
    let path = out_dir.join("gantry.1");
    fs::write(&path, page).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());

    for sub in command.get_subcommands() {
        let mut page = Vec::new();
        clap_mangen::Man::new(sub.clone()).render(&mut page)?;
        let path = out_dir.join(format!("gantry-{}.1", sub.get_name()));
        fs::write(&path, page).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
