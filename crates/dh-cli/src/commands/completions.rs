//! `completions` (supplemented, §C): shell completion script generation.

use crate::cli::build_cli_command;
use clap_complete::{generate, Shell};
use std::{fs, io, path::Path};

pub fn handle(shell: Shell, out: Option<&Path>) -> std::io::Result<()> {
    let mut cmd = build_cli_command();
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        generate(shell, &mut cmd, "dh", &mut file);
        println!("wrote {shell:?} completion to {}", path.display());
    } else {
        let stdout = &mut io::stdout();
        generate(shell, &mut cmd, "dh", stdout);
    }
    Ok(())
}
