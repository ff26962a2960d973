//! `berth diff` command

use anyhow::Result;

use crate::cli::DiffArgs;
use berth::ops::{diff_install_state, DiffOptions};

pub fn execute(args: DiffArgs) -> Result<()> {
    let opts = DiffOptions {
        input: args.input,
        manifest: args.manifest,
        pods_dir: args.pods_dir,
        update: args.update,
        save: args.save,
    };

    let state = diff_install_state(&opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    for line in state.display_lines() {
        println!("{}", line);
    }
    if !state.needs_install() {
        println!("Nothing to install");
    }

    Ok(())
}
