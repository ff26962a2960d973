//! `berth targets` command

use anyhow::Result;

use crate::cli::TargetsArgs;
use crate::commands::current_config;
use berth::ops::{format_report, generate_targets, GenerateOptions, GraphReport};
use berth::util::Diagnostic;

pub fn execute(args: TargetsArgs) -> Result<()> {
    let mut installation = current_config()?.installation_options();
    if args.no_deduplicate {
        installation.deduplicate_targets = false;
    }

    let opts = GenerateOptions {
        input: args.input,
        installation,
    };
    let graph = generate_targets(&opts)?;

    if graph.aggregates().is_empty() {
        eprint!(
            "{}",
            Diagnostic::warning(format!(
                "{} resolves no concrete targets",
                opts.input.display()
            ))
            .with_suggestion("Add a [[resolved]] table for a target that is not abstract")
        );
    }

    let report = GraphReport::from_graph(&graph);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }

    Ok(())
}
