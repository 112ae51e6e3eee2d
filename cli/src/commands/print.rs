//! Print command - render the flattened tree without touching the store

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use confsync::ConfigLoader;
use std::path::PathBuf;

use crate::output;

#[derive(Args)]
pub struct PrintArgs {
    /// Directory holding the YAML config tree
    #[arg(short = 'c', long, default_value = "config", env = "CONFSYNC_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Store root to render the keys under. Namespaces are not resolved
    /// here; print stays fully offline.
    #[arg(long, env = "CONFSYNC_ROOT")]
    pub root: String,

    /// Account id used for document inclusion and key normalization
    #[arg(long, env = "CONFSYNC_ACCOUNT")]
    pub account: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub fn run(args: PrintArgs) -> Result<()> {
    let loader = ConfigLoader::new(&args.config_dir, args.root.as_str(), args.account.clone())?;
    let groups = loader.load()?;

    if args.json {
        let documents: Vec<serde_json::Value> = groups
            .iter()
            .map(|group| {
                serde_json::json!({
                    "document": group.relative_path,
                    "root": group.root,
                    "entries": group
                        .entries
                        .iter()
                        .map(|entry| serde_json::json!({
                            "name": entry.key,
                            "value": entry.value
                        }))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    output::header("Flattened Configuration");
    for group in &groups {
        println!();
        output::subheader(&group.relative_path);
        for entry in &group.entries {
            println!("  {}  {}", format!("{}:", entry.key).dimmed(), entry.value);
        }
    }

    let total: usize = groups.iter().map(|group| group.entries.len()).sum();
    println!();
    output::success(&format!(
        "{} parameters across {} documents",
        total,
        groups.len()
    ));

    Ok(())
}
