//! Deploy command - reconcile a config tree into the parameter store
//!
//! Loads the YAML tree, snapshots the store under the loaded roots, then
//! writes changed values and deletes orphaned names. A second deploy over
//! unchanged input is a no-op.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use confsync::{
    ConfigLoader, ReconcileEngine, ReconcileReport, RetryPolicy, SsmParameterStore,
    StsIdentityResolver, SyncOptions, resolve_account, resolve_target_root, split_at_depth,
    validate_store_root
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::output;

#[derive(Args)]
pub struct DeployArgs {
    /// Directory holding the YAML config tree
    #[arg(short = 'c', long, default_value = "config", env = "CONFSYNC_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Store root the tree deploys under (e.g. /teams/payments)
    #[arg(long, env = "CONFSYNC_ROOT", conflicts_with = "namespace")]
    pub root: Option<String>,

    /// Deployment namespace, resolved through the deploy-targets scope
    #[arg(short = 'n', long, env = "CONFSYNC_NAMESPACE")]
    pub namespace: Option<String>,

    /// Load every document regardless of account ownership
    #[arg(long)]
    pub no_account_filter: bool,

    /// Account id override; skips the caller identity lookup
    #[arg(long, env = "CONFSYNC_ACCOUNT")]
    pub account: Option<String>,

    /// Reconcile groups in buckets sharing a name prefix of this depth
    #[arg(long, env = "CONFSYNC_SPLIT_DEPTH")]
    pub split_depth: Option<usize>,

    /// Names per bulk delete call (the store caps this at 10)
    #[arg(long, default_value_t = 8, env = "CONFSYNC_DELETE_BATCH_SIZE")]
    pub delete_batch_size: usize,

    /// Attempts per remote call before giving up
    #[arg(long, default_value_t = 10, env = "CONFSYNC_RETRY_ATTEMPTS")]
    pub retry_attempts: u32,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Override the AWS endpoint (LocalStack, test servers)
    #[arg(long, env = "CONFSYNC_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Tally changes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

enum RootSource<'a> {
    Fixed(&'a str),
    Namespace(&'a str)
}

/// Argument validation happens here, before any AWS client exists.
fn root_source(args: &DeployArgs) -> Result<RootSource<'_>> {
    match (args.root.as_deref(), args.namespace.as_deref()) {
        (Some(root), _) => {
            validate_store_root(root)?;
            Ok(RootSource::Fixed(root))
        }
        (None, Some(namespace)) => Ok(RootSource::Namespace(namespace)),
        (None, None) => bail!("either --root or --namespace is required")
    }
}

pub async fn run(args: DeployArgs) -> Result<()> {
    let source = root_source(&args)?;
    let retry = RetryPolicy::with_max_attempts(args.retry_attempts);
    let options = SyncOptions {
        account: None,
        delete_batch_size: args.delete_batch_size,
        dry_run: args.dry_run,
        retry: retry.clone()
    };
    options.validate()?;

    let store = Arc::new(
        SsmParameterStore::connect(retry.clone(), args.region.clone(), args.endpoint_url.clone())
            .await
    );
    let resolver =
        StsIdentityResolver::connect(retry, args.region.clone(), args.endpoint_url.clone()).await;
    let account = resolve_account(!args.no_account_filter, args.account.clone(), &resolver).await?;

    let store_root = match source {
        RootSource::Fixed(root) => root.to_string(),
        RootSource::Namespace(namespace) => resolve_target_root(store.as_ref(), namespace).await?
    };

    let loader = ConfigLoader::new(&args.config_dir, store_root.as_str(), account.clone())?;
    let groups = loader.load()?;
    let options = SyncOptions { account, ..options };
    let account = options.account.clone();

    if !args.json {
        output::header("Parameter Store Deploy");
        println!();
        println!(
            "  {} {}",
            "Config dir:".dimmed(),
            args.config_dir.display().to_string().cyan()
        );
        println!("  {} {}", "Store root:".dimmed(), store_root.cyan());
        if let Some(account) = &account {
            println!("  {} {}", "Account:".dimmed(), account.cyan());
        }
        println!(
            "  {} {}",
            "Documents:".dimmed(),
            groups.len().to_string().cyan()
        );
        println!();
    }

    let engine = ReconcileEngine::new(store, options);
    let report = match args.split_depth {
        Some(depth) => {
            let mut merged = ReconcileReport::new();
            for bucket in &split_at_depth(&groups, depth) {
                merged.merge(engine.reconcile(&bucket.groups).await?);
            }
            merged.complete();
            merged
        }
        None => engine.reconcile(&groups).await?
    };

    if args.json {
        let payload = serde_json::json!({
            "store_root": store_root,
            "account": account,
            "dry_run": args.dry_run,
            "report": report
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("  {} {} parameters updated", "✓".green(), report.updated);
    println!("  {} {} parameters deleted", "✓".green(), report.deleted);
    println!("  {} {} parameters untouched", "✓".green(), report.untouched);
    if !report.unresolved.is_empty() {
        println!(
            "  {} {} names unresolved",
            "✗".red(),
            report.unresolved.len().to_string().red()
        );
        for name in &report.unresolved {
            println!("    {}", name.red());
        }
    }
    println!();

    if args.dry_run {
        output::hint("Remove --dry-run to apply these changes");
    } else if report.is_clean() {
        output::success("Deploy completed");
    } else {
        output::warn(&format!(
            "Deploy completed with {} unresolved deletions",
            report.unresolved.len()
        ));
    }

    Ok(())
}
