//! Destroy command - delete every parameter the config tree defines
//!
//! The inverse of deploy. Only names derived from the loaded documents
//! are removed; names already absent are tolerated.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use confsync::{
    ConfigLoader, ReconcileEngine, RetryPolicy, SsmParameterStore, StsIdentityResolver,
    SyncOptions, resolve_account, resolve_target_root, validate_store_root
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::output;

#[derive(Args)]
pub struct DestroyArgs {
    /// Directory holding the YAML config tree
    #[arg(short = 'c', long, default_value = "config", env = "CONFSYNC_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Store root the tree was deployed under
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

    /// Attempts per remote call before giving up
    #[arg(long, default_value_t = 10, env = "CONFSYNC_RETRY_ATTEMPTS")]
    pub retry_attempts: u32,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Override the AWS endpoint (LocalStack, test servers)
    #[arg(long, env = "CONFSYNC_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Count the parameters without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

fn root_source(args: &DestroyArgs) -> Result<RootSource<'_>> {
    match (args.root.as_deref(), args.namespace.as_deref()) {
        (Some(root), _) => {
            validate_store_root(root)?;
            Ok(RootSource::Fixed(root))
        }
        (None, Some(namespace)) => Ok(RootSource::Namespace(namespace)),
        (None, None) => bail!("either --root or --namespace is required")
    }
}

enum RootSource<'a> {
    Fixed(&'a str),
    Namespace(&'a str)
}

pub async fn run(args: DestroyArgs) -> Result<()> {
    let source = root_source(&args)?;
    let retry = RetryPolicy::with_max_attempts(args.retry_attempts);
    let options = SyncOptions {
        account: None,
        dry_run: args.dry_run,
        retry: retry.clone(),
        ..Default::default()
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
        output::header("Parameter Store Destroy");
        println!();
        println!("  {} {}", "Store root:".dimmed(), store_root.cyan());
        if let Some(account) = &account {
            println!("  {} {}", "Account:".dimmed(), account.cyan());
        }
        println!();
    }

    let engine = ReconcileEngine::new(store, options);
    let removed = engine.destroy(&groups).await?;

    if args.json {
        let payload = serde_json::json!({
            "store_root": store_root,
            "account": account,
            "dry_run": args.dry_run,
            "removed": removed
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("  {} {} parameters removed", "✓".green(), removed);
    println!();

    if args.dry_run {
        output::hint("Remove --dry-run to delete these parameters");
    } else {
        output::success("Destroy completed");
    }

    Ok(())
}
