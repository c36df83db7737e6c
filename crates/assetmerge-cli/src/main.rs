use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assetmerge_core::{
    AppConfig, AssetError, AssetStore, DependentKind, ExitCode, NewAsset, SqliteAssetStore,
};
use assetmerge_engine::{Deduplicator, PlannedMerge, RunSummary, census, find_similar};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "assetmerge",
    about = "Find and merge duplicate asset records",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting ASSETMERGE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Asset database, overriding config and ASSETMERGE_DB.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every duplicate group, one transaction per group.
    Run {
        /// Only list the merges that would happen.
        #[arg(long)]
        dry_run: bool,
    },

    /// List planned merges without changing anything.
    Plan,

    /// Report names that are close but not identical.
    Similar {
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Count duplicate serials, tags and name combinations.
    Check {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Insert assets from a JSON array of records.
    Load { file: PathBuf },

    /// Show asset and dependent counts.
    Stats,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective config values.
    List,
    /// Print the config file location.
    Path,
    /// Write a default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code as i32);
}

fn run() -> Result<ExitCode> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("ASSETMERGE_JSON").as_deref() == Ok("1");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    init_tracing(&config.logging.filter);

    let db_path = cli.db.clone().unwrap_or_else(|| config.database_path());
    tracing::debug!(config = %config_path.display(), db = %db_path.display(), "resolved paths");

    let mut exit = ExitCode::Success;
    match cli.command {
        // ── Run / Plan ─────────────────────────────────────────────────────

        Commands::Run { dry_run: true } | Commands::Plan => {
            let store = open_store(&db_path)?;
            let dedup = Deduplicator::from_config(&config.dedup)?;
            let planned = dedup.plan(&store.list_all()?);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": planned, "total": planned.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print_plan(&planned);
            }
        }

        Commands::Run { dry_run: false } => {
            let store = open_store(&db_path)?;
            let dedup = Deduplicator::from_config(&config.dedup)?;
            let summary = dedup.run(&store)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                let status = if summary.has_errors() { "partial" } else { "ok" };
                print_json(&serde_json::json!({
                    "status": status,
                    "data": summary,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print_summary(&summary);
            }

            if summary.has_errors() {
                exit = ExitCode::GroupErrors;
            }
        }

        // ── Reports ────────────────────────────────────────────────────────

        Commands::Similar { threshold } => {
            let store = open_store(&db_path)?;
            let threshold = threshold.unwrap_or(config.dedup.similarity_threshold);
            let pairs = find_similar(&store.list_all()?, threshold);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": pairs, "total": pairs.len(), "threshold": threshold },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if pairs.is_empty() {
                println!("No similar names at threshold {threshold:.2}.");
            } else {
                for pair in &pairs {
                    println!(
                        "{score:>5.1}%  #{left:<6} {left_name:<35} #{right:<6} {right_name}",
                        score = pair.similarity * 100.0,
                        left = pair.left_id,
                        left_name = pair.left_name,
                        right = pair.right_id,
                        right_name = pair.right_name,
                    );
                }
            }
        }

        Commands::Check { limit } => {
            let store = open_store(&db_path)?;
            let limit = limit.unwrap_or(config.dedup.census_limit);
            let report = census(&store.list_all()?, limit);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":report,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Total assets:   {}", report.total_assets);
                println!("Unique serials: {}", report.unique_serials);
                println!("Unique tags:    {}", report.unique_tags);
                println!("Unique names:   {}", report.unique_names);
                for (title, rows) in [
                    ("Duplicate serial numbers", &report.duplicate_serials),
                    ("Duplicate asset tags", &report.duplicate_tags),
                    ("Duplicate name / manufacturer / model", &report.duplicate_name_combos),
                ] {
                    println!("\n{title}:");
                    if rows.is_empty() {
                        println!("  none");
                    }
                    for row in rows {
                        println!("  {}: {} assets", row.key, row.count);
                    }
                }
            }
        }

        // ── Load ───────────────────────────────────────────────────────────

        Commands::Load { file } => {
            let store = open_store(&db_path)?;
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let assets: Vec<NewAsset> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;

            let ids = store.with_transaction(|| {
                assets
                    .iter()
                    .map(|asset| store.insert_asset(asset))
                    .collect::<Result<Vec<_>, AssetError>>()
            })?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "inserted": ids.len(), "ids": ids },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Inserted {} assets into {}", ids.len(), db_path.display());
            }
        }

        // ── Stats ──────────────────────────────────────────────────────────

        Commands::Stats => {
            let store = open_store(&db_path)?;
            let stats = store.stats()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":stats,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Asset store statistics:");
                println!("  Assets:           {}", stats.assets);
                println!("  Locations:        {}", stats.locations);
                println!("  {:<17} {}", format!("{}:", DependentKind::Transactions), stats.transactions);
                println!("  {:<17} {}", format!("{}:", DependentKind::Allocations), stats.allocations);
                println!("  {:<17} {}", format!("{}:", DependentKind::RequestItems), stats.request_items);
                println!(
                    "  {:<17} {} (on hand {}, allocated {})",
                    format!("{}:", DependentKind::InventoryLevels),
                    stats.inventory_levels,
                    stats.quantity_on_hand,
                    stats.quantity_allocated
                );
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::List => {
                    let kv = config_key_values(&config, &db_path);
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":kv,"meta":{"duration_ms":dur}}))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Path => {
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "path": config_path, "exists": config_path.exists() },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("{}", config_path.display());
                    }
                }
                ConfigAction::Init { force } => {
                    if config_path.exists() && !force {
                        bail!(
                            "config already exists at {} (use --force to overwrite)",
                            config_path.display()
                        );
                    }
                    AppConfig::default().save_to(&config_path)?;
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":{"path":config_path},"meta":{"duration_ms":dur}}))?;
                    } else {
                        println!("Wrote default config to {}", config_path.display());
                    }
                }
            }
        }
    }

    Ok(exit)
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn open_store(path: &Path) -> Result<SqliteAssetStore> {
    SqliteAssetStore::open(path).with_context(|| format!("opening {}", path.display()))
}

fn print_plan(planned: &[PlannedMerge]) {
    if planned.is_empty() {
        println!("No duplicate groups found.");
        return;
    }
    for merge in planned {
        println!(
            "{strategy:<24} {key:<40} keep #{survivor} (score {score}), remove {losers:?}",
            strategy = merge.strategy.as_str(),
            key = merge.key,
            survivor = merge.survivor_id,
            score = merge.survivor_score,
            losers = merge.loser_ids,
        );
    }
    println!("\n{} merges planned", planned.len());
}

fn print_summary(summary: &RunSummary) {
    println!("Deduplication summary:");
    println!("  Groups found:        {}", summary.groups_found);
    println!("  Groups merged:       {}", summary.groups_merged);
    println!("  Groups skipped:      {}", summary.groups_skipped);
    println!("  Assets merged into:  {}", summary.assets_merged);
    println!("  Assets removed:      {}", summary.assets_removed);
    println!("  Fields changed:      {}", summary.fields_changed);
    println!("  Dependents relinked: {}", summary.dependents_relinked);
    println!("  Remaining assets:    {}", summary.remaining_assets);

    if summary.has_errors() {
        println!("\n{} groups failed:", summary.error_count);
        for message in &summary.errors {
            println!("  - {message}");
        }
        let hidden = summary.error_count - summary.errors.len();
        if hidden > 0 {
            println!("  ... and {hidden} more");
        }
    }
}

fn config_key_values(
    config: &AppConfig,
    db_path: &Path,
) -> std::collections::BTreeMap<&'static str, String> {
    let mut map = std::collections::BTreeMap::new();
    map.insert("storage.database_path", db_path.to_string_lossy().to_string());
    map.insert("dedup.strategy_order", config.dedup.strategy_order.join(","));
    map.insert("dedup.ignored_names", config.dedup.ignored_names.join(","));
    map.insert(
        "dedup.similarity_threshold",
        config.dedup.similarity_threshold.to_string(),
    );
    map.insert(
        "dedup.max_reported_errors",
        config.dedup.max_reported_errors.to_string(),
    );
    map.insert("dedup.census_limit", config.dedup.census_limit.to_string());
    map.insert("logging.filter", config.logging.filter.clone());
    map
}
