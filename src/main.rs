use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ring_gallery::config::Configuration;
use ring_gallery::events::LibraryEvent;
use ring_gallery::render::viewer;
use ring_gallery::tasks::library;

#[derive(Debug, Parser)]
#[command(name = "ring-gallery", version, about = "infinite circular media gallery")]
struct Args {
    /// Path to YAML config; built-in defaults apply when the file is absent
    #[arg(long = "config", value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,
    /// Override the configured media directory
    #[arg(long = "items-dir", value_name = "DIR")]
    items_dir: Option<PathBuf>,
    /// Deterministic shuffle seed (overrides library.shuffle-seed)
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<u64>,
    /// Print the discovered item list without launching the UI
    #[arg(long = "items-dry-run")]
    items_dry_run: bool,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::new(format!("{level},wgpu=warn,winit=warn"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        items_dir,
        seed,
        items_dry_run,
        verbose,
    } = Args::parse();

    // RUST_LOG wins over the -v flags when set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut cfg = if config.exists() {
        Configuration::from_yaml_file(&config)
            .with_context(|| format!("failed to load configuration from {}", config.display()))?
            .validated()
            .context("invalid configuration values")?
    } else {
        tracing::info!(
            config = %config.display(),
            "config file not found; using built-in defaults"
        );
        Configuration::default()
    };
    if let Some(dir) = items_dir {
        cfg.library.items_dir = Some(dir);
    }
    if let Some(seed) = seed {
        cfg.library.shuffle_seed = Some(seed);
    }
    tracing::debug!("effective configuration:\n{:#?}", cfg);

    let items = library::discover_items(&cfg.library).context("item discovery failed")?;

    if items_dry_run {
        println!("# item dry run\n# items: {}\n", items.len());
        if items.is_empty() {
            println!("(no items discovered; the gallery would show built-in placeholders)");
        }
        for (idx, item) in items.iter().enumerate() {
            let source = item
                .path
                .as_ref()
                .map_or_else(|| "(placeholder)".to_string(), |p| p.display().to_string());
            println!("  {:>4}: {:<32} {}", idx + 1, item.caption, source);
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();

    // Ctrl-D/Ctrl-C cancel the pipeline
    if io::stdin().is_terminal() {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            match io::stdin().read_to_end(&mut sink) {
                Ok(_) => tracing::info!("stdin closed; initiating shutdown"),
                Err(err) => tracing::warn!("stdin watcher failed: {err}"),
            }
            cancel.cancel();
        });
    } else {
        tracing::debug!("stdin is not a terminal; skipping shutdown watcher");
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let (library_tx, library_rx) = mpsc::channel::<LibraryEvent>(8);

    let mut tasks = JoinSet::new();
    tasks.spawn({
        let library_cfg = cfg.library.clone();
        let cancel = cancel.clone();
        async move {
            library::run(library_cfg, library_tx, cancel)
                .await
                .context("library task failed")
        }
    });

    // Run the windowed gallery on the main thread (blocking) after spawning
    // the other tasks; returns when the window closes or cancellation fires.
    if let Err(e) =
        viewer::run_windowed(items, cfg, cancel.clone(), library_rx).context("gallery failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
