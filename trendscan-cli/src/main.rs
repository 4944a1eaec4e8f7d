//! TrendScan CLI: scan, snapshot, winrate and config commands.
//!
//! Commands:
//! - `scan`: run the engine over a universe and emit signals (JSON lines,
//!   sheet rows or alert text)
//! - `snapshot`: print the ungated evaluation for one symbol
//! - `winrate`: print the win-rate replay for one symbol
//! - `config show` / `config check`: effective configuration and validation
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trendscan_core::data::{BarProvider, CsvProvider, SyntheticProvider, Universe};
use trendscan_core::sink::{JsonLinesSink, SheetRowSink, SignalSink, TextSink};
use trendscan_core::{CooldownTracker, EngineConfig, SignalEngine};

#[derive(Parser)]
#[command(
    name = "trendscan",
    about = "TrendScan: trend signals with risk-sized trade plans"
)]
struct Cli {
    /// Engine config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Directory with one `<SYMBOL>.csv` per symbol.
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Use deterministic synthetic bars instead of files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Mean daily return for synthetic bars.
    #[arg(long, default_value_t = 0.0, requires = "synthetic")]
    drift: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a universe and emit signals.
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Universe file (TOML). Defaults to the built-in NSE large caps.
        #[arg(long, conflicts_with = "symbols")]
        universe: Option<PathBuf>,

        /// Explicit symbols, already exchange-qualified.
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write signals here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Omit the header row in CSV output (for appending to a sheet).
        #[arg(long, default_value_t = false)]
        no_header: bool,

        /// Number of scan passes; the cooldown carries across passes.
        #[arg(long, default_value_t = 1)]
        passes: u32,

        /// Seconds to sleep between passes.
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
    /// Print indicators, verdict, plan and win rate for one symbol.
    Snapshot {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        symbol: String,

        /// Live quote to use instead of the last close.
        #[arg(long)]
        quote: Option<f64>,
    },
    /// Replay the classifier over recent history for one symbol.
    Winrate {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        symbol: String,

        /// Override the number of decision bars.
        #[arg(long)]
        lookback: Option<usize>,

        /// Print every trial, not just the totals.
        #[arg(long, default_value_t = false)]
        trials: bool,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (file + environment) as TOML.
    Show,
    /// Validate a config file and print its fingerprint.
    Check { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            source,
            universe,
            symbols,
            format,
            output,
            no_header,
            passes,
            interval_secs,
        } => {
            let engine = build_engine(cli.config.as_deref())?;
            let symbols = resolve_symbols(universe.as_deref(), symbols)?;
            let provider = build_provider(&source)?;
            let sink = open_sink(format, output.as_deref(), !no_header)?;
            run_scan(
                &engine,
                provider.as_ref(),
                &symbols,
                sink,
                passes,
                Duration::from_secs(interval_secs),
            )
        }
        Commands::Snapshot {
            source,
            symbol,
            quote,
        } => {
            let engine = build_engine(cli.config.as_deref())?;
            let provider = build_provider(&source)?;
            run_snapshot(&engine, provider.as_ref(), &symbol, quote)
        }
        Commands::Winrate {
            source,
            symbol,
            lookback,
            trials,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(lookback) = lookback {
                config.backtest.lookback_bars = lookback;
            }
            let engine = SignalEngine::new(config)?;
            let provider = build_provider(&source)?;
            run_winrate(&engine, provider.as_ref(), &symbol, trials)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", config.to_toml()?);
                println!("# fingerprint: {}", config.fingerprint()?);
                Ok(())
            }
            ConfigAction::Check { path } => {
                let config = EngineConfig::from_file(&path)?;
                config
                    .validate()
                    .with_context(|| format!("{} is invalid", path.display()))?;
                println!("{}: ok ({})", path.display(), config.fingerprint()?);
                Ok(())
            }
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    load_config_with(path, |var| std::env::var(var).ok())
}

fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<EngineConfig>
where
    F: Fn(&'static str) -> Option<String>,
{
    let config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    Ok(config.with_overrides_from(lookup)?)
}

fn build_engine(path: Option<&Path>) -> Result<SignalEngine> {
    Ok(SignalEngine::new(load_config(path)?)?)
}

fn build_provider(source: &SourceArgs) -> Result<Box<dyn BarProvider>> {
    match (&source.data_dir, source.synthetic) {
        (Some(dir), false) => {
            if !dir.is_dir() {
                bail!("data directory does not exist: {}", dir.display());
            }
            Ok(Box::new(CsvProvider::new(dir)))
        }
        (None, true) => Ok(Box::new(
            SyntheticProvider::new(Utc::now()).with_drift(source.drift),
        )),
        (Some(_), true) => bail!("--data-dir and --synthetic are mutually exclusive"),
        (None, false) => bail!("one of --data-dir or --synthetic is required"),
    }
}

fn resolve_symbols(universe: Option<&Path>, symbols: Vec<String>) -> Result<Vec<String>> {
    if !symbols.is_empty() {
        return Ok(symbols);
    }
    let universe = match universe {
        Some(path) => Universe::from_file(path)?,
        None => Universe::nse_top_100(),
    };
    let symbols = universe.qualified_symbols();
    if symbols.is_empty() {
        bail!("universe '{}' has no symbols", universe.name);
    }
    Ok(symbols)
}

fn open_sink(
    format: OutputFormat,
    output: Option<&Path>,
    header: bool,
) -> Result<Box<dyn SignalSink>> {
    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    Ok(match format {
        OutputFormat::Json => Box::new(JsonLinesSink::new(out)),
        OutputFormat::Csv => Box::new(SheetRowSink::new(out, header)?),
        OutputFormat::Text => Box::new(TextSink::new(out)),
    })
}

fn run_scan(
    engine: &SignalEngine,
    provider: &dyn BarProvider,
    symbols: &[String],
    mut sink: Box<dyn SignalSink>,
    passes: u32,
    interval: Duration,
) -> Result<()> {
    let tracker = CooldownTracker::new(engine.config().cooldown);
    info!(
        symbols = symbols.len(),
        provider = provider.name(),
        passes,
        "starting scan"
    );

    for pass in 0..passes.max(1) {
        if pass > 0 {
            std::thread::sleep(interval);
            tracker.prune(Utc::now());
        }
        let report = engine.scan(provider, symbols, Utc::now(), &tracker);
        for signal in &report.signals {
            sink.emit(signal)?;
        }
        sink.flush()?;
    }
    Ok(())
}

fn run_snapshot(
    engine: &SignalEngine,
    provider: &dyn BarProvider,
    symbol: &str,
    quote: Option<f64>,
) -> Result<()> {
    let bars = provider.fetch(symbol, engine.history_bars())?;
    let evaluation = engine.evaluate(symbol, &bars, quote);
    println!("{}", serde_json::to_string_pretty(&evaluation)?);
    Ok(())
}

fn run_winrate(
    engine: &SignalEngine,
    provider: &dyn BarProvider,
    symbol: &str,
    show_trials: bool,
) -> Result<()> {
    let bars = provider.fetch(symbol, engine.history_bars())?;
    let report = engine.backtester().run(&bars);

    println!("{symbol}: {} bars", bars.len());
    println!("  decisions:    {}", report.evaluated);
    println!("  signals:      {}", report.total_signals);
    println!("  wins:         {}", report.wins);
    println!("  losses:       {}", report.losses);
    println!("  inconclusive: {}", report.inconclusive);
    match report.win_rate {
        Some(wr) => println!("  win rate:     {wr:.1}%"),
        None => println!("  win rate:     N/A"),
    }

    if show_trials {
        for trial in &report.trials {
            let timestamp = bars[trial.index].timestamp.format("%Y-%m-%d");
            println!(
                "  {timestamp} {} entry {:.2} stop {:.2} target {:.2} -> {:?}",
                trial.direction, trial.entry, trial.stop_loss, trial.target, trial.outcome
            );
        }
    }
    Ok(())
}
