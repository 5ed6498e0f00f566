//! MomentumLab CLI: signal cycles, option pricing and position management.
//!
//! Commands:
//! - `universe`: rank the candidate universe for one direction
//! - `long`: long momentum recommendations
//! - `short`: short momentum candidates with put structures; `--open` sizes and opens them
//! - `price`: Black-Scholes price and Greeks, or a delta-targeted strike
//! - `manage`: value open positions and apply exit rules
//! - `positions`: show open positions and closed history
//! - `synth`: write a seeded synthetic snapshot
//! - `config`: print the default configuration

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use momentumlab_core::domain::Direction;
use momentumlab_core::pricing::{price, OptionKind, PricingInput};
use momentumlab_core::solver::StrikeSolver;
use momentumlab_runner::persistence::StoreFile;
use momentumlab_runner::report::MarkdownReport;
use momentumlab_runner::session::{load_config, rank_universe_at, run_long, run_manage, run_short};
use momentumlab_runner::synthetic::{generate_snapshot, SyntheticSpec};
use momentumlab_runner::{save_snapshot, EngineConfig};

#[derive(Parser)]
#[command(
    name = "momentumlab",
    about = "MomentumLab CLI, momentum signals and options strategy engine"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Long,
    Short,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Put,
    Call,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the universe with the long or short filter preset.
    Universe {
        /// Snapshot directory (prices/, fundamentals.csv, volatility.csv).
        #[arg(long, default_value = "data")]
        data: PathBuf,

        #[arg(long, value_enum, default_value = "long")]
        variant: Variant,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Long momentum recommendations.
    Long {
        #[arg(long, default_value = "data")]
        data: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Append signals to this JSONL file.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print JSON instead of markdown.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Short momentum candidates with put structures.
    Short {
        #[arg(long, default_value = "data")]
        data: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        history: Option<PathBuf>,

        /// Position store file.
        #[arg(long, default_value = "state/positions.json")]
        store: PathBuf,

        /// Size and open every ENTER candidate.
        #[arg(long, default_value_t = false)]
        open: bool,

        /// Account capital used for sizing (required with --open).
        #[arg(long)]
        capital: Option<f64>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Price an option, or solve the strike for a target delta.
    Price {
        #[arg(long)]
        spot: f64,

        /// Strike; omit together with --delta to solve for it.
        #[arg(long)]
        strike: Option<f64>,

        /// Target delta, e.g. -0.30 for a put.
        #[arg(long, allow_hyphen_values = true)]
        delta: Option<f64>,

        /// Calendar days to expiry.
        #[arg(long)]
        dte: i64,

        /// Annualized volatility as a fraction (0.30 = 30%).
        #[arg(long)]
        vol: f64,

        #[arg(long, default_value_t = 0.05)]
        rate: f64,

        #[arg(long, value_enum, default_value = "put")]
        kind: Kind,
    },
    /// Value open positions against a snapshot and apply exit rules.
    Manage {
        #[arg(long, default_value = "data")]
        data: PathBuf,

        #[arg(long, default_value = "state/positions.json")]
        store: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show open positions and the closed-position history.
    Positions {
        #[arg(long, default_value = "state/positions.json")]
        store: PathBuf,
    },
    /// Write a seeded synthetic snapshot.
    Synth {
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Comma-separated tickers.
        #[arg(long, value_delimiter = ',', default_value = "AAA,BBB,CCC,DDD,EEE,FFF,GGG,HHH")]
        tickers: Vec<String>,

        #[arg(long, default_value_t = 320)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Last bar date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Universe { data, variant, config } => run_universe(&data, variant, config.as_deref()),
        Commands::Long {
            data,
            config,
            history,
            json,
        } => run_long_cmd(&data, config.as_deref(), history.as_deref(), json),
        Commands::Short {
            data,
            config,
            history,
            store,
            open,
            capital,
            json,
        } => run_short_cmd(&data, config.as_deref(), history.as_deref(), &store, open, capital, json),
        Commands::Price {
            spot,
            strike,
            delta,
            dte,
            vol,
            rate,
            kind,
        } => run_price(spot, strike, delta, dte, vol, rate, kind),
        Commands::Manage { data, store, config } => run_manage_cmd(&data, &store, config.as_deref()),
        Commands::Positions { store } => run_positions(&store),
        Commands::Synth {
            out,
            tickers,
            days,
            seed,
            end,
        } => run_synth(&out, tickers, days, seed, end),
        Commands::Config => {
            print!("{}", EngineConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = load_config(path)?;
    debug!(
        source = %path.map_or("defaults".to_string(), |p| p.display().to_string()),
        hash = %config.config_hash(),
        "config loaded"
    );
    Ok(config)
}

fn run_universe(data: &Path, variant: Variant, config: Option<&Path>) -> Result<()> {
    let config = engine_config(config)?;
    let direction = match variant {
        Variant::Long => Direction::Long,
        Variant::Short => Direction::Short,
    };
    let ranking = rank_universe_at(data, &config, direction)?;
    print!("{}", MarkdownReport.universe(&ranking));
    Ok(())
}

fn run_long_cmd(data: &Path, config: Option<&Path>, history: Option<&Path>, json: bool) -> Result<()> {
    let config = engine_config(config)?;
    let cycle = run_long(data, &config, history)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&cycle)?);
    } else {
        print!("{}", MarkdownReport.long(&cycle));
    }
    Ok(())
}

fn run_short_cmd(
    data: &Path,
    config: Option<&Path>,
    history: Option<&Path>,
    store: &Path,
    open: bool,
    capital: Option<f64>,
    json: bool,
) -> Result<()> {
    let capital = match (open, capital) {
        (true, Some(c)) if c.is_finite() && c > 0.0 => Some(c),
        (true, Some(c)) => bail!("--capital must be positive, got {c}"),
        (true, None) => bail!("--open requires --capital"),
        (false, _) => None,
    };
    let config = engine_config(config)?;
    let run = run_short(data, &config, history, store, capital)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.cycle)?);
    } else {
        print!("{}", MarkdownReport.short(&run.cycle));
    }
    if let Some(report) = run.opened {
        println!();
        for (ticker, id) in &report.opened {
            println!("Opened {ticker}: {id}");
        }
        for (ticker, reason) in &report.rejected {
            println!("Not opened {ticker}: {reason}");
        }
        println!("Store saved to: {}", store.display());
    }
    Ok(())
}

fn run_price(
    spot: f64,
    strike: Option<f64>,
    delta: Option<f64>,
    dte: i64,
    vol: f64,
    rate: f64,
    kind: Kind,
) -> Result<()> {
    let kind = match kind {
        Kind::Put => OptionKind::Put,
        Kind::Call => OptionKind::Call,
    };
    let template = PricingInput::from_dte(spot, spot, dte, rate, vol, kind);

    let input = match (strike, delta) {
        (Some(k), None) => template.with_strike(k),
        (None, Some(target)) => {
            let solution = StrikeSolver::default().solve(&template, target)?;
            println!(
                "Solved strike {:.2} for delta {target:+.2} in {} iterations",
                solution.strike, solution.iterations
            );
            template.with_strike(solution.strike)
        }
        _ => bail!("give exactly one of --strike or --delta"),
    };

    let q = price(&input)?;
    println!("{kind} {:.2} @ spot {spot:.2}, {dte} DTE, vol {:.1}%", input.strike, vol * 100.0);
    println!("  Price: {:.4}", q.price);
    println!("  Delta: {:+.4}", q.greeks.delta);
    println!("  Gamma: {:.4}", q.greeks.gamma);
    println!("  Theta: {:+.4} / day", q.greeks.theta);
    println!("  Vega:  {:.4} / 1% vol", q.greeks.vega);
    println!("  Rho:   {:+.4} / 1% rate", q.greeks.rho);
    Ok(())
}

fn run_manage_cmd(data: &Path, store: &Path, config: Option<&Path>) -> Result<()> {
    let config = engine_config(config)?;
    let pass = run_manage(data, &config, store)?;
    print!("{}", MarkdownReport.exits(&pass));
    Ok(())
}

fn run_positions(store: &Path) -> Result<()> {
    let file = StoreFile::new(store);
    let positions = file.load()?;
    print!("{}", MarkdownReport.positions(&positions));

    let closed = file.closed_history()?;
    if !closed.is_empty() {
        let realized: f64 = closed.iter().map(|p| p.realized_pnl()).sum();
        println!("\nClosed positions: {} (realized P&L ${realized:.2})", closed.len());
    }
    Ok(())
}

fn run_synth(out: &Path, tickers: Vec<String>, days: usize, seed: u64, end: Option<String>) -> Result<()> {
    let end = match end {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| format!("bad --end '{s}'"))?,
        None => chrono::Local::now().date_naive(),
    };
    let snapshot = generate_snapshot(&SyntheticSpec {
        tickers,
        end,
        trading_days: days,
        seed,
        risk_free_rate: EngineConfig::default().pricing.risk_free_rate,
    })?;
    save_snapshot(out, &snapshot)?;
    println!(
        "Wrote {} tickers through {} to {} (dataset {})",
        snapshot.series.len(),
        snapshot.as_of,
        out.display(),
        snapshot.dataset_hash
    );
    Ok(())
}
