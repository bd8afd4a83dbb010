use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use goldspin_core::{
    simulate, MachineParams, Millis, Notifier, SeededStream, SlotMachine, SpinStart, SymbolRng,
    ThreadRandom, TimingConfig,
};
use goldspin_shared::{format_amount, MachineView, Notice, NoticeLevel, SpinRecord, ViewResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goldspin", about = "Gold Spin slot machine in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Machine params as JSON (reels, paytable, timing, ladder, starting_balance)
    #[arg(long, global = true, env = "GOLDSPIN_CONFIG")]
    config: Option<PathBuf>,
    /// Seed for reproducible spins; random when omitted
    #[arg(long, global = true, env = "GOLDSPIN_SEED")]
    seed: Option<String>,
    /// Halve every reel timing
    #[arg(long, global = true)]
    turbo: bool,
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Play interactively: `spin` (or empty line), `+`, `-`, `reel <n>`, `history`, `quit`
    Play,
    /// Run spins headless and print a summary
    Simulate {
        #[arg(long, default_value_t = 1000)]
        spins: u64,
        #[arg(long, default_value_t = 100)]
        bet: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run spins headless and write one CSV row per spin
    ExportCsv {
        path: PathBuf,
        #[arg(long, default_value_t = 1000)]
        spins: u64,
        #[arg(long, default_value_t = 100)]
        bet: u64,
    },
    /// Print the payout table
    Paytable,
}

/// Prints notices straight to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("*** {} ***", notice.message),
            NoticeLevel::Error => println!("!!! {}", notice.message),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_params(cli: &Cli) -> anyhow::Result<MachineParams> {
    let mut params = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            MachineParams::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => MachineParams::classic(),
    };
    if cli.turbo {
        params.timing = if cli.config.is_some() {
            params.timing.scaled(0.5)
        } else {
            TimingConfig::turbo()
        };
    }
    params.validate()?;
    Ok(params)
}

fn make_rng(seed: Option<&str>) -> Box<dyn SymbolRng> {
    match seed {
        Some(seed) => {
            let stream = SeededStream::new(seed);
            info!(seed_hash = %stream.seed_hash_hex(), "using seeded stream");
            Box::new(stream)
        }
        None => Box::new(ThreadRandom::from_entropy()),
    }
}

fn render(view: &MachineView) -> String {
    let reels: Vec<String> = view
        .reels
        .iter()
        .map(|r| format!("[{:^6}]", r.visible[1]))
        .collect();
    let line = if view.winning_line { "==" } else { "  " };
    format!(
        "{line}{}{line}  bet {:>5}  win {:>7}  balance {:>8}",
        reels.join(" "),
        format_amount(view.bet),
        format_amount(view.win),
        format_amount(view.balance)
    )
}

/// One reel's full window, e.g. `reel 1 fast-spin: BAR | SEVEN | SPIN`.
fn describe_reel(view: &MachineView, index: usize) -> ViewResult<String> {
    let reel = view.reel(index)?;
    Ok(format!(
        "reel {} {}: {}",
        reel.index,
        reel.phase,
        reel.visible.join(" | ")
    ))
}

fn print_history<'a>(records: impl Iterator<Item = &'a SpinRecord>) {
    for r in records {
        println!(
            "#{:<4} {}  bet {:>5}  {:<22} win {:>7}  balance {:>8}",
            r.spin_id,
            r.ts.with_timezone(&Local).format("%H:%M:%S"),
            format_amount(r.bet),
            r.key,
            format_amount(r.win),
            format_amount(r.balance_after)
        );
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

/// Brings the machine clock up to `now`, then applies one input line. A spin
/// typed after an idle pause is therefore scheduled from the current time.
fn step<R: SymbolRng, N: Notifier>(
    machine: &mut SlotMachine<R, N>,
    now: Millis,
    line: Option<&str>,
) -> Control {
    machine.advance_to(now);
    let Some(line) = line else {
        return Control::Continue;
    };
    let mut words = line.split_whitespace();
    match (words.next().unwrap_or(""), words.next()) {
        ("" | "s" | "spin", _) => {
            if let SpinStart::Started { spin_id, bet } = machine.spin() {
                debug!(spin_id, bet, now, "spin requested");
            }
        }
        ("+", _) => {
            machine.increase_bet();
        }
        ("-", _) => {
            machine.decrease_bet();
        }
        ("r" | "reel", Some(index)) => match index.parse::<usize>() {
            Ok(index) => match describe_reel(&machine.view(), index) {
                Ok(line) => println!("{line}"),
                Err(err) => println!("{err}"),
            },
            Err(_) => println!("usage: reel <index>"),
        },
        ("h" | "history", _) => print_history(machine.history().iter().rev().take(10)),
        ("q" | "quit" | "exit", _) => return Control::Quit,
        (other, _) => println!("unknown command: {other}"),
    }
    Control::Continue
}

async fn play(params: MachineParams, rng: Box<dyn SymbolRng>) -> anyhow::Result<()> {
    let mut machine = SlotMachine::new(params, rng, ConsoleNotifier)?;
    let started = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_frame = String::new();

    println!("commands: spin (or enter), +, -, reel <n>, history, quit");
    println!("{}", render(&machine.view()));

    loop {
        let deadline = machine
            .next_deadline()
            .map(|ms| started + Duration::from_millis(ms));
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => Some(line),
                None => break,
            },
            _ = async {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => None,
        };
        let now = started.elapsed().as_millis() as Millis;
        if step(&mut machine, now, line.as_deref()) == Control::Quit {
            break;
        }
        let frame = render(&machine.view());
        if frame != last_frame {
            println!("{frame}");
            last_frame = frame;
        }
    }

    let dropped = machine.teardown();
    debug!(dropped, "left the table");
    println!("final balance {}", format_amount(machine.balance()));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let params = load_params(&cli)?;

    match cli.command {
        Commands::Play => {
            play(params, make_rng(cli.seed.as_deref())).await?;
        }
        Commands::Simulate { spins, bet, json } => {
            let report = simulate(&params, make_rng(cli.seed.as_deref()), spins, bet)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "spins={} bet={} won={} hits={} hit_rate={:.4} rtp={:.4}",
                    report.spins,
                    format_amount(report.total_bet),
                    format_amount(report.total_won),
                    report.hits,
                    report.hit_rate(),
                    report.rtp()
                );
                for (key, count) in &report.by_key {
                    println!("  {key:<22} {count}");
                }
            }
        }
        Commands::ExportCsv { path, spins, bet } => {
            let report = simulate(&params, make_rng(cli.seed.as_deref()), spins, bet)?;
            let mut wtr = csv::Writer::from_path(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            wtr.write_record(["spin_id", "ts", "bet", "key", "multiplier", "win", "balance_after"])?;
            for o in &report.outcomes {
                wtr.write_record(&[
                    o.spin_id.to_string(),
                    o.ts.to_rfc3339(),
                    o.bet.to_string(),
                    o.key.clone(),
                    o.multiplier.map(|m| m.to_string()).unwrap_or_default(),
                    o.win.to_string(),
                    o.balance_after.to_string(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", report.outcomes.len(), path.display());
        }
        Commands::Paytable => {
            for (key, multiplier) in params.paytable.entries() {
                println!("{key:<22} {multiplier:>4}x");
            }
        }
    }

    Ok(())
}
