//! pairsync command-line interface.
//!
//! Management subcommands edit the persisted entries file; `run` loads the
//! tracked pairs and drives the synchronization engine until told to stop.

use anyhow::{Context, Result, bail};
use clap::{
    Parser, Subcommand, ValueEnum,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::io::{BufRead, Write as _};
use std::path::PathBuf;

use pairsync::config::Settings;
use pairsync::engine::SyncEngine;
use pairsync::entry::Entry;
use pairsync::persist::{self, Record};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(
    name = "pairsync",
    version,
    about = "Keeps pairs of files in sync by watching their folders for changes",
    styles = clap_cargo_style()
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Track a new pair of files
    Add {
        /// The main file; must exist
        primary: PathBuf,
        /// The backup file; seeded from the main file if missing
        secondary: PathBuf,
        /// Propagate changes in either direction
        #[arg(long)]
        two_way: bool,
    },
    /// Stop tracking a pair (does not delete either file)
    Remove {
        /// Index as shown by `pairsync list`
        index: usize,
    },
    /// List tracked pairs
    List,
    /// Switch a pair between one-way and two-way mode
    SetMode {
        /// Index as shown by `pairsync list`
        index: usize,
        mode: Mode,
    },
    /// Watch folders and synchronize until stopped
    Run {
        /// Start with reconciliation disabled
        #[arg(long)]
        disabled: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    OneWay,
    TwoWay,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    pairsync::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => init(force),
        Commands::Add {
            primary,
            secondary,
            two_way,
        } => add(&settings, primary, secondary, two_way),
        Commands::Remove { index } => remove(&settings, index),
        Commands::List => list(&settings),
        Commands::SetMode { index, mode } => set_mode(&settings, index, mode),
        Commands::Run { disabled } => run(settings, disabled),
    }
}

fn init(force: bool) -> Result<()> {
    let path = Settings::init_config_file(force)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Created configuration at {}", path.display());
    Ok(())
}

fn add(settings: &Settings, primary: PathBuf, secondary: PathBuf, two_way: bool) -> Result<()> {
    let primary = std::path::absolute(&primary)
        .with_context(|| format!("cannot resolve {}", primary.display()))?;
    let secondary = std::path::absolute(&secondary)
        .with_context(|| format!("cannot resolve {}", secondary.display()))?;

    // Seeds the backup and verifies both files are accessible.
    let entry = Entry::create(&primary, &secondary, two_way)
        .with_context(|| format!("cannot track {}", primary.display()))?;

    let mut records = persist::load_records(&settings.entries_path);
    if records.iter().any(|r| r.primary == primary && r.secondary == secondary) {
        bail!("pair already tracked");
    }
    records.push(Record::from(&entry));
    persist::save_records(&settings.entries_path, &records)?;

    println!(
        "Tracking {} {} {}",
        primary.display(),
        if two_way { "<->" } else { "->" },
        secondary.display()
    );
    Ok(())
}

fn remove(settings: &Settings, index: usize) -> Result<()> {
    let mut records = persist::load_records(&settings.entries_path);
    if index >= records.len() {
        bail!("no pair at index {index} ({} tracked)", records.len());
    }
    let record = records.remove(index);
    persist::save_records(&settings.entries_path, &records)?;
    println!("Removed {}", record.primary.display());
    Ok(())
}

fn list(settings: &Settings) -> Result<()> {
    let records = persist::load_records(&settings.entries_path);
    if records.is_empty() {
        println!("No pairs tracked. Use `pairsync add` to start.");
        return Ok(());
    }
    for (i, record) in records.iter().enumerate() {
        println!(
            "{i:3}  {} {} {}",
            record.primary.display(),
            if record.two_way { "<->" } else { "->" },
            record.secondary.display()
        );
    }
    Ok(())
}

fn set_mode(settings: &Settings, index: usize, mode: Mode) -> Result<()> {
    let mut records = persist::load_records(&settings.entries_path);
    let Some(record) = records.get_mut(index) else {
        bail!("no pair at index {index} ({} tracked)", records.len());
    };
    record.two_way = matches!(mode, Mode::TwoWay);
    persist::save_records(&settings.entries_path, &records)?;
    println!(
        "{} is now {}",
        records[index].primary.display(),
        if records[index].two_way {
            "two-way"
        } else {
            "one-way"
        }
    );
    Ok(())
}

fn run(mut settings: Settings, disabled: bool) -> Result<()> {
    if disabled {
        settings.enabled = false;
    }

    let entries = persist::load_entries(&settings.entries_path);
    if entries.is_empty() {
        bail!(
            "no pairs to synchronize in {}. Use `pairsync add` first.",
            settings.entries_path.display()
        );
    }

    let engine = SyncEngine::start(entries, &settings);
    println!(
        "Watching {} pairs ({}). Commands: enable, disable, status, quit.",
        engine.entries().len(),
        if engine.is_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );

    // Stand-in for the original tray menu: control lines on stdin.
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match line.trim() {
            "enable" => engine.set_enabled(true),
            "disable" => engine.set_enabled(false),
            "status" => {
                for entry in engine.entries() {
                    println!(
                        "{} {} {}",
                        entry.primary().display(),
                        if entry.two_way() { "<->" } else { "->" },
                        entry.secondary().display()
                    );
                }
                println!(
                    "synchronization {}",
                    if engine.is_enabled() {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
            }
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }
        std::io::stdout().flush().ok();
    }

    engine.shutdown();
    println!("Stopped.");
    Ok(())
}
