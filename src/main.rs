//! EVS Window Logger CLI
//!
//! Accumulates camera events into fixed windows, shows the latest frame and
//! records windows to disk on demand.

use anyhow::Context;
use clap::Parser;
use evs_window_logger::{
    bias::StepSelector,
    collector::{SourceProvider, SyntheticProvider},
    config::Config,
    console::{spawn_stdin_reader, Console},
    control::{create_shared_control, BiasPresets, Command, CommandInterpreter, SharedControl, COMMAND_HELP},
    core::{create_shared_frame, HandoffQueue, WindowEngine},
    display::HeadlessDisplay,
    stats::{create_shared_stats, create_shared_stats_with_persistence},
    VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evs-logger")]
#[command(version = VERSION)]
#[command(about = "Fixed-window event camera logger", long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Window length in sensor microseconds
    #[arg(long)]
    window_us: Option<i64>,

    /// Root directory for recordings and captures
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Save session statistics as JSON on exit
    #[arg(long)]
    stats_path: Option<PathBuf>,

    /// Log filter, e.g. "info" or "evs_window_logger=debug"
    #[arg(long, default_value = "info")]
    log_level: String,

    /// List available cameras and exit
    #[arg(long)]
    list_sources: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Set bias_diff when the camera opens
    #[arg(long)]
    bias_diff: Option<i32>,

    /// Set bias_diff_on when the camera opens
    #[arg(long)]
    bias_diff_on: Option<i32>,

    /// Set bias_diff_off when the camera opens
    #[arg(long)]
    bias_diff_off: Option<i32>,

    /// Set bias_fo when the camera opens
    #[arg(long)]
    bias_fo: Option<i32>,

    /// Set bias_hpf when the camera opens
    #[arg(long)]
    bias_hpf: Option<i32>,

    /// Print all biases when the camera first opens
    #[arg(long)]
    print_bias: bool,
}

impl Cli {
    fn presets(&self) -> BiasPresets {
        let values = [
            ("bias_diff", self.bias_diff),
            ("bias_diff_on", self.bias_diff_on),
            ("bias_diff_off", self.bias_diff_off),
            ("bias_fo", self.bias_fo),
            ("bias_hpf", self.bias_hpf),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect();

        BiasPresets {
            values,
            print_on_open: self.print_bias,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(&cli)?;
    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let provider = SyntheticProvider::new(config.synthetic.clone());
    if cli.list_sources {
        let sources = provider.list_available();
        if sources.is_empty() {
            println!("No cameras detected.");
        }
        for id in sources {
            println!("{id}");
        }
        return Ok(());
    }

    println!("EVS Window Logger v{VERSION}");
    println!();
    println!("  Window duration: {} us", config.window_duration_us);
    println!("  Queue capacity: {} batches", config.max_queue_size);
    println!("  Output root: {}", config.output_root.display());
    println!();

    let control = create_shared_control();
    let stats = match config.stats_path.clone() {
        Some(path) => create_shared_stats_with_persistence(path),
        None => create_shared_stats(),
    };
    let latest = create_shared_frame();
    let queue = Arc::new(HandoffQueue::new(
        config.max_queue_size,
        control.clone(),
        stats.clone(),
    ));

    ctrlc_handler(control.clone())?;

    let engine = WindowEngine::new(
        config.window_duration_us,
        queue.clone(),
        control.clone(),
        latest.clone(),
        stats.clone(),
    );
    let engine_handle = engine.spawn().context("failed to start window engine")?;

    let presets = cli.presets();
    let auto_open = presets.wants_auto_open();
    let interpreter = CommandInterpreter::new(
        Box::new(provider),
        queue,
        control.clone(),
        latest.clone(),
        config.output_root.clone(),
    )
    .with_steps(StepSelector::new(config.bias_steps.clone()))
    .with_presets(presets);

    let mut console = Console::new(
        interpreter,
        HeadlessDisplay::new(),
        control.clone(),
        latest,
        config.display_interval,
    );

    println!("{COMMAND_HELP}");
    println!();

    if auto_open {
        match console.interpreter_mut().handle(Command::AcquisitionOn) {
            Ok(reply) => reply.iter().for_each(|line| println!("{line}")),
            Err(e) => eprintln!("Warning: could not open camera: {e}"),
        }
    }

    let lines = spawn_stdin_reader().context("failed to read console input")?;
    console.run(lines);
    drop(console);

    if engine_handle.join().is_err() {
        tracing::error!("window engine panicked");
    }

    println!();
    println!("{}", stats.summary());
    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };

    if let Some(window_us) = cli.window_us {
        config.window_duration_us = window_us;
    }
    if let Some(ref dir) = cli.output_dir {
        config.output_root = dir.clone();
    }
    if let Some(ref path) = cli.stats_path {
        config.stats_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Ctrl+C only flips the shutdown flag; the console loop does the teardown.
fn ctrlc_handler(control: SharedControl) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        control.request_shutdown();
    })
    .context("Error setting Ctrl+C handler")
}
