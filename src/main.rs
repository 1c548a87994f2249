//! Vortex - hardware telemetry engine binary
//!
//! Runs the telemetry engine behind the dashboard API, or performs one-shot
//! queries and control requests from the command line.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vortex_telemetry::{
    start_web_server, AppState, DashboardView, EngineConfig, Preset, SystemSnapshot,
    TelemetryEngine, WebConfig, DEFAULT_CAPACITY, DEFAULT_LIBRARY_PATH, DEFAULT_WEB_PORT,
};

#[derive(Parser)]
#[command(name = "vortex")]
#[command(about = "Vortex - live hardware telemetry and CPU tuning")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Samples CPU, memory, network, GPU and process metrics into rolling \
                        series and forwards per-core multiplier requests to a tuning library")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// API server bind address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// API server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Domain preset: full, standard or minimal
    #[arg(long, default_value = "full")]
    preset: Preset,

    /// Samples kept per channel
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Path of the native tuning library
    #[arg(long, default_value = DEFAULT_LIBRARY_PATH)]
    library: PathBuf,

    /// Skip GPU detection
    #[arg(long)]
    no_gpu: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine and serve the API (default)
    Serve(ServeArgs),

    /// Show system identity and exit
    Info,

    /// Run the engine and print a summary line per second
    Watch(WatchArgs),

    /// Request a CPU multiplier for one core
    SetMultiplier { core: i32, value: i32 },

    /// Record a display voltage for one core
    SetVoltage { core: i32, value: f64 },
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args).await?,
        Some(Commands::Info) => info_command(),
        Some(Commands::Watch(args)) => watch_command(&cli, args).await?,
        Some(Commands::SetMultiplier { core, value }) => {
            let mut engine = TelemetryEngine::new(engine_config(&cli))?;
            let result = engine.set_multiplier(*core, *value);
            println!("{}", result.status_text());
            if !result.applied {
                std::process::exit(1);
            }
        }
        Some(Commands::SetVoltage { core, value }) => {
            let mut engine = TelemetryEngine::new(engine_config(&cli))?;
            let result = engine.set_voltage(*core, *value);
            println!("{}", result.status_text());
            if !result.applied {
                std::process::exit(1);
            }
        }
        None => serve_command(&cli, &ServeArgs::default()).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn engine_config(cli: &Cli) -> EngineConfig {
    EngineConfig::from_preset(cli.preset)
        .with_capacity(cli.capacity)
        .with_library_path(&cli.library)
        .with_gpu(!cli.no_gpu)
}

fn print_banner() {
    println!("Vortex - hardware telemetry");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    print_banner();

    let engine = TelemetryEngine::new(engine_config(cli)).context("building telemetry engine")?;
    let web_config = WebConfig::new(&cli.host, cli.port).with_cors(!args.no_cors);
    let (state, commands) = AppState::for_engine(&engine, web_config.command_queue);

    info!("API server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Preset: {:?}", cli.preset);

    let handle = engine.handle();
    let engine_task = tokio::spawn(engine.run(commands));

    let shutdown_handle = handle.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutting down");
        shutdown_handle.stop();
    };

    let served = start_web_server(web_config, state, shutdown).await;
    handle.stop();
    engine_task.await.context("engine loop panicked")?;
    served?;

    Ok(())
}

fn info_command() {
    let identity = SystemSnapshot::capture();

    println!("Vortex System Information");
    println!("=========================");
    println!();
    println!("Hardware:");
    println!("  CPU: {}", identity.cpu.name);
    println!("  Architecture: {}", identity.cpu.architecture);
    println!(
        "  Cores: {} physical, {} threads",
        identity.cpu.physical_cores, identity.cpu.threads
    );
    if let Some(mhz) = identity.cpu.frequency_mhz {
        println!("  Frequency: {} MHz", mhz);
    }
    println!(
        "  Memory: {:.1} GB total",
        identity.total_memory_bytes as f64 / 1024.0 / 1024.0 / 1024.0
    );
    println!("  Board: {}", identity.board);
    println!();
    println!("Software:");
    println!("  OS: {} {}", identity.os_name, identity.os_version);
    println!("  Kernel: {}", identity.kernel_version);
    println!();
    println!("Features compiled:");
    #[cfg(feature = "nvml")]
    println!("  - NVIDIA GPU support: yes");
    #[cfg(not(feature = "nvml"))]
    println!("  - NVIDIA GPU support: no");
}

async fn watch_command(cli: &Cli, args: &WatchArgs) -> anyhow::Result<()> {
    let engine = TelemetryEngine::new(engine_config(cli))?;
    let (_state, commands) = AppState::for_engine(&engine, 1);
    let handle = engine.handle();
    let mut updates = engine.updates();
    let engine_task = tokio::spawn(engine.run(commands));

    let stop_handle = handle.clone();
    let limit = args.seconds;
    tokio::spawn(async move {
        match limit {
            Some(seconds) => tokio::time::sleep(std::time::Duration::from_secs(seconds)).await,
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        stop_handle.stop();
    });

    let mut last_printed = -1.0_f64;
    while let Some(view) = updates.next().await {
        if view.elapsed.floor() > last_printed {
            last_printed = view.elapsed.floor();
            println!("{}", summary_line(&view));
        }
        if view.lifecycle == vortex_telemetry::Lifecycle::Stopped && view.elapsed > 0.0 {
            break;
        }
    }

    engine_task.await.context("engine loop panicked")?;
    Ok(())
}

fn summary_line(view: &DashboardView) -> String {
    let mut parts = vec![format!("[{:>6.1}s]", view.elapsed)];

    let cores: Vec<f64> = view
        .channels
        .iter()
        .filter(|(id, _)| id.starts_with("cpu."))
        .filter_map(|(_, channel)| channel.samples.last().map(|s| s.value))
        .collect();
    if !cores.is_empty() {
        let avg = cores.iter().sum::<f64>() / cores.len() as f64;
        parts.push(format!("cpu {:5.1}%", avg));
    }

    let latest = |id: &str| {
        view.channel(id)
            .and_then(|channel| channel.samples.last())
            .map(|sample| sample.value)
    };
    if let Some(memory) = latest("memory.available") {
        parts.push(format!("mem avail {:5.1}%", memory));
    }
    if let (Some(up), Some(down)) = (latest("network.up"), latest("network.down")) {
        parts.push(format!("net up {:.1} KB/s down {:.1} KB/s", up, down));
    }
    if let Some(gpu) = &view.gpu {
        parts.push(gpu.info_text());
    }
    if let Some(processes) = &view.processes {
        parts.push(format!("{} processes", processes.len()));
    }

    parts.join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["vortex", "--port", "9090", "--preset", "minimal"]).unwrap();
        assert_eq!(cli.port, 9090);
        assert_eq!(cli.preset, Preset::Minimal);
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["vortex"]).unwrap();
        assert_eq!(cli.port, DEFAULT_WEB_PORT);
        assert_eq!(cli.capacity, DEFAULT_CAPACITY);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.library, PathBuf::from("./overclock.so"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_control_subcommands() {
        let cli = Cli::try_parse_from(["vortex", "set-multiplier", "2", "45"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::SetMultiplier { core: 2, value: 45 })
        ));

        let cli = Cli::try_parse_from(["vortex", "--no-gpu", "set-voltage", "0", "1.2"]).unwrap();
        assert!(cli.no_gpu);
        assert!(matches!(cli.command, Some(Commands::SetVoltage { core: 0, .. })));
    }

    #[test]
    fn test_summary_line_without_channels() {
        let line = summary_line(&DashboardView::default());
        assert!(line.starts_with("[   0.0s]"));
    }
}
