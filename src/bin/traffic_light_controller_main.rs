use adaptive_signal::control_system::{Controller, ControllerConfig, Scheduler};
use adaptive_signal::global_variables::{DISPLAY_REFRESH_MS, SIM_TICK_MS};
use adaptive_signal::monitoring::{run_cli, run_status_display};
use adaptive_signal::simulation_engine::{ApproachQueues, TrafficSimulation};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use tokio::time::{sleep, Duration};

#[derive(Parser)]
#[command(name = "traffic_light_controller")]
#[command(about = "Adaptive traffic light controller driving a demo intersection")]
struct Cli {
    /// JSON file with controller timings (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Divide every configured duration by this factor
    #[arg(long, default_value = "1.0")]
    speedup: f64,

    /// Stop after this many seconds instead of waiting for 'q'
    #[arg(long)]
    duration: Option<u64>,

    /// Seed for the vehicle simulation
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Print status frames as JSON lines
    #[arg(long)]
    json: bool,

    /// Do not read operator commands from stdin
    #[arg(long)]
    no_console: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ControllerConfig::from_json_file(path)
            .with_context(|| format!("loading controller config from {}", path.display()))?,
        None => ControllerConfig::default(),
    };
    let config = config.scaled(cli.speedup)?;

    // Configuration errors stop us here, before anything is scheduled.
    let queues = ApproachQueues::new();
    let controller = Controller::new(&config, Arc::new(queues.clone()))?;
    let handle = controller.handle();
    let sim_tick =
        Duration::from_millis(((SIM_TICK_MS as f64 / cli.speedup).round() as u64).max(1));

    let scheduler = Scheduler::new().context("starting event loop")?;
    scheduler.block_on(async move {
        let mut simulation = TrafficSimulation::new(queues.clone(), handle.clone(), cli.seed);
        simulation.seed_initial_vehicles();
        let stats = simulation.stats_handle();

        let controller_task = controller.spawn();
        let simulation_task = tokio::spawn(simulation.run(sim_tick));
        let display_task = tokio::spawn(run_status_display(
            handle.clone(),
            queues.clone(),
            Duration::from_millis(DISPLAY_REFRESH_MS),
            cli.json,
        ));

        let console = async {
            if cli.no_console {
                std::future::pending::<std::io::Result<()>>().await
            } else {
                run_cli(handle.clone(), queues.clone()).await
            }
        };
        let run_time = async {
            match cli.duration {
                Some(secs) => sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = console => {
                if let Err(e) = result {
                    log::error!("Console error: {}", e);
                }
            }
            _ = run_time => log::info!("Run time elapsed"),
            _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
        }

        controller_task.abort();
        simulation_task.abort();
        display_task.abort();

        let stats = stats.lock().unwrap_or_else(PoisonError::into_inner).clone();
        println!("\n=== Final State ===");
        println!("{}", handle.status_description());
        println!("Vehicles arrived: {}", stats.arrived);
        println!("Vehicles departed: {}", stats.departed);
        println!("Still waiting: {:?}", queues.snapshot());
        println!("Average wait: {:.1}s", stats.average_wait_ms() / 1000.0);
        println!("Emergency requests: {}", stats.emergency_requests);
    });

    Ok(())
}
