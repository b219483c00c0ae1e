use crate::control_system::traffic_light_controller::ControllerHandle;
use crate::shared_data::{Approach, LightColor, RoadPair};
use crate::simulation_engine::approach_queues::ApproachQueues;
use crate::simulation_engine::vehicles::VehicleType;
use serde::Serialize;
use std::fmt;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// One line of the status display.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayFrame {
    pub lights: [(Approach, LightColor); 4],
    pub queues: [(Approach, usize); 4],
    pub status: String,
}

impl DisplayFrame {
    pub fn capture(controller: &ControllerHandle, queues: &ApproachQueues) -> Self {
        Self {
            lights: controller.signals().snapshot(),
            queues: Approach::ALL.map(|approach| (approach, queues.len(approach))),
            status: controller.status_description(),
        }
    }
}

impl fmt::Display for DisplayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color_of = |pair: RoadPair| {
            self.lights
                .iter()
                .find(|(approach, _)| approach.pair() == pair)
                .map(|(_, color)| color.name())
                .unwrap_or("RED")
        };
        let waiting: Vec<String> = self
            .queues
            .iter()
            .map(|(approach, count)| format!("{}:{}", &approach.name()[..1].to_uppercase(), count))
            .collect();
        write!(
            f,
            "[{}] N/S={} E/W={} | {}",
            waiting.join(" "),
            color_of(RoadPair::NS),
            color_of(RoadPair::EW),
            self.status
        )
    }
}

/// Prints a status line every `period`, as text or JSON.
pub async fn run_status_display(
    controller: ControllerHandle,
    queues: ApproachQueues,
    period: Duration,
    json: bool,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let frame = DisplayFrame::capture(&controller, &queues);
        if json {
            match serde_json::to_string(&frame) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Could not serialize status frame: {}", e),
            }
        } else {
            println!("{}", frame);
        }
    }
}

/// Operator commands accepted on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Emergency for a named approach, or the busiest one when no name is given.
    Emergency(Option<String>),
    AddVehicle(Approach),
    Override(bool),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or_else(|| "empty command".to_string())?;
    let argument = words.next();
    match (verb.to_ascii_lowercase().as_str(), argument) {
        ("e" | "emergency", name) => Ok(Command::Emergency(name.map(str::to_string))),
        ("+" | "add", Some(name)) => name
            .parse::<Approach>()
            .map(Command::AddVehicle)
            .map_err(|e| e.to_string()),
        ("+" | "add", None) => Err("usage: + <north|east|south|west>".to_string()),
        ("o" | "override", Some("on")) => Ok(Command::Override(true)),
        ("o" | "override", Some("off")) => Ok(Command::Override(false)),
        ("o" | "override", _) => Err("usage: o on|off".to_string()),
        ("s" | "status", _) => Ok(Command::Status),
        ("h" | "help" | "?", _) => Ok(Command::Help),
        ("q" | "quit" | "exit", _) => Ok(Command::Quit),
        (other, _) => Err(format!("unknown command '{}'", other)),
    }
}

fn print_help() {
    println!("\nTraffic Signal Operator Console");
    println!("  e [approach]     Request emergency green (busiest approach if omitted)");
    println!("  + <approach>     Add a vehicle to an approach");
    println!("  o on|off         Toggle manual override");
    println!("  s                Show status");
    println!("  q                Quit");
}

/// Applies `command`. Returns `false` once the operator asked to quit.
pub fn apply_command(command: Command, controller: &ControllerHandle, queues: &ApproachQueues) -> bool {
    match command {
        Command::Emergency(Some(name)) => {
            if controller.request_emergency_named(&name) {
                println!("Emergency request filed for {}", name);
            } else {
                println!("Unknown approach '{}'", name);
            }
        }
        Command::Emergency(None) => {
            let target = controller.request_emergency_busiest(queues);
            println!("Emergency request filed for busiest approach: {}", target);
        }
        Command::AddVehicle(approach) => {
            let vehicle = queues.add_vehicle(approach, VehicleType::Car);
            println!("Vehicle {} joined {}", vehicle.id, approach);
        }
        Command::Override(enabled) => {
            controller.set_override_mode(enabled);
            println!("Manual override {}", if enabled { "ON" } else { "OFF" });
        }
        Command::Status => {
            println!("{}", DisplayFrame::capture(controller, queues));
        }
        Command::Help => print_help(),
        Command::Quit => {
            println!("Exiting console.");
            return false;
        }
    }
    true
}

/// Reads operator commands from stdin until `q` or end of input.
pub async fn run_cli(controller: ControllerHandle, queues: ApproachQueues) -> io::Result<()> {
    print_help();
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                if !apply_command(command, &controller, &queues) {
                    break;
                }
            }
            Err(e) => println!("{}. Type 'h' for help.", e),
        }
    }
    Ok(())
}
