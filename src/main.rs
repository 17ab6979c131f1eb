//! twofold CLI: run the plant operator agent against a process simulator.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use twofold::agent::Agent;
use twofold::arbitrate::Arbitrator;
use twofold::config::AgentSettings;
use twofold::cycle::DecisionCycle;
use twofold::operator::OperatorHost;
use twofold::proposer::Quiescent;
use twofold::transport::TcpJsonTransport;

#[derive(Parser)]
#[command(name = "twofold", version, about = "Dual-process decision agent")]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the simulator and run the decision loop.
    ///
    /// Refuses settings with `cycle.require_event_time`, since the loop does
    /// not stamp event times.
    Run {
        /// Simulator address, overriding the settings file.
        #[arg(long)]
        address: Option<String>,

        /// Continuation cycles to run; -1 runs until no action is chosen.
        #[arg(long, allow_negative_numbers = true)]
        max_iterations: Option<i64>,

        /// Leave the connection open when the loop ends.
        #[arg(long)]
        keep_connection: bool,
    },

    /// Validate the settings and show the routine and registered actions.
    Check,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => AgentSettings::load(path)?,
        None => AgentSettings::default(),
    };

    match cli.command {
        Commands::Run {
            address,
            max_iterations,
            keep_connection,
        } => {
            if let Some(address) = address {
                settings.transport.address = address;
            }
            if let Some(max) = max_iterations {
                settings.run.max_iterations = max;
            }
            if keep_connection {
                settings.run.disconnect_at_end = false;
            }
            settings.validate_for_loop()?;

            let transport = TcpJsonTransport::connect(
                &settings.transport.address,
                settings.transport.reply_wait(),
            )?;
            let host = OperatorHost::new(Box::new(transport));
            let cycle = DecisionCycle::new(
                OperatorHost::registry(settings.routine.sleep_cap()),
                Box::new(Quiescent),
                Box::new(settings.routine.planner()?),
            )
            .with_arbitrator(Arbitrator::new(settings.arbitration.bypass.into_policy()))
            .with_activation(settings.activation)
            .with_config(settings.cycle);

            let mut agent = Agent::new(host, cycle);
            let outcome = agent.run_loop(
                settings.run.max_iterations(),
                settings.run.disconnect_at_end,
            )?;

            println!("Exiting simulation: {}", outcome.stop);
            if let Some(action) = &outcome.last_action {
                println!("Pending action: {action}");
            }
            let cycle = agent.cycle();
            println!(
                "Cycles: {}  Beliefs: {}  Activated: {}  Exchanges: {}",
                outcome.cycles,
                cycle.beliefs().len(),
                cycle.activation().len(),
                agent.host().exchanges()
            );
        }

        Commands::Check => {
            let planner = settings.routine.planner()?;
            println!("Routine:");
            for (i, steps) in planner.alternatives().iter().enumerate() {
                let steps: Vec<String> = steps.iter().map(ToString::to_string).collect();
                println!("  alternative {}: {}", i + 1, steps.join(", "));
            }
            println!("Transient: {}", settings.routine.transient.join(", "));
            match settings.run.max_iterations() {
                Some(max) => println!("Max iterations: {max}"),
                None => println!("Max iterations: unbounded"),
            }

            let registry = OperatorHost::registry(settings.routine.sleep_cap());
            println!("Primitives: {}", registry.primitive_symbols().join(", "));
            println!("Methods: {}", registry.method_names().join(", "));
        }
    }

    Ok(())
}
