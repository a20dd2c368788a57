#![recursion_limit = "1024"]

use clap::{App, Arg};
use colored::*;
use log::{error, info};
use pbr::ProgressBar;
use picopic::errors::*;
use picopic::settings;
use picopic::simulation::Simulation;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    // initialize the env_logger implementation
    env_logger::init();

    // error handling of runner
    if let Err(ref e) = run() {
        error!("{}: {}", "error".red(), e);

        for e in e.iter().skip(1) {
            error!("caused by: {}", e);
        }

        // The backtrace is not always generated. Try to run this with
        // `RUST_BACKTRACE=1`.
        if let Some(backtrace) = e.backtrace() {
            error!("backtrace: {:?}", backtrace);
        }

        ::std::process::exit(1);
    }

    ::std::process::exit(0);
}

fn run() -> Result<()> {
    let cli_matches = App::new("picopic")
        .version(VERSION)
        .about("2D cylindrical relativistic particle-in-cell plasma simulator")
        .arg(
            Arg::with_name("config_file")
                .short("f")
                .long("config")
                .value_name("FILE")
                .help("Path to the simulation parameter file")
                .takes_value(true)
                .default_value("PicoPIC.json"),
        )
        .get_matches();

    let settings_file_name = cli_matches.value_of("config_file").unwrap();

    info!("initialization, reading configuration file `{}'", settings_file_name);
    let settings = settings::read_parameter_file(settings_file_name)
        .chain_err(|| "error reading parameter file")?;

    let mut simulation =
        Simulation::new(&settings).chain_err(|| "error during initialization of simulation")?;

    simulation
        .distribute()
        .chain_err(|| "error during initial particle distribution")?;

    info!("launching calculation");

    let mut pb = ProgressBar::new(simulation.step_count());
    pb.format("┫██░┣");

    let start_time = time::now();

    while !simulation.finished() {
        simulation.do_timestep()?;
        pb.inc();
    }

    pb.finish_print(&format!("✓ {} ", "DONE".green().bold()));
    println!();

    let duration = time::now() - start_time;
    println!("Elapsed time: {}", pretty_print_duration(duration));

    Ok(())
}

/// Renders a duration in a "d h m s" format.
fn pretty_print_duration(duration: time::Duration) -> String {
    let total = duration.num_seconds();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
