//! Binary entry point: parse the CLI, load layered settings, init
//! logging, dispatch, map any error to exit code 1.

use clap::Parser;
use console::style;

use pioneer::cli::{Cli, dispatch};
use pioneer::config::Settings;

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{} {err}", style("error:").red().bold());
            std::process::exit(1);
        }
    };

    pioneer::logging::init_with_config(&settings.logging);

    if let Err(err) = dispatch(cli.command, &settings) {
        eprintln!("{} {err}", style("error:").red().bold());
        for suggestion in err.recovery_suggestions() {
            eprintln!(" {} {suggestion}", style("hint:").yellow());
        }
        std::process::exit(err.exit_code());
    }
}
