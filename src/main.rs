use clap::Parser;
use colored::Colorize;
use std::process;

use diffex::config::InputConfig;
use diffex::error::DiffexError;
use diffex::settings::Settings;

fn main() {
    let config = InputConfig::parse();

    let settings = Settings::load(config.config.as_deref())
        .map(|settings| settings.with_renderer(config.renderer.as_deref()))
        .unwrap_or_else(|err| {
            eprintln!("Problem loading settings: {}", err.to_string().red().bold());
            process::exit(err.exit_code());
        });

    diffex::logging::init_logging(config.verbose, config.quiet, &settings.log_level);
    #[cfg(debug_assertions)]
    tracing::debug!(?config, "arguments parsed");

    if let Err(e) = diffex::run(config, settings) {
        match &e {
            DiffexError::RendererFailed { code } => {
                eprintln!("⚠️ Quarto render failed with exit code {}", code.to_string().red().bold());
            }
            _ => eprintln!("Application error: {}", e.to_string().red().bold()),
        }
        process::exit(e.exit_code());
    }
}
