use colored::Colorize;
use serde_json::json;

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod params;
pub mod report;
pub mod runner;
pub mod settings;
pub mod template;

use crate::config::{Commands, InputConfig};
use crate::error::DiffexResult;
use crate::report::{RenderOutcome, ReportJob};
use crate::settings::Settings;
use crate::template::TemplateLocator;

pub use crate::error::{DiffexError, exit_code};

/// Run one CLI command to completion. Status lines go to stdout unless
/// `--quiet` is set; the caller turns an `Err` into the process exit code.
pub fn run(config: InputConfig, settings: Settings) -> DiffexResult<()> {
    let quiet = config.quiet;

    let job = match &config.command {
        Commands::Version { json } => return print_version(&settings, *json),
        Commands::Run(args) => ReportJob::from_run(args)?,
        Commands::Deg(args) => ReportJob::from_deg(args, &TemplateLocator::new(&settings))?,
        Commands::Gsea(args) => ReportJob::from_gsea(args, &TemplateLocator::new(&settings))?,
    };

    if !quiet {
        let status = if job.dry_run() {
            "✅ Inputs validated, preparing a dry run of the"
        } else {
            "✅ Inputs validated, rendering"
        };
        println!(
            "{} {} report from {}",
            status.green(),
            job.label(),
            job.template().display()
        );
    }

    let outcome = job.execute(&settings)?;
    if !quiet {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &RenderOutcome) {
    match outcome.elapsed {
        Some(elapsed) => {
            println!(
                "✅ Report generated in {:.2?}: {}",
                elapsed,
                outcome.html().display().to_string().cyan().bold()
            );
        }
        None => {
            println!("📝 Parameters written to {}", outcome.params_path.display());
            println!("🚀 Dry run, quarto command:");
            println!("{}", outcome.command.display());
        }
    }
}

fn print_version(settings: &Settings, as_json: bool) -> DiffexResult<()> {
    let renderer = runner::renderer_version(&settings.renderer);
    if let Err(e) = &renderer {
        tracing::debug!("renderer version probe failed: {}", e);
    }

    if as_json {
        let output = json!({
            "diffex": env!("CARGO_PKG_VERSION"),
            "renderer": {
                "program": settings.renderer,
                "version": renderer.as_ref().ok(),
            }
        });
        println!("{}", serde_json::to_string_pretty(&output).map_err(std::io::Error::from)?);
    } else {
        println!("diffex {}", env!("CARGO_PKG_VERSION"));
        match &renderer {
            Ok(version) => println!("{} {}", settings.renderer, version),
            Err(_) => println!("{} {}", settings.renderer, renderer_status(&renderer).yellow()),
        }
    }
    Ok(())
}

fn renderer_status(renderer: &DiffexResult<String>) -> String {
    match renderer {
        Ok(version) => version.clone(),
        Err(DiffexError::RendererNotFound { .. }) => {
            "not found (install Quarto from https://quarto.org)".to_string()
        }
        Err(e) => format!("found, but its version could not be read: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_version_without_renderer() {
        let settings = Settings {
            renderer: "diffex-no-such-renderer".to_string(),
            ..Settings::default()
        };
        let config = InputConfig::try_parse_from(["diffex", "version", "--json"]).unwrap();
        assert!(run(config, settings.clone()).is_ok());
        let config = InputConfig::try_parse_from(["diffex", "version"]).unwrap();
        assert!(run(config, settings).is_ok());
    }

    #[test]
    fn test_renderer_status_wording() {
        assert_eq!(renderer_status(&Ok("1.5.57".to_string())), "1.5.57");
        let missing = Err(DiffexError::RendererNotFound {
            program: "quarto".to_string(),
        });
        assert!(renderer_status(&missing).starts_with("not found"));
        let broken = Err(DiffexError::RendererFailed { code: 1 });
        let status = renderer_status(&broken);
        assert!(status.starts_with("found, but"));
        assert!(!status.contains("not found"));
    }

    #[test]
    fn test_run_missing_inputs_is_no_input() {
        let config = InputConfig::try_parse_from([
            "diffex",
            "-q",
            "run",
            "--qmd",
            "no/such/DiffEx.qmd",
        ])
        .unwrap();
        let err = run(config, Settings::default()).unwrap_err();
        assert_eq!(err.exit_code(), exit_code::NO_INPUT);
    }
}
