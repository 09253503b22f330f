//! # report.rs
//!
//! A `ReportJob` is a fully validated render request: inputs checked, template
//! resolved, parameter map built. Executing it writes the parameter file,
//! places the document and hands both to the renderer.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use getset::{CopyGetters, Getters};
use serde_yaml::Mapping;

use crate::config::{DegArgs, GseaArgs, ReportArgs, RunArgs};
use crate::error::{DiffexError, DiffexResult};
use crate::io;
use crate::params::{self, DegParams, GseaParams};
use crate::runner::{self, RenderCommand};
use crate::settings::Settings;
use crate::template::{self, ReportKind, TemplateLocator};

/// File written by `run` when the parameter file is rewritten.
pub const RUN_PARAMS_FILE_NAME: &str = "run_params.yaml";

/// Where the document is rendered and where its HTML ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Render the document where it is, HTML next to it.
    InPlace,
    /// Render the document where it is, HTML moved into the directory.
    OutputDir(PathBuf),
    /// Copy the template's directory here and render the copy.
    Staged(PathBuf),
}

#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct ReportJob {
    #[getset(get = "pub")]
    label: String,
    /// Template as found, before staging.
    #[getset(get = "pub")]
    template: PathBuf,
    #[getset(get = "pub")]
    placement: Placement,
    #[getset(get = "pub")]
    params_path: PathBuf,
    /// Parameters to write to `params_path`; `None` uses the file as it is.
    #[getset(get = "pub")]
    params: Option<Mapping>,
    #[getset(get = "pub")]
    output_name: Option<String>,
    #[getset(get_copy = "pub")]
    dry_run: bool,
}

/// What happened when a job was executed.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub command: RenderCommand,
    pub params_path: PathBuf,
    /// `None` for a dry run.
    pub elapsed: Option<Duration>,
}

impl RenderOutcome {
    pub fn html(&self) -> PathBuf {
        self.command.expected_output()
    }
}

fn check_output_name(output_name: &Option<String>) -> DiffexResult<()> {
    if let Some(name) = output_name {
        let path = Path::new(name);
        if name.is_empty() || path.components().count() != 1 || path.file_name().is_none() {
            return Err(DiffexError::InvalidParameter(format!(
                "--output-name must be a plain file name, got '{}'",
                name
            )));
        }
    }
    Ok(())
}

impl ReportJob {
    /// `diffex run`: render a given document with a given parameter file.
    pub fn from_run(args: &RunArgs) -> DiffexResult<ReportJob> {
        check_output_name(&args.output_name)?;
        io::ensure_exists(&args.qmd)?;
        io::ensure_exists(&args.params)?;

        let outdir = match &args.outdir {
            Some(dir) => Some(std::path::absolute(dir)?),
            None => None,
        };

        // the params file is only rewritten when something changes it
        let (params_path, params) = if outdir.is_some() || !args.overrides.is_empty() {
            let mut mapping = params::load_params_file(&args.params)?;
            params::apply_overrides(&mut mapping, &args.overrides);
            let dir = match &outdir {
                Some(dir) => dir.clone(),
                None => std::path::absolute(&args.params)?
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            };
            (dir.join(RUN_PARAMS_FILE_NAME), Some(mapping))
        } else {
            (std::path::absolute(&args.params)?, None)
        };

        let placement = match outdir {
            Some(dir) => Placement::OutputDir(dir),
            None => Placement::InPlace,
        };

        Ok(ReportJob {
            label: "run".to_string(),
            template: std::path::absolute(&args.qmd)?,
            placement,
            params_path,
            params,
            output_name: args.output_name.clone(),
            dry_run: args.dry_run,
        })
    }

    /// `diffex deg`: differential expression report.
    pub fn from_deg(args: &DegArgs, locator: &TemplateLocator) -> DiffexResult<ReportJob> {
        let report = &args.report;
        check_output_name(&report.output_name)?;
        let deg_params = DegParams::from_args(args, &report.outdir)?;

        io::ensure_exists(&args.counts)?;
        io::ensure_exists(&args.metadata)?;
        if report.skip_validation {
            tracing::warn!("Skipping input validation");
        } else {
            let samples = io::validate_counts(&args.counts)?;
            tracing::info!("Count matrix has {} samples", samples.len());
            io::validate_metadata(&args.metadata, &args.condition)?;
        }

        let mapping = params::to_mapping(&deg_params)?;
        ReportJob::packaged(ReportKind::Deg, report, mapping, locator)
    }

    /// `diffex gsea`: gene-set enrichment report.
    pub fn from_gsea(args: &GseaArgs, locator: &TemplateLocator) -> DiffexResult<ReportJob> {
        let report = &args.report;
        check_output_name(&report.output_name)?;
        let gsea_params = GseaParams::from_args(args, &report.outdir)?;

        io::ensure_exists(&args.ranked)?;
        if let Some(gene_sets) = &args.gene_sets {
            io::ensure_exists(gene_sets)?;
        }
        if report.skip_validation {
            tracing::warn!("Skipping input validation");
        } else {
            io::validate_ranked(&args.ranked, &args.rank_column)?;
            if let Some(gene_sets) = &args.gene_sets {
                let sets = io::validate_gmt(gene_sets)?;
                tracing::info!("{} gene sets in {}", sets, gene_sets.display());
            } else {
                tracing::info!(
                    "No GMT file given, the template will use MSigDB collection {}",
                    args.collection
                );
            }
        }

        let mapping = params::to_mapping(&gsea_params)?;
        ReportJob::packaged(ReportKind::Gsea, report, mapping, locator)
    }

    fn packaged(
        kind: ReportKind,
        report: &ReportArgs,
        mut mapping: Mapping,
        locator: &TemplateLocator,
    ) -> DiffexResult<ReportJob> {
        let template = locator.locate(kind, report.template.as_deref())?;
        params::apply_overrides(&mut mapping, &report.overrides);
        let outdir = std::path::absolute(&report.outdir)?;
        let params_path = outdir.join(kind.params_file_name());

        // explicit templates render in place
        let (template, placement) = if report.template.is_some() {
            (std::path::absolute(&template)?, Placement::OutputDir(outdir))
        } else {
            (template, Placement::Staged(outdir))
        };

        Ok(ReportJob {
            label: kind.to_string(),
            template,
            placement,
            params_path,
            params: Some(mapping),
            output_name: report.output_name.clone(),
            dry_run: report.dry_run,
        })
    }

    /// Write the parameter file, stage the template and run the renderer.
    /// A failing renderer is reported as `RendererFailed` with its exit code.
    pub fn execute(&self, settings: &Settings) -> DiffexResult<RenderOutcome> {
        if let Some(params) = &self.params {
            params::write_params_file(params, &self.params_path)?;
            tracing::info!("Parameters written to {}", self.params_path.display());
        }

        let (qmd, output_dir) = match &self.placement {
            Placement::InPlace => (self.template.clone(), None),
            Placement::OutputDir(dir) => {
                fs::create_dir_all(dir)?;
                (self.template.clone(), Some(dir.clone()))
            }
            Placement::Staged(dir) => (template::stage_template(&self.template, dir)?, None),
        };

        let command = RenderCommand::from_settings(settings, &qmd, &self.params_path)
            .with_output_name(self.output_name.clone())
            .with_output_dir(output_dir);

        if self.dry_run {
            tracing::info!("Dry run, not starting {}", settings.renderer);
            return Ok(RenderOutcome {
                command,
                params_path: self.params_path.clone(),
                elapsed: None,
            });
        }

        let (status, elapsed) = command.execute()?;
        runner::check_status(&status)?;

        Ok(RenderOutcome {
            command,
            params_path: self.params_path.clone(),
            elapsed: Some(elapsed),
        })
    }
}
