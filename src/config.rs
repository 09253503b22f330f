//! # config.rs
//!
//! Command-line definition for `diffex`.
//! It includes:
//! - `InputConfig`: global flags and the subcommand.
//! - `RunArgs`: render any template with an existing parameter file.
//! - `DegArgs` / `GseaArgs`: build the parameter file for the packaged
//!   differential expression and gene-set enrichment templates.
//! - `ReportArgs`: output flags shared by the packaged reports.
//!
//! Argument values are only parsed here. File checks and range checks happen
//! when a `ReportJob` is built from them.

use std::fmt::Display;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::params::{ParamOverride, parse_override};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "diffex",
    version = env!("CARGO_PKG_VERSION"),
    about = "Render differential expression (DEG) and gene-set enrichment (GSEA) HTML reports with Quarto.",
    long_about = "Render differential expression (DEG) and gene-set enrichment (GSEA) HTML reports with Quarto.\n\
    diffex writes the analysis parameters to a YAML file in the output directory and calls `quarto render` \
    on the report template. The exit code of quarto is passed through."
)]
pub struct InputConfig {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (TOML), layered over ./diffex.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Renderer executable, defaults to `quarto` on PATH
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub renderer: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Render a template with an existing parameter file
    Run(RunArgs),
    /// Differential expression report from a count matrix and a sample sheet
    Deg(DegArgs),
    /// Gene-set enrichment report from a ranked gene list
    Gsea(GseaArgs),
    /// Print diffex and renderer versions
    Version {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Quarto document to render
    #[arg(long, default_value = "DiffEx.qmd")]
    pub qmd: PathBuf,

    /// Parameter file passed with --execute-params
    #[arg(long, default_value = "params.yaml")]
    pub params: PathBuf,

    /// Copy the document here and render it there instead of in place
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// File name of the rendered HTML
    #[arg(long)]
    pub output_name: Option<String>,

    /// Override a parameter, may be repeated
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<ParamOverride>,

    /// Write files and print the quarto command without running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Output directory for the parameter file and the rendered report
    #[arg(short, long, default_value = "diffex_output")]
    pub outdir: PathBuf,

    /// Use this template instead of the packaged one
    #[arg(long, value_name = "QMD")]
    pub template: Option<PathBuf>,

    /// Report title
    #[arg(long)]
    pub title: Option<String>,

    /// File name of the rendered HTML
    #[arg(long)]
    pub output_name: Option<String>,

    /// Extra template parameter, may be repeated
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<ParamOverride>,

    /// Write files and print the quarto command without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Only check that input files exist, not their headers
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DegArgs {
    /// Count matrix: gene id column followed by one column per sample
    #[arg(short, long)]
    pub counts: PathBuf,

    /// Sample sheet with one row per sample
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Sample sheet column holding the groups to compare
    #[arg(long, default_value = "condition")]
    pub condition: String,

    /// Reference level of the condition column
    #[arg(long)]
    pub reference: Option<String>,

    /// Level compared against the reference
    #[arg(long)]
    pub treatment: Option<String>,

    /// Differential expression method run by the template
    #[arg(long, value_enum, default_value_t = DegMethod::Deseq2)]
    pub method: DegMethod,

    /// Adjusted p-value cutoff
    #[arg(long = "padj", default_value_t = 0.05)]
    pub padj_cutoff: f64,

    /// Absolute log2 fold change cutoff
    #[arg(long = "lfc", default_value_t = 1.0)]
    pub lfc_cutoff: f64,

    /// Drop genes with fewer total counts
    #[arg(long, default_value_t = 10)]
    pub min_count: u32,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Debug, Clone, Args)]
pub struct GseaArgs {
    /// Ranked gene list, or a DEG result table with a rank column
    #[arg(short, long)]
    pub ranked: PathBuf,

    /// Gene sets in GMT format; the MSigDB collection is used when absent
    #[arg(short, long, value_name = "GMT")]
    pub gene_sets: Option<PathBuf>,

    /// MSigDB collection
    #[arg(long, default_value = "H")]
    pub collection: String,

    /// Organism name as understood by msigdbr
    #[arg(long, default_value = "Homo sapiens")]
    pub organism: String,

    /// Column holding the ranking statistic
    #[arg(long, default_value = "stat")]
    pub rank_column: String,

    /// Smallest gene set tested
    #[arg(long, default_value_t = 15)]
    pub min_size: u32,

    /// Largest gene set tested
    #[arg(long, default_value_t = 500)]
    pub max_size: u32,

    /// P-value cutoff for reported sets
    #[arg(long = "pvalue", default_value_t = 0.05)]
    pub pvalue_cutoff: f64,

    /// Random seed for permutations
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Debug, PartialEq, Clone, Copy, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegMethod {
    Deseq2,
    Edger,
    Limma,
}

impl Display for DegMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let method = match self {
            DegMethod::Deseq2 => "deseq2",
            DegMethod::Edger => "edger",
            DegMethod::Limma => "limma",
        };
        write!(f, "{}", method)
    }
}
