//! # params.rs
//!
//! Parameter maps handed to the report templates through
//! `quarto render --execute-params`. Typed parameters for the packaged DEG and
//! GSEA templates are serialized into a YAML mapping, `--set key=value`
//! overrides are merged on top, and the result is written to the output
//! directory before the renderer starts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::config::{DegArgs, DegMethod, GseaArgs};
use crate::error::{DiffexError, DiffexResult};

static OVERRIDE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// One `--set key=value` pair. The value is read as a YAML scalar, so
/// `top_n=30` yields a number and `shrink=false` a boolean.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamOverride {
    pub key: String,
    pub value: Value,
}

pub fn parse_override(raw: &str) -> DiffexResult<ParamOverride> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        DiffexError::InvalidParameter(format!("expected KEY=VALUE, got '{}'", raw))
    })?;
    let key = key.trim();
    if !OVERRIDE_KEY.is_match(key) {
        return Err(DiffexError::InvalidParameter(format!(
            "'{}' is not a valid parameter name",
            key
        )));
    }

    // nested values are kept as plain text; templates only declare scalars
    let value = if value.trim().is_empty() {
        Value::Null
    } else {
        match serde_yaml::from_str::<Value>(value) {
            Ok(parsed @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => {
                parsed
            }
            _ => Value::String(value.to_string()),
        }
    };

    Ok(ParamOverride {
        key: key.to_string(),
        value,
    })
}

/// Insert overrides into `params`, replacing keys that are already present.
pub fn apply_overrides(params: &mut Mapping, overrides: &[ParamOverride]) {
    for o in overrides {
        if let Some(previous) = params.insert(Value::String(o.key.clone()), o.value.clone()) {
            tracing::debug!(key = %o.key, ?previous, value = ?o.value, "parameter overridden");
        }
    }
}

pub fn to_mapping<T: Serialize>(params: &T) -> DiffexResult<Mapping> {
    match serde_yaml::to_value(params)? {
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(DiffexError::InvalidParameter(format!(
            "parameters must serialize to a mapping, got {:?}",
            other
        ))),
    }
}

/// Write `params` as YAML, creating parent directories as needed.
pub fn write_params_file(params: &Mapping, path: &Path) -> DiffexResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = serde_yaml::to_string(params)?;
    let content = format!(
        "# generated by diffex {}\n{}",
        env!("CARGO_PKG_VERSION"),
        body
    );
    fs::write(path, content)?;
    tracing::debug!(path = %path.display(), entries = params.len(), "parameter file written");
    Ok(())
}

/// Read an existing parameter file. An empty file is an empty mapping.
pub fn load_params_file(path: &Path) -> DiffexResult<Mapping> {
    if !path.is_file() {
        return Err(DiffexError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&content)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(DiffexError::InvalidInput(format!(
            "{} must contain a YAML mapping of parameter names to values",
            path.display()
        ))),
    }
}

fn absolute(path: &Path) -> DiffexResult<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn check_probability(name: &str, value: f64) -> DiffexResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(DiffexError::InvalidParameter(format!(
            "{} must be in (0, 1], got {}",
            name, value
        )))
    }
}

/// Parameters of the packaged differential expression template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegParams {
    pub counts: PathBuf,
    pub metadata: PathBuf,
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    pub method: DegMethod,
    pub padj_cutoff: f64,
    pub lfc_cutoff: f64,
    pub min_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub outdir: PathBuf,
    pub version: String,
}

impl DegParams {
    pub fn from_args(args: &DegArgs, outdir: &Path) -> DiffexResult<DegParams> {
        check_probability("--padj", args.padj_cutoff)?;
        if !args.lfc_cutoff.is_finite() || args.lfc_cutoff < 0.0 {
            return Err(DiffexError::InvalidParameter(format!(
                "--lfc must be a non-negative number, got {}",
                args.lfc_cutoff
            )));
        }
        if args.condition.trim().is_empty() {
            return Err(DiffexError::InvalidParameter(
                "--condition must name a sample sheet column".to_string(),
            ));
        }
        if let (Some(reference), Some(treatment)) = (&args.reference, &args.treatment) {
            if reference == treatment {
                return Err(DiffexError::InvalidParameter(format!(
                    "--reference and --treatment are both '{}'",
                    reference
                )));
            }
        }

        Ok(DegParams {
            counts: absolute(&args.counts)?,
            metadata: absolute(&args.metadata)?,
            condition: args.condition.clone(),
            reference: args.reference.clone(),
            treatment: args.treatment.clone(),
            method: args.method,
            padj_cutoff: args.padj_cutoff,
            lfc_cutoff: args.lfc_cutoff,
            min_count: args.min_count,
            title: args.report.title.clone(),
            outdir: absolute(outdir)?,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

/// Parameters of the packaged gene-set enrichment template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GseaParams {
    pub ranked: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gene_sets: Option<PathBuf>,
    pub collection: String,
    pub organism: String,
    pub rank_column: String,
    pub min_size: u32,
    pub max_size: u32,
    pub pvalue_cutoff: f64,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub outdir: PathBuf,
    pub version: String,
}

impl GseaParams {
    pub fn from_args(args: &GseaArgs, outdir: &Path) -> DiffexResult<GseaParams> {
        check_probability("--pvalue", args.pvalue_cutoff)?;
        if args.min_size == 0 {
            return Err(DiffexError::InvalidParameter(
                "--min-size must be at least 1".to_string(),
            ));
        }
        if args.min_size > args.max_size {
            return Err(DiffexError::InvalidParameter(format!(
                "--min-size ({}) is larger than --max-size ({})",
                args.min_size, args.max_size
            )));
        }

        let gene_sets = match &args.gene_sets {
            Some(path) => Some(absolute(path)?),
            None => None,
        };

        Ok(GseaParams {
            ranked: absolute(&args.ranked)?,
            gene_sets,
            collection: args.collection.clone(),
            organism: args.organism.clone(),
            rank_column: args.rank_column.clone(),
            min_size: args.min_size,
            max_size: args.max_size,
            pvalue_cutoff: args.pvalue_cutoff,
            seed: args.seed,
            title: args.report.title.clone(),
            outdir: absolute(outdir)?,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
