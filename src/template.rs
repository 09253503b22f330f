//! # template.rs
//!
//! Report templates are Quarto documents shipped next to the binary. This
//! module knows which file belongs to which report, where to look for it, and
//! how to stage a copy of its directory into the output directory so the
//! rendered HTML lands there.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DiffexError, DiffexResult};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Deg,
    Gsea,
}

impl ReportKind {
    pub fn template_file_name(&self) -> &'static str {
        match self {
            ReportKind::Deg => "deg_report.qmd",
            ReportKind::Gsea => "gsea_report.qmd",
        }
    }

    pub fn params_file_name(&self) -> &'static str {
        match self {
            ReportKind::Deg => "deg_params.yaml",
            ReportKind::Gsea => "gsea_params.yaml",
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ReportKind::Deg => "deg",
            ReportKind::Gsea => "gsea",
        };
        write!(f, "{}", kind)
    }
}

/// Ordered list of directories searched for packaged templates.
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    search_dirs: Vec<PathBuf>,
}

impl TemplateLocator {
    /// Search order:
    /// 1. `template_dir` from settings (`DIFFEX_TEMPLATE_DIR` included)
    /// 2. `<exe dir>/templates`
    /// 3. `<exe dir>/../share/diffex/templates`
    /// 4. `templates/` in the source tree the binary was built from
    pub fn new(settings: &Settings) -> TemplateLocator {
        let mut search_dirs = Vec::new();
        if let Some(dir) = &settings.template_dir {
            search_dirs.push(dir.clone());
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            search_dirs.push(exe_dir.join("templates"));
            search_dirs.push(exe_dir.join("..").join("share").join("diffex").join("templates"));
        }
        search_dirs.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("templates"));
        TemplateLocator { search_dirs }
    }

    pub fn with_dirs(search_dirs: Vec<PathBuf>) -> TemplateLocator {
        TemplateLocator { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve the template for `kind`. An explicit path must exist; it is
    /// never replaced by a packaged template.
    pub fn locate(&self, kind: ReportKind, explicit: Option<&Path>) -> DiffexResult<PathBuf> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(DiffexError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let candidates: Vec<PathBuf> = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(kind.template_file_name()))
            .collect();

        match candidates.iter().find(|candidate| candidate.is_file()) {
            Some(found) => {
                tracing::debug!(template = %found.display(), %kind, "template located");
                Ok(found.clone())
            }
            None => Err(DiffexError::TemplateNotFound {
                kind: kind.to_string(),
                searched: candidates,
            }),
        }
    }
}

/// Copy the directory holding `template` into `outdir` so helpers and
/// project files next to it come along. Returns the path of the staged
/// `.qmd`. A template already inside `outdir` is used as is.
pub fn stage_template(template: &Path, outdir: &Path) -> DiffexResult<PathBuf> {
    let file_name = template.file_name().ok_or_else(|| {
        DiffexError::InvalidInput(format!("Invalid template path: {}", template.display()))
    })?;
    let source_dir = match template.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(outdir)?;
    let staged = outdir.join(file_name);

    let outdir = fs::canonicalize(outdir)?;
    if fs::canonicalize(&source_dir)? == outdir {
        return Ok(staged);
    }
    copy_dir(&source_dir, &outdir, &outdir)?;
    tracing::debug!(from = %source_dir.display(), to = %outdir.display(), "template staged");
    Ok(staged)
}

// `skip` is the canonical output directory, left out when it lies inside `from`
fn copy_dir(from: &Path, to: &Path, skip: &Path) -> DiffexResult<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let path = entry.path();
        let target = to.join(entry.file_name());
        if path.is_dir() {
            if fs::canonicalize(&path)? == skip {
                continue;
            }
            copy_dir(&path, &target, skip)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}
