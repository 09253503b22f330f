use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use getset::Getters;
use itertools::Itertools;
use regex::Regex;

use crate::error::{DiffexError, DiffexResult};
use crate::settings::Settings;

static VERSION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)*").expect("static regex"));

/// One `quarto render` invocation.
#[derive(Debug, Clone, Getters)]
pub struct RenderCommand {
    #[getset(get = "pub")]
    program: String,
    qmd: PathBuf,
    params: PathBuf,
    output_name: Option<String>,
    /// Passed as `--output-dir`; the document itself is rendered in place.
    #[getset(get = "pub")]
    output_dir: Option<PathBuf>,
    self_contained: bool,
    no_cache: bool,
    extra_args: Vec<String>,
}

impl RenderCommand {
    pub fn new(program: &str, qmd: &Path, params: &Path) -> RenderCommand {
        RenderCommand {
            program: program.to_string(),
            qmd: qmd.to_path_buf(),
            params: params.to_path_buf(),
            output_name: None,
            output_dir: None,
            self_contained: true,
            no_cache: true,
            extra_args: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings, qmd: &Path, params: &Path) -> RenderCommand {
        RenderCommand {
            self_contained: settings.self_contained,
            no_cache: settings.no_cache,
            extra_args: settings.extra_args.clone(),
            ..RenderCommand::new(&settings.renderer, qmd, params)
        }
    }

    pub fn with_output_name(mut self, output_name: Option<String>) -> RenderCommand {
        self.output_name = output_name;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> RenderCommand {
        self.output_dir = output_dir;
        self
    }

    /// Arguments after the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "render".into(),
            self.qmd.clone().into_os_string(),
            "--to".into(),
            "html".into(),
        ];
        if self.no_cache {
            args.push("--no-cache".into());
        }
        if self.self_contained {
            args.push("--self-contained".into());
        }
        args.push("--execute-params".into());
        args.push(self.params.clone().into_os_string());
        if let Some(name) = &self.output_name {
            args.push("--output".into());
            args.push(name.into());
        }
        if let Some(dir) = &self.output_dir {
            args.push("--output-dir".into());
            args.push(dir.clone().into_os_string());
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }

    /// Shell-like rendering of the command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(OsString::from(&self.program))
            .chain(self.args())
            .map(|arg| {
                let arg = arg.to_string_lossy().into_owned();
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("'{}'", arg)
                } else {
                    arg
                }
            })
            .join(" ")
    }

    /// Path of the HTML file the renderer is expected to produce.
    pub fn expected_output(&self) -> PathBuf {
        let html = match &self.output_name {
            Some(name) => self.qmd.with_file_name(name),
            None => self.qmd.with_extension("html"),
        };
        match (&self.output_dir, html.file_name()) {
            (Some(dir), Some(file_name)) => dir.join(file_name),
            _ => html,
        }
    }

    /// Run the renderer with inherited stdio and wait for it.
    pub fn execute(&self) -> DiffexResult<(ExitStatus, Duration)> {
        let start = Instant::now();
        tracing::info!("Running: {}", self.display());

        let status = Command::new(&self.program)
            .args(self.args())
            .status()
            .map_err(|e| spawn_error(&self.program, e))?;

        let elapsed = start.elapsed();
        tracing::debug!(?status, ?elapsed, "renderer finished");
        Ok((status, elapsed))
    }
}

fn spawn_error(program: &str, error: std::io::Error) -> DiffexError {
    if error.kind() == ErrorKind::NotFound {
        DiffexError::RendererNotFound {
            program: program.to_string(),
        }
    } else {
        DiffexError::Io(error)
    }
}

/// Exit code the CLI reports for a finished renderer. A child killed by a
/// signal maps to `128 + signal` on Unix.
pub fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// `Ok` for a successful status, `RendererFailed` carrying the exit code otherwise.
pub fn check_status(status: &ExitStatus) -> DiffexResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(DiffexError::RendererFailed {
            code: exit_code_of(status),
        })
    }
}

/// Version reported by `<program> --version`.
pub fn renderer_version(program: &str) -> DiffexResult<String> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .map_err(|e| spawn_error(program, e))?;

    if !output.status.success() {
        return Err(DiffexError::RendererFailed {
            code: exit_code_of(&output.status),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_version(&stdout))
}

fn parse_version(stdout: &str) -> String {
    VERSION_TOKEN
        .find(stdout)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| stdout.trim().to_string())
}
