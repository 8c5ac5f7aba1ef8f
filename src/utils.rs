//! Common utilities shared across modules.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Expand a leading `~` into the home directory and normalize separators.
///
/// Used as the registry key for projects. Idempotent; paths without the
/// shorthand are only normalized (`a//b/` becomes `a/b`).
pub fn canonicalize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    let expanded = match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    };

    expanded.components().collect()
}

/// True unless the path is known not to exist.
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    match std::fs::metadata(path) {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::NotFound,
    }
}

pub fn is_directory(path: impl AsRef<Path>) -> io::Result<bool> {
    Ok(std::fs::metadata(path)?.is_dir())
}

/// Exit status and captured output of a finished command.
#[derive(Debug)]
pub struct ExecOutput {
    pub status: ExitStatus,
    pub stdout: String,
    /// stdout followed by stderr
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `program` with `args` inside `dir`, capturing all output.
pub fn exec_in_path<I, S>(program: &str, args: I, dir: &Path) -> io::Result<ExecOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let out = Command::new(program).args(args).current_dir(dir).output()?;

    let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
    let mut output = stdout.clone();
    output.push_str(&String::from_utf8_lossy(&out.stderr));

    Ok(ExecOutput {
        status: out.status,
        stdout,
        output,
    })
}

/// Concatenate `files` in order into `to`, replacing it atomically.
///
/// The temporary file lives next to `to` and its name starts with the
/// target's file name.
pub fn concat_files(to: &Path, files: &[PathBuf]) -> io::Result<()> {
    let dir = to
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let prefix = to
        .file_name()
        .map(|n| format!("{}.", n.to_string_lossy()))
        .unwrap_or_default();

    let mut tmp = tempfile::Builder::new().prefix(&prefix).tempfile_in(dir)?;
    for file in files {
        let mut src = File::open(file)?;
        io::copy(&mut src, &mut tmp)?;
    }
    tmp.flush()?;
    tmp.persist(to).map_err(|e| e.error)?;

    Ok(())
}
