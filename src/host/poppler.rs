use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

use super::{CancelFlag, HostError, PageOpener};

/// Opens single PDF pages by rasterising them with poppler's `pdftoppm`.
///
/// The rendered image is the session; closing it removes the scratch file.
pub struct PdftoppmProbe {
    program: String,
    scratch_dir: PathBuf,
    resolution: u32,
    cancel: CancelFlag,
}

impl PdftoppmProbe {
    pub fn new(scratch_dir: PathBuf, resolution: u32) -> Self {
        Self {
            program: "pdftoppm".to_string(),
            scratch_dir,
            resolution,
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs `<program> -v` once and returns the reported version line.
    pub fn ensure_available(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-v")
            .output()
            .with_context(|| {
                format!(
                    "failed to run {} -v; install poppler-utils to count PDF pages",
                    self.program
                )
            })?;

        Ok(first_line(&output.stdout, &output.stderr).unwrap_or_else(|| self.program.clone()))
    }

    fn output_root(&self, document: &Path, page: u32) -> PathBuf {
        let stem = document
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("pdf");
        let safe_stem = stem
            .chars()
            .map(|character| {
                if character.is_ascii_alphanumeric() {
                    character
                } else {
                    '_'
                }
            })
            .collect::<String>();
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        self.scratch_dir.join(format!(
            "embedpages_probe_{}_{}_{}_{}",
            safe_stem,
            std::process::id(),
            page,
            stamp
        ))
    }
}

impl PageOpener for PdftoppmProbe {
    type Session = PathBuf;

    fn open_page(&mut self, document: &Path, page: u32) -> Result<PathBuf, HostError> {
        self.cancel.check()?;
        let output_root = self.output_root(document, page);
        let png_path = PathBuf::from(format!("{}.png", output_root.display()));

        let output = Command::new(&self.program)
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg("-png")
            .arg("-r")
            .arg(self.resolution.to_string())
            .arg(document)
            .arg(&output_root)
            .output()
            .map_err(|err| {
                HostError::failed(
                    "open page",
                    format!(
                        "failed to execute {} for {}: {err}",
                        self.program,
                        document.display()
                    ),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_page_range_error(&stderr) {
                return Err(HostError::PageOutOfRange { page });
            }
            return Err(HostError::failed(
                "open page",
                format!(
                    "pdftoppm returned non-zero exit status for {} page {}: {}",
                    document.display(),
                    page,
                    stderr.trim()
                ),
            ));
        }

        if !png_path.exists() {
            return Err(HostError::PageOutOfRange { page });
        }

        debug!(path = %document.display(), page, "opened page");
        Ok(png_path)
    }

    fn close_discarding(&mut self, session: PathBuf) {
        let _ = fs::remove_file(&session);
    }
}

fn is_page_range_error(stderr: &str) -> bool {
    stderr.contains("Wrong page range")
}

/// poppler prints its version banner on stderr; prefer stdout when present.
fn first_line(stdout: &[u8], stderr: &[u8]) -> Option<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let source = if stdout.trim().is_empty() {
        stderr
    } else {
        stdout
    };

    source
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_pdftoppm_page_range_message() {
        let stderr = "Wrong page range given: the first page (7) can not be after the last page (3).";
        assert!(is_page_range_error(stderr));
        assert!(!is_page_range_error("Syntax Error: Couldn't read xref table"));
    }

    #[test]
    fn scratch_names_are_sanitised_and_page_specific() {
        let probe = PdftoppmProbe::new(PathBuf::from("/tmp/scratch"), 9);
        let root = probe.output_root(Path::new("/in/1234 567 (a).pdf"), 4);
        let name = root.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("embedpages_probe_1234_567__a__"));
        assert!(name.contains(&format!("_{}_4_", std::process::id())));
        assert_eq!(root.parent(), Some(Path::new("/tmp/scratch")));
    }

    #[test]
    fn missing_pdftoppm_is_reported_before_any_probe() {
        let probe = PdftoppmProbe::new(std::env::temp_dir(), 9)
            .with_program("embedpages-no-such-pdftoppm");

        let err = probe.ensure_available().unwrap_err();
        assert!(err.to_string().contains("embedpages-no-such-pdftoppm -v"));
    }

    #[test]
    fn version_banner_is_read_from_stderr_when_stdout_is_empty() {
        let stderr = b"pdftoppm version 24.02.0\nCopyright 2005-2024 The Poppler Developers\n";
        assert_eq!(
            first_line(b"  \n", stderr),
            Some("pdftoppm version 24.02.0".to_string())
        );
        assert_eq!(first_line(b"", b""), None);
    }

    #[test]
    fn cancelled_probes_do_not_run_pdftoppm() {
        let cancel = CancelFlag::new();
        let mut probe = PdftoppmProbe::new(std::env::temp_dir(), 9)
            .with_program("embedpages-no-such-pdftoppm")
            .with_cancel_flag(cancel.clone());

        cancel.cancel();
        assert_eq!(
            probe.open_page(Path::new("/in/doc.pdf"), 1),
            Err(HostError::Cancelled)
        );
    }

    #[test]
    fn closing_a_missing_scratch_file_is_harmless() {
        let mut probe = PdftoppmProbe::new(std::env::temp_dir(), 9);
        probe.close_discarding(std::env::temp_dir().join("embedpages_probe_missing.png"));
    }
}
