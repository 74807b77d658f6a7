//! External conversion engine adapter.
//!
//! vivadoc does not render final formats itself; it drives an
//! asciidoctor-style CLI that converts the intermediate document to a
//! backend. The trait seam keeps the coordinator testable without a real
//! converter installed.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::application::render::types::{Backend, DocumentAttributes};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("converter CLI unavailable: {0}")]
    NotFound(#[source] io::Error),
    #[error("failed to invoke converter CLI: {0}")]
    Io(#[source] io::Error),
    #[error("converter CLI failed (exit {exit_code:?}): {stderr}")]
    Cli {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("converter reported success but `{path}` was not produced")]
    MissingOutput { path: String },
}

/// Converts an intermediate document file at a path into a final-format
/// artifact. Implementations must never swallow failures: any engine
/// error propagates to the coordinator as a job failure.
pub trait ConversionEngine: Send + Sync {
    fn convert(
        &self,
        document: &Path,
        backend: Backend,
        attributes: &DocumentAttributes,
    ) -> Result<PathBuf, ConvertError>;
}

/// Production engine shelling out to a configurable asciidoctor-style
/// binary. Runs in safe mode with the request attributes passed as `-a`
/// pairs; PDF passes load the PDF converter extension.
#[derive(Debug, Clone)]
pub struct AsciidoctorCli {
    cli_path: PathBuf,
}

impl AsciidoctorCli {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl ConversionEngine for AsciidoctorCli {
    fn convert(
        &self,
        document: &Path,
        backend: Backend,
        attributes: &DocumentAttributes,
    ) -> Result<PathBuf, ConvertError> {
        let started_at = Instant::now();
        let output_path = document.with_extension(backend.extension());

        let mut command = Command::new(&self.cli_path);
        command
            .arg("--backend")
            .arg(backend.converter_name())
            .arg("--safe-mode")
            .arg("safe");
        if backend == Backend::Pdf {
            command.arg("--require").arg("asciidoctor-pdf");
        }
        for attribute in attributes.converter_attributes() {
            command.arg("--attribute").arg(attribute);
        }
        command
            .arg("--out-file")
            .arg(&output_path)
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = command.output().map_err(|err| {
            warn!(
                target = "application::render::convert",
                cli_path = %self.cli_path.display(),
                backend = %backend,
                error = %err,
                "failed to spawn converter CLI"
            );
            if err.kind() == ErrorKind::NotFound {
                ConvertError::NotFound(err)
            } else {
                ConvertError::Io(err)
            }
        })?;

        if !output.status.success() {
            let exit_code = output.status.code();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                target = "application::render::convert",
                backend = %backend,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                stderr = %stderr,
                "converter CLI invocation failed"
            );
            return Err(ConvertError::Cli { exit_code, stderr });
        }

        if !output_path.is_file() {
            return Err(ConvertError::MissingOutput {
                path: output_path.display().to_string(),
            });
        }

        info!(
            target = "application::render::convert",
            backend = %backend,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            output = %output_path.display(),
            "converted intermediate document"
        );

        Ok(output_path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::application::render::types::RenderRequest;
    use crate::domain::build::DocsFormat;
    use std::{fs, os::unix::fs::PermissionsExt, path::PathBuf};
    use tempfile::TempDir;

    fn make_executable(path: &PathBuf) {
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("set perms");
    }

    fn attrs(backend: Backend) -> DocumentAttributes {
        RenderRequest::new(DocsFormat::All).attributes_for(backend)
    }

    #[test]
    fn converts_with_a_working_cli() {
        let dir = TempDir::new().expect("temp dir");
        let script_path = dir.path().join("fake-asciidoctor");
        let args_path = dir.path().join("args.log");
        let script = format!(
            r#"#!/bin/sh
set -eu
echo "$@" > "{args_file}"
out=""
while [ "$#" -gt 0 ]; do
  case "$1" in
    --out-file)
      shift
      out="$1"
      ;;
    *)
      ;;
  esac
  shift
done
if [ -z "${{out:-}}" ]; then
  echo "missing --out-file" >&2
  exit 2
fi
echo "<html>converted</html>" > "$out"
"#,
            args_file = args_path.display()
        );
        fs::write(&script_path, script).expect("write script");
        make_executable(&script_path);

        let document = dir.path().join("documentation.adoc");
        fs::write(&document, "= Doc\n").expect("write adoc");

        let engine = AsciidoctorCli::new(script_path);
        let produced = engine
            .convert(&document, Backend::Html5, &attrs(Backend::Html5))
            .expect("conversion");
        assert_eq!(produced, dir.path().join("documentation.html"));

        let args = fs::read_to_string(&args_path).expect("read args");
        assert!(args.contains("--backend html5"), "args: {args}");
        assert!(args.contains("--safe-mode safe"), "args: {args}");
        assert!(args.contains("toc=right"), "args: {args}");
        assert!(
            !args.contains("asciidoctor-pdf"),
            "html pass must not load the pdf extension: {args}"
        );
    }

    #[test]
    fn pdf_pass_loads_the_pdf_converter() {
        let dir = TempDir::new().expect("temp dir");
        let script_path = dir.path().join("fake-asciidoctor");
        let args_path = dir.path().join("args.log");
        let script = format!(
            r#"#!/bin/sh
set -eu
echo "$@" > "{args_file}"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--out-file" ]; then out="$arg"; fi
  prev="$arg"
done
printf 'pdf-bytes' > "$out"
"#,
            args_file = args_path.display()
        );
        fs::write(&script_path, script).expect("write script");
        make_executable(&script_path);

        let document = dir.path().join("documentation.adoc");
        fs::write(&document, "= Doc\n").expect("write adoc");

        let engine = AsciidoctorCli::new(script_path);
        let produced = engine
            .convert(&document, Backend::Pdf, &attrs(Backend::Pdf))
            .expect("conversion");
        assert_eq!(produced, dir.path().join("documentation.pdf"));

        let args = fs::read_to_string(&args_path).expect("read args");
        assert!(args.contains("--backend pdf"), "args: {args}");
        assert!(args.contains("--require asciidoctor-pdf"), "args: {args}");
    }

    #[test]
    fn surfaces_cli_errors_with_exit_code_and_stderr() {
        let dir = TempDir::new().expect("temp dir");
        let script_path = dir.path().join("fake-asciidoctor");
        fs::write(
            &script_path,
            r#"#!/bin/sh
echo "invalid attribute" >&2
exit 7
"#,
        )
        .expect("write script");
        make_executable(&script_path);

        let document = dir.path().join("documentation.adoc");
        fs::write(&document, "= Doc\n").expect("write adoc");

        let engine = AsciidoctorCli::new(script_path);
        let err = engine
            .convert(&document, Backend::Html5, &attrs(Backend::Html5))
            .expect_err("expected cli failure");
        match err {
            ConvertError::Cli { exit_code, stderr } => {
                assert_eq!(exit_code, Some(7));
                assert!(stderr.contains("invalid attribute"), "stderr: {stderr}");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn missing_binary_is_reported_as_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let document = dir.path().join("documentation.adoc");
        fs::write(&document, "= Doc\n").expect("write adoc");

        let engine = AsciidoctorCli::new(dir.path().join("does-not-exist"));
        let err = engine
            .convert(&document, Backend::Html5, &attrs(Backend::Html5))
            .expect_err("expected spawn failure");
        assert!(matches!(err, ConvertError::NotFound(_)));
    }

    #[test]
    fn silent_converter_is_caught_by_the_output_check() {
        let dir = TempDir::new().expect("temp dir");
        let script_path = dir.path().join("fake-asciidoctor");
        fs::write(&script_path, "#!/bin/sh\nexit 0\n").expect("write script");
        make_executable(&script_path);

        let document = dir.path().join("documentation.adoc");
        fs::write(&document, "= Doc\n").expect("write adoc");

        let engine = AsciidoctorCli::new(script_path);
        let err = engine
            .convert(&document, Backend::Html5, &attrs(Backend::Html5))
            .expect_err("expected missing output");
        assert!(matches!(err, ConvertError::MissingOutput { .. }));
    }
}
