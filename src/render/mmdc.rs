//! Mermaid CLI (`mmdc`) as the rendering engine.
//!
//! Each render writes the source and a JSON config into a scratch directory,
//! runs `mmdc` on them and reads back the SVG it produced.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{DiagramRenderer, RenderConfig, RenderError};

/// Program name used when none is configured.
pub const DEFAULT_PROGRAM: &str = "mmdc";

const INPUT_NAME: &str = "input.mmd";
const OUTPUT_NAME: &str = "output.svg";
const CONFIG_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct MmdcRenderer {
    program: OsString,
}

impl Default for MmdcRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl MmdcRenderer {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, dir: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(dir.join(INPUT_NAME))
            .arg("-o")
            .arg(dir.join(OUTPUT_NAME))
            .arg("-c")
            .arg(dir.join(CONFIG_NAME))
            .arg("-b")
            .arg("transparent")
            .arg("-q")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl DiagramRenderer for MmdcRenderer {
    fn render(&self, source: &str, config: &RenderConfig) -> Result<String, RenderError> {
        let _scope = crate::perf::scope("render.mmdc");
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(INPUT_NAME), source)?;
        std::fs::write(
            dir.path().join(CONFIG_NAME),
            config.to_mermaid_json().to_string(),
        )?;

        let mut cmd = self.command(dir.path());
        debug!(?cmd, "running mermaid cli");
        let output = cmd.output().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                RenderError::Unavailable(format!(
                    "{} not found (install @mermaid-js/mermaid-cli or pass --mmdc)",
                    self.program.to_string_lossy()
                ))
            } else {
                RenderError::Io(err)
            }
        })?;

        if !output.status.success() {
            return Err(RenderError::Diagram(engine_message(&output.stderr)));
        }
        Ok(std::fs::read_to_string(dir.path().join(OUTPUT_NAME))?)
    }
}

/// Pull the useful part out of mmdc's stderr.
///
/// mmdc prints the parser error followed by a Node stack trace; the trace
/// lines start with `at ` and are dropped.
fn engine_message(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("at "))
        .collect();
    if lines.is_empty() {
        "mermaid cli exited with an error".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Options;

    #[test]
    fn test_engine_message_strips_stack_trace() {
        let stderr = b"\nError: Parse error on line 1:\nnot a valid diagram###\n^\n    at Parser.parseError (mermaid.js:1:1)\n    at Object.parse (mermaid.js:2:2)\n";
        assert_eq!(
            engine_message(stderr),
            "Error: Parse error on line 1:\nnot a valid diagram###\n^"
        );
    }

    #[test]
    fn test_engine_message_fallback() {
        assert_eq!(engine_message(b"  \n"), "mermaid cli exited with an error");
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let renderer = MmdcRenderer::new("livechart-definitely-missing-mmdc");
        let config = RenderConfig::from_options(&Options::default());
        let err = renderer.render("graph TD\n  A --> B", &config).unwrap_err();
        assert!(matches!(err, RenderError::Unavailable(_)), "got {err:?}");
    }
}
