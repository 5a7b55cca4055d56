//! FlatCAM script output and execution

use crate::command::Command;
use crate::error::{CamToolError, Result};
use boardcam_settings::EnvironmentConfig;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};

/// Name of the generated script inside the board directory
pub const SCRIPT_NAME: &str = "generate_gcode.FlatScript";

/// Where the script for the board in `directory` is written
pub fn script_path(directory: &Path) -> PathBuf {
    directory.join(SCRIPT_NAME)
}

/// Write one command per line to `path`, returning how many were written.
///
/// Stops at the first generation error; the lines written before it stay
/// in the file.
pub fn write_script<I>(path: &Path, commands: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<Command>>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;

    for command in commands {
        let command = command?;
        writeln!(writer, "{}", command)?;
        count += 1;
    }

    writer.flush()?;
    info!("Wrote {} commands to {}", count, path.display());
    Ok(count)
}

/// Runs FlatCAM through its Python entry point
#[derive(Debug, Clone, PartialEq)]
pub struct FlatcamRunner {
    python_bin: String,
    flatcam_path: PathBuf,
}

impl FlatcamRunner {
    pub fn new(python_bin: impl Into<String>, flatcam_path: impl Into<PathBuf>) -> Self {
        Self {
            python_bin: python_bin.into(),
            flatcam_path: flatcam_path.into(),
        }
    }

    /// Runner for the FlatCAM saved by `setup-flatcam`
    pub fn from_environment(environment: &EnvironmentConfig) -> Result<Self> {
        let flatcam_path = environment
            .flatcam_path
            .clone()
            .ok_or(CamToolError::FlatcamNotConfigured)?;
        Ok(Self::new(environment.python_bin(), flatcam_path))
    }

    pub fn python_bin(&self) -> &str {
        &self.python_bin
    }

    pub fn flatcam_path(&self) -> &Path {
        &self.flatcam_path
    }

    fn command(&self) -> process::Command {
        let mut command = process::Command::new(&self.python_bin);
        command.arg(&self.flatcam_path);
        command
    }

    /// Check that FlatCAM starts and accepts shell scripts
    pub fn verify(&self) -> Result<()> {
        debug!(
            "Checking {} {} --help",
            self.python_bin,
            self.flatcam_path.display()
        );
        let output = self
            .command()
            .arg("--help")
            .output()
            .map_err(|e| CamToolError::FlatcamUnavailable(format!("{}: {}", self.python_bin, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.contains("--shellfile") {
            return Err(CamToolError::FlatcamUnavailable(format!(
                "{} does not accept --shellfile",
                self.flatcam_path.display()
            )));
        }
        Ok(())
    }

    /// Run `script` in FlatCAM and wait for it to finish
    pub fn run_script(&self, script: &Path) -> Result<()> {
        info!("Running {} in FlatCAM", script.display());
        let status = self
            .command()
            .arg(format!("--shellfile={}", script.display()))
            .status()
            .map_err(|e| CamToolError::FlatcamUnavailable(format!("{}: {}", self.python_bin, e)))?;

        if !status.success() {
            return Err(CamToolError::Execution {
                program: self.python_bin.clone(),
                status: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardcam_core::LayerType;

    #[test]
    fn test_write_script_stops_at_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_path(dir.path());
        let commands = vec![
            Ok(Command::new("open_gerber").arg("a.gbr")),
            Err(CamToolError::missing_layer(LayerType::EdgeCuts)),
            Ok(Command::quit()),
        ];

        let err = write_script(&path, commands).unwrap_err();
        assert!(err.is_missing_layer());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "open_gerber a.gbr\n");
    }

    #[test]
    fn test_write_script_counts_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = script_path(dir.path());
        let count = write_script(&path, vec![Ok(Command::quit()), Ok(Command::quit())]).unwrap();
        assert_eq!(count, 2);
        assert!(path.ends_with("generate_gcode.FlatScript"));
    }

    #[test]
    fn test_runner_requires_configured_flatcam() {
        let err = FlatcamRunner::from_environment(&EnvironmentConfig::default()).unwrap_err();
        assert!(matches!(err, CamToolError::FlatcamNotConfigured));
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_and_run_with_stand_in_program() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("FlatCAM.py");
        std::fs::write(
            &fake,
            "case \"$1\" in\n  --help) echo 'usage: FlatCAM.py [--shellfile=FILE]' ;;\n  --shellfile=*) exit 3 ;;\nesac\n",
        )
        .unwrap();

        let runner = FlatcamRunner::new("sh", &fake);
        runner.verify().unwrap();

        let err = runner.run_script(&dir.path().join("x.FlatScript")).unwrap_err();
        assert!(matches!(err, CamToolError::Execution { status: 3, .. }));
    }

    #[test]
    fn test_missing_interpreter_is_unavailable() {
        let runner = FlatcamRunner::new("boardcam-no-such-python", "FlatCAM.py");
        assert!(matches!(
            runner.verify(),
            Err(CamToolError::FlatcamUnavailable(_))
        ));
    }
}
