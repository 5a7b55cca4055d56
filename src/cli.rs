//! Command-line interface

use anyhow::{bail, Context, Result};
use boardcam_camtools::{script_path, write_script, DirectoryLayerSource, FlatcamRunner, ProcessGenerator};
use boardcam_core::LayerSource;
use boardcam_settings::environment::DEFAULT_PYTHON_BIN;
use boardcam_settings::persistence::{user_config_dir, DEFAULT_TEMPLATE};
use boardcam_settings::{ConfigDocument, ConfigRegistry, EnvironmentConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Generate FlatCAM scripts for milling two-sided PCBs from KiCad exports.
#[derive(Debug, Parser)]
#[command(name = "boardcam", version, long_version = crate::LONG_VERSION, about)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra directory of named configurations; may be repeated
    #[arg(long = "config-dir", value_name = "DIR", global = true)]
    pub config_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write generate_gcode.FlatScript into a board directory
    Build {
        /// Directory holding the gerber/drl exports
        directory: PathBuf,
        /// Configurations to use; later configs override earlier ones
        #[arg(required = true)]
        configs: Vec<String>,
        /// Run the script in FlatCAM afterwards
        #[arg(long)]
        run: bool,
    },
    /// Print the merged configuration
    DisplayConfig {
        /// Configurations to merge; later configs override earlier ones
        #[arg(required = true)]
        configs: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// List the named configurations
    ListConfigs {
        /// Include configurations without a description, usually includes
        #[arg(long)]
        all: bool,
    },
    /// Write the bundled template as a new named configuration
    GenerateConfig {
        /// Name of the configuration to create
        name: String,
        /// Replace an existing configuration of the same name
        #[arg(long)]
        force: bool,
    },
    /// Check a FlatCAM installation and remember where it is
    SetupFlatcam {
        /// Path to FlatCAM.py
        #[arg(long)]
        flatcam: PathBuf,
        /// Python interpreter for FlatCAM, e.g. one inside a virtualenv
        #[arg(long, default_value = DEFAULT_PYTHON_BIN)]
        python_bin: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Run a parsed command line, printing results to stdout
pub fn run(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)
}

/// Run a parsed command line, printing results to `out`
pub fn execute(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Build {
            directory,
            configs,
            run,
        } => build(&cli.config_dirs, directory, &configs, run, out),
        Commands::DisplayConfig { configs, format } => {
            display_config(&cli.config_dirs, &configs, format, out)
        }
        Commands::ListConfigs { all } => list_configs(&cli.config_dirs, all, out),
        Commands::GenerateConfig { name, force } => generate_config(&name, force, out),
        Commands::SetupFlatcam {
            flatcam,
            python_bin,
        } => setup_flatcam(flatcam, python_bin, out),
    }
}

fn merged_config(config_dirs: &[PathBuf], configs: &[String]) -> Result<ConfigDocument> {
    let registry = ConfigRegistry::discover(config_dirs)?;
    registry
        .merged(configs)
        .with_context(|| format!("Failed to load configuration {}", configs.join(", ")))
}

fn build(
    config_dirs: &[PathBuf],
    directory: PathBuf,
    configs: &[String],
    run: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let directory = directory
        .canonicalize()
        .with_context(|| format!("Board directory {} not found", directory.display()))?;
    let config = merged_config(config_dirs, configs)?;

    let project = DirectoryLayerSource::new(&directory)
        .load()
        .with_context(|| format!("Failed to read layers from {}", directory.display()))?;
    let generator = ProcessGenerator::new(project, config)?;

    let script = script_path(&directory);
    let count = write_script(&script, generator.processes())
        .with_context(|| format!("Failed to generate {}", script.display()))?;
    writeln!(out, "Wrote {} processes to {}.", count, script.display())?;

    if run {
        let environment = EnvironmentConfig::load()?;
        let runner = FlatcamRunner::from_environment(&environment)?;
        runner.run_script(&script)?;
        writeln!(out, "FlatCAM finished {}.", script.display())?;
    }
    Ok(())
}

fn display_config(
    config_dirs: &[PathBuf],
    configs: &[String],
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let config = merged_config(config_dirs, configs)?;
    write_config(&config, format, out)
}

fn write_config(config: &ConfigDocument, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let text = match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(config)?,
        OutputFormat::Json => serde_json::to_string_pretty(config)? + "\n",
    };
    out.write_all(text.as_bytes())?;
    Ok(())
}

fn list_configs(config_dirs: &[PathBuf], all: bool, out: &mut dyn Write) -> Result<()> {
    let registry = ConfigRegistry::discover(config_dirs)?;
    let names: Vec<&str> = registry.names().collect();

    let mut shown = Vec::new();
    for name in &names {
        match registry.load(name) {
            Ok(config) if all || config.description.is_some() => shown.push((*name, config)),
            Ok(_) => {}
            Err(err) => warn!("Skipping config '{}': {}", name, err),
        }
    }

    if shown.len() != names.len() {
        writeln!(
            out,
            "Showing {} of {} configs; use --all to see more.",
            shown.len(),
            names.len()
        )?;
    }

    for (name, config) in shown {
        writeln!(out, "{}", name)?;
        if let Some(description) = &config.description {
            for line in description.trim_end().lines() {
                writeln!(out, "  {}", line)?;
            }
        }
        if config.alignment_holes.is_some() {
            writeln!(out, "- Alignment Holes")?;
        }
        if config.isolation_routing.is_some() {
            writeln!(out, "- Isolation Routing")?;
        }
        if config.edge_cuts.is_some() {
            writeln!(out, "- Edge Cuts")?;
        }
        if !config.drill.is_empty() {
            writeln!(out, "- Drill Profiles")?;
            for (profile_name, profile) in config.drill.iter() {
                let max = profile
                    .max_size
                    .map(|max| max.to_string())
                    .unwrap_or_else(|| "Infinity".to_string());
                writeln!(out, "  - {}: {}-{}", profile_name, profile.min_size(), max)?;
            }
        }
        if !config.slot.is_empty() {
            writeln!(out, "- Slot Profiles")?;
            for profile_name in config.slot.keys() {
                writeln!(out, "  - {}", profile_name)?;
            }
        }
    }
    Ok(())
}

fn generate_config(name: &str, force: bool, out: &mut dyn Write) -> Result<()> {
    let dir = user_config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(format!("{}.yaml", name));
    if path.exists() && !force {
        bail!(
            "Configuration '{}' already exists at {}; use --force to replace it",
            name,
            path.display()
        );
    }
    std::fs::write(&path, DEFAULT_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    writeln!(out, "Configuration '{}' written to '{}'.", name, path.display())?;
    Ok(())
}

fn setup_flatcam(flatcam: PathBuf, python_bin: String, out: &mut dyn Write) -> Result<()> {
    let runner = FlatcamRunner::new(python_bin, flatcam);
    runner
        .verify()
        .context("Could not start FlatCAM using the provided parameters")?;

    let mut environment = EnvironmentConfig::load()?;
    environment.flatcam_path = Some(runner.flatcam_path().to_path_buf());
    environment.python_bin = Some(runner.python_bin().to_string());
    let path = environment.save()?;

    writeln!(out, "FlatCAM found. Configuration saved to {}.", path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_needs_a_config() {
        assert!(Cli::try_parse_from(["boardcam", "build", "board"]).is_err());

        let cli = Cli::try_parse_from(["boardcam", "build", "board", "base", "thin.yaml", "--run"])
            .unwrap();
        match cli.command {
            Commands::Build {
                directory,
                configs,
                run,
            } => {
                assert_eq!(directory, PathBuf::from("board"));
                assert_eq!(configs, vec!["base", "thin.yaml"]);
                assert!(run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "boardcam",
            "list-configs",
            "--all",
            "-v",
            "--config-dir",
            "a",
            "--config-dir",
            "b",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_setup_flatcam_defaults_python() {
        let cli = Cli::try_parse_from(["boardcam", "setup-flatcam", "--flatcam", "FlatCAM.py"]).unwrap();
        match cli.command {
            Commands::SetupFlatcam { python_bin, .. } => assert_eq!(python_bin, "python"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_display_builtin_default_as_json() {
        let cli = Cli::try_parse_from([
            "boardcam",
            "display-config",
            "default",
            "--format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::DisplayConfig { format: OutputFormat::Json, .. }));

        let config = ConfigRegistry::builtin().merged(&["default"]).unwrap();
        let mut out = Vec::new();
        write_config(&config, OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(value.get("description").is_none());
        assert!(value["drill"]["small"].is_object());
    }
}
