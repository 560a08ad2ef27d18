//! pointgen - campus configuration generator for simsrv
//!
//! Reads `generator_presets.yaml` and writes `sensors.yaml` plus the
//! register, object and topic maps for every building.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use sensim_routing::{generate, GeneratedConfig, GeneratorPresets};

#[derive(Parser, Debug)]
#[command(name = "pointgen")]
#[command(about = "Generate simsrv point sets and protocol maps from building templates")]
#[command(version)]
struct Cli {
    /// Presets file with `settings` and `templates`
    #[arg(short, long, default_value = "config/generator_presets.yaml")]
    presets: PathBuf,

    /// Directory the four YAML files are written to
    #[arg(short, long, default_value = "config")]
    output: PathBuf,

    /// Override `settings.num_buildings`
    #[arg(short, long)]
    buildings: Option<u32>,

    /// Validate and print the summary without writing files
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    no_color: bool,
}

fn run(cli: &Cli) -> Result<GeneratedConfig> {
    let mut presets = GeneratorPresets::load(&cli.presets)
        .with_context(|| format!("Failed to load presets {}", cli.presets.display()))?;

    if let Some(buildings) = cli.buildings {
        presets.settings.num_buildings = buildings;
    }
    if presets.templates.is_empty() {
        bail!("{} defines no templates", cli.presets.display());
    }
    info!(
        "Expanding {} templates over {} buildings",
        presets.templates.len(),
        presets.settings.num_buildings
    );

    let generated = generate(&presets).context("Generation failed")?;
    if cli.dry_run {
        debug!("Dry run, skipping write to {}", cli.output.display());
    } else {
        generated
            .write_to_dir(&cli.output)
            .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    }
    Ok(generated)
}

fn print_summary(cli: &Cli, generated: &GeneratedConfig) {
    println!(
        "{} Generated {} points",
        "OK".green(),
        generated.points.len().to_string().bright_white()
    );

    let mut tables: BTreeMap<String, usize> = BTreeMap::new();
    for (table, _, _) in generated.registers.iter() {
        *tables.entry(table.to_string()).or_default() += 1;
    }
    for (table, count) in &tables {
        println!("   {:<16} {}", table, count);
    }

    let mut objects: BTreeMap<String, usize> = BTreeMap::new();
    for (id, _) in generated.objects.iter() {
        *objects.entry(id.object_type.label().to_string()).or_default() += 1;
    }
    for (object_type, count) in &objects {
        println!("   {:<16} {}", object_type, count);
    }
    println!("   {:<16} {}", "topics", generated.topics.len());

    if cli.dry_run {
        println!("{} Dry run, nothing written", "INFO".bright_cyan());
    } else {
        println!(
            "{} Files saved to {}/",
            "INFO".bright_cyan(),
            cli.output.display()
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(generated) => {
            print_summary(&cli, &generated);
            Ok(())
        },
        Err(e) => {
            eprintln!("{} {:#}", "ERROR".red(), e);
            std::process::exit(1);
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::io::Write;

    const PRESETS: &str = r#"
settings:
  num_buildings: 3
templates:
  - suffix: temp
    unit: C
    base: 21
    min: 15
    max: 30
    type: sine
    writable: false
    modbus: ir
    scale: 0.1
  - suffix: occupied
    unit: bool
    base: 0
    min: 0
    max: 1
    type: pulse
    writable: false
    modbus: di
  - suffix: setpoint
    unit: C
    base: 22
    min: 16
    max: 28
    type: constant_drift
    writable: true
    modbus: hr
"#;

    fn cli(presets: PathBuf, output: PathBuf) -> Cli {
        Cli {
            presets,
            output,
            buildings: None,
            dry_run: false,
            verbose: false,
            no_color: true,
        }
    }

    fn presets_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PRESETS.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_writes_all_files() {
        let presets = presets_file();
        let out = tempfile::tempdir().unwrap();
        let generated = run(&cli(presets.path().to_path_buf(), out.path().to_path_buf())).unwrap();

        assert_eq!(generated.points.len(), 9);
        for file in ["sensors.yaml", "modbus_map.yaml", "bacnet_map.yaml", "mqtt_map.yaml"] {
            assert!(out.path().join(file).exists(), "{} missing", file);
        }
    }

    #[test]
    fn test_buildings_override_and_dry_run() {
        let presets = presets_file();
        let out = tempfile::tempdir().unwrap();
        let mut args = cli(presets.path().to_path_buf(), out.path().join("gen"));
        args.buildings = Some(10);
        args.dry_run = true;

        let generated = run(&args).unwrap();
        assert_eq!(generated.points.len(), 30);
        assert_eq!(generated.topics.len(), 30);
        assert!(!out.path().join("gen").exists());
    }

    #[test]
    fn test_missing_presets_fails() {
        let out = tempfile::tempdir().unwrap();
        let args = cli(out.path().join("absent.yaml"), out.path().to_path_buf());
        assert!(run(&args).is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = Cli::parse_from(["pointgen", "-p", "p.yaml", "-o", "out", "-b", "5"]);
        assert_eq!(args.presets, PathBuf::from("p.yaml"));
        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.buildings, Some(5));
    }
}
