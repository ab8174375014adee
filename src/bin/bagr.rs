use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use ansi_term::Color;
use clap::AppSettings::UseLongFormatForHelpSubcommand;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use bagr::bagit::{
    export_profile, import_profile, BagSink, Bagger, EngineConfig, Observer, PayloadSource,
    Profile, Task, ValidationError,
};

/// A CLI for building and validating BagIt bags against declarative profiles
#[derive(Debug, Parser)]
#[clap(name = "bagr", author = "Peter Winckles <pwinckles@pm.me>", version)]
#[clap(setting(UseLongFormatForHelpSubcommand))]
pub struct BagrArgs {
    /// Suppress error messages and other command specific logging
    #[clap(short, long)]
    pub quiet: bool,

    /// Increase log level
    #[clap(short = 'V', long)]
    pub verbose: bool,

    /// Disable all output styling
    #[clap(short = 'S', long)]
    pub no_styles: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a bag against a profile
    Validate(ValidateCmd),
    /// Build a new bag from a set of source files
    Bag(BagCmd),
    /// Work with BagIt profiles
    #[clap(subcommand)]
    Profile(ProfileCmd),
}

#[derive(Args, Debug)]
pub struct ValidateCmd {
    /// Path to the profile JSON to validate against
    #[clap(short, long, value_name = "PROFILE_JSON")]
    pub profile: PathBuf,

    /// Path to the bag to validate; a directory or a serialized archive
    #[clap(value_name = "BAG_PATH")]
    pub bag_path: PathBuf,
}

#[derive(Args, Debug)]
pub struct BagCmd {
    /// Path to the profile JSON to build against
    #[clap(short, long, value_name = "PROFILE_JSON")]
    pub profile: PathBuf,

    /// Where to write the bag; a directory path, or a path ending in `.tar`
    #[clap(short, long, value_name = "OUTPUT_PATH")]
    pub output: PathBuf,

    /// Skip self-validation of the built bag
    #[clap(long)]
    pub no_self_validate: bool,

    /// Source files or directories to fold into the bag's data/ payload
    #[clap(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCmd {
    /// Import a standard bagit-profiles JSON file into bagr's internal representation
    Import(ProfileImportCmd),
    /// Export bagr's internal profile representation to the standard JSON schema
    Export(ProfileExportCmd),
}

#[derive(Args, Debug)]
pub struct ProfileImportCmd {
    /// Path to the standard bagit-profiles JSON to import
    #[clap(value_name = "PROFILE_JSON")]
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct ProfileExportCmd {
    /// Path to an internal profile JSON to export
    #[clap(value_name = "PROFILE_JSON")]
    pub input: PathBuf,
}

/// Forwards progress and errors to stderr, colored unless styling is disabled (§6.5).
struct CliObserver {
    styled: bool,
}

impl Observer for CliObserver {
    fn on_task(&mut self, task: &Task) {
        log::info!("[{:>5.1}%] {}: {}", task.percent, task.rel_path, task.message);
    }

    fn on_error(&mut self, error: &ValidationError) {
        if self.styled {
            eprintln!("{} {}", Color::Red.bold().paint("error:"), error.message);
        } else {
            eprintln!("error: {}", error.message);
        }
    }
}

fn main() -> ExitCode {
    let mut args = BagrArgs::parse();

    let log_level = if args.quiet {
        LevelFilter::Off
    } else if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::builder()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    if atty::isnt(atty::Stream::Stdout) {
        args.no_styles = true;
    }

    let mut observer = CliObserver { styled: !args.no_styles };

    let result = match &args.command {
        Command::Validate(cmd) => run_validate(cmd, &mut observer),
        Command::Bag(cmd) => run_bag(cmd, &mut observer),
        Command::Profile(ProfileCmd::Import(cmd)) => run_profile_import(cmd),
        Command::Profile(ProfileCmd::Export(cmd)) => run_profile_export(cmd),
    };

    match result {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(CliError::InvalidParams(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Runtime(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(3)
        }
    }
}

/// Distinguishes bad CLI input (§6.4 exit code 2) from failures inside the engine itself (exit
/// code 3) so `main` doesn't have to inspect message text to pick an exit code.
enum CliError {
    InvalidParams(String),
    Runtime(String),
}

fn load_profile(path: &PathBuf) -> Result<Profile, CliError> {
    let json = fs::read_to_string(path)
        .map_err(|e| CliError::InvalidParams(format!("failed to read {}: {e}", path.display())))?;
    import_profile(&json, &path.to_string_lossy())
        .map_err(|e| CliError::InvalidParams(format!("invalid profile {}: {e}", path.display())))
}

fn run_validate(cmd: &ValidateCmd, observer: &mut CliObserver) -> Result<bool, CliError> {
    if !cmd.bag_path.exists() {
        return Err(CliError::InvalidParams(format!(
            "{} does not exist",
            cmd.bag_path.display()
        )));
    }

    let profile = load_profile(&cmd.profile)?;
    let validator = bagr::bagit::Validator::new(&cmd.bag_path, &profile, EngineConfig::default());
    let report = validator
        .validate(observer)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    if report.is_valid() {
        println!("{} is valid", cmd.bag_path.display());
    } else {
        println!(
            "{} is not valid: {} error(s)",
            cmd.bag_path.display(),
            report.errors.len()
        );
    }
    Ok(report.is_valid())
}

fn run_bag(cmd: &BagCmd, observer: &mut CliObserver) -> Result<bool, CliError> {
    let profile = load_profile(&cmd.profile)?;

    let mut sources = Vec::new();
    for source in &cmd.sources {
        if !source.exists() {
            return Err(CliError::InvalidParams(format!(
                "{} does not exist",
                source.display()
            )));
        }
        collect_sources(source, source, &mut sources)
            .map_err(CliError::InvalidParams)?;
    }

    let sink = if cmd.output.extension().map(|e| e == "tar").unwrap_or(false) {
        BagSink::Tar(cmd.output.clone())
    } else {
        BagSink::Directory(cmd.output.clone())
    };

    let bagger = Bagger::new(&profile, EngineConfig::default());
    let overrides = bagr::bagit::KeyValueCollection::new();
    let report = bagger
        .bag(&sources, &sink, &overrides, !cmd.no_self_validate, observer)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    println!("Bagged {} source(s) into {}", sources.len(), cmd.output.display());

    match report {
        Some(report) if !report.is_valid() => Ok(false),
        _ => Ok(true),
    }
}

fn collect_sources(root: &PathBuf, current: &PathBuf, out: &mut Vec<PayloadSource>) -> Result<(), String> {
    if current.is_dir() {
        for entry in fs::read_dir(current).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            collect_sources(root, &entry.path(), out)?;
        }
    } else {
        let rel = current
            .strip_prefix(root.parent().unwrap_or(root))
            .unwrap_or(current)
            .to_string_lossy()
            .replace('\\', "/");
        out.push(PayloadSource {
            source_path: current.clone(),
            dest_rel_path: rel,
        });
    }
    Ok(())
}

fn run_profile_import(cmd: &ProfileImportCmd) -> Result<bool, CliError> {
    let profile = load_profile(&cmd.input)?;
    println!("Imported profile '{}' ({})", profile.name, profile.id);
    Ok(true)
}

fn run_profile_export(cmd: &ProfileExportCmd) -> Result<bool, CliError> {
    let profile = load_profile(&cmd.input)?;
    let exported = export_profile(&profile).map_err(|e| CliError::Runtime(e.to_string()))?;
    println!("{exported}");
    Ok(true)
}
