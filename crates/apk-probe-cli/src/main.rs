// crates/apk-probe-cli/src/main.rs
// ============================================================================
// Module: APK Probe CLI Entry Point
// Description: Command dispatcher for the conversion service probe suites.
// Purpose: Run contract, pipeline, and diagnostic probes from the shell.
// Dependencies: apk-probe-core, clap, thiserror, tracing-subscriber.
// ============================================================================

//! ## Overview
//! The `apk-probe` CLI loads a [`ProbeConfig`], builds a blocking
//! [`ServiceClient`], runs one suite, and maps the resulting ledger to an
//! exit code. Progress goes to stdout through the [`render`] module;
//! diagnostics go to stderr through `tracing`. All user-facing strings are
//! routed through the i18n catalog. Security posture: environment values are
//! secrets and are only ever shown as redacted previews.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod render;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use apk_probe_cli::i18n::Locale;
use apk_probe_cli::i18n::set_locale;
use apk_probe_cli::t;
use apk_probe_core::EnvAudit;
use apk_probe_core::PackageBuilder;
use apk_probe_core::ProbeConfig;
use apk_probe_core::ResultLedger;
use apk_probe_core::ServiceClient;
use apk_probe_core::SignatureExpectation;
use apk_probe_core::config::read_env_strict;
use apk_probe_core::suite;
use apk_probe_core::suite::BackendOptions;
use apk_probe_core::toolchain::DEFAULT_TOOL_TIMEOUT;
use apk_probe_core::toolchain::default_probes;
use apk_probe_core::validate::inspect_archive;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::render::OutputFormat;
use crate::render::Renderer;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a local archive passed to `inspect`.
const MAX_INSPECT_BYTES: usize = 256 * 1024 * 1024;
/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "APK_PROBE_LANG";
/// Environment variable holding the log filter.
const LOG_ENV: &str = "APK_PROBE_LOG";
/// Log filter used when [`LOG_ENV`] is unset.
const DEFAULT_LOG_FILTER: &str = "warn";
/// Threshold used by suites that must pass completely.
const FULL_PASS: u8 = 100;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "apk-probe", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `APK_PROBE_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Optional config file path (overrides `APK_PROBE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Service base URL (overrides config and environment).
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,
    /// Report format.
    #[arg(long, value_enum, value_name = "FORMAT", global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run toolchain, storage, stats, contract, and pipeline checks.
    Run(RunCommand),
    /// Run the negative-path contract checks.
    Contract,
    /// Run the end-to-end conversion pipeline.
    Pipeline(PipelineCommand),
    /// Poll an existing job until it finishes or the budget runs out.
    Poll(PollCommand),
    /// Run storage diagnostics against sentinel endpoints.
    Diagnose,
    /// Audit backend environment variables.
    Env,
    /// Probe the host signing and alignment toolchain.
    Toolchain,
    /// Shallow-validate a local package archive.
    Inspect(InspectCommand),
    /// Write the synthetic test package to disk.
    Synth(SynthCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
struct RunCommand {
    /// Skip the host toolchain probe.
    #[arg(long, action = ArgAction::SetTrue)]
    skip_toolchain: bool,
    /// Run the pipeline even when prerequisites failed.
    #[arg(long, action = ArgAction::SetTrue)]
    force_pipeline: bool,
    /// Expected signing directory state of the converted artifact.
    #[arg(long, value_enum, default_value_t = SignatureArg::Either)]
    expect_signature: SignatureArg,
    /// Directory receiving `summary.json` and `summary.md`.
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,
}

/// Arguments for the `pipeline` command.
#[derive(Args, Debug)]
struct PipelineCommand {
    /// Expected signing directory state of the converted artifact.
    #[arg(long, value_enum, default_value_t = SignatureArg::Either)]
    expect_signature: SignatureArg,
}

/// Arguments for the `poll` command.
#[derive(Args, Debug)]
struct PollCommand {
    /// Job identifier to poll.
    #[arg(long, value_name = "ID")]
    job_id: String,
}

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Archive to inspect.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
    /// Expected signing directory state.
    #[arg(long, value_enum, default_value_t = SignatureArg::Either)]
    expect_signature: SignatureArg,
}

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
struct SynthCommand {
    /// Output path for the package.
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
    /// Omit the signing directory.
    #[arg(long, action = ArgAction::SetTrue)]
    unsigned: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, printing it as canonical JSON.
    Validate,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Signing directory expectations accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SignatureArg {
    /// `META-INF/` must be present.
    Present,
    /// `META-INF/` must be absent.
    Absent,
    /// Either state is accepted.
    Either,
}

impl From<SignatureArg> for SignatureExpectation {
    fn from(value: SignatureArg) -> Self {
        match value {
            SignatureArg::Present => Self::Present,
            SignatureArg::Absent => Self::Absent,
            SignatureArg::Either => Self::Either,
        }
    }
}

/// Global options shared by every command.
struct Globals {
    /// Config file override.
    config: Option<PathBuf>,
    /// Base URL override.
    base_url: Option<String>,
    /// Report format.
    format: OutputFormat,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = read_env_strict(LANG_ENV).map_err(|err| CliError::new(err.to_string()))?;
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    init_logging()?;
    let globals = Globals {
        config: cli.config,
        base_url: cli.base_url,
        format: cli.format,
    };

    match command {
        Commands::Run(command) => command_run(&globals, &command),
        Commands::Contract => command_contract(&globals),
        Commands::Pipeline(command) => command_pipeline(&globals, &command),
        Commands::Poll(command) => command_poll(&globals, &command),
        Commands::Diagnose => command_diagnose(&globals),
        Commands::Env => command_env(&globals),
        Commands::Toolchain => command_toolchain(&globals),
        Commands::Inspect(command) => command_inspect(&globals, &command),
        Commands::Synth(command) => command_synth(&globals, &command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate => command_config_validate(&globals),
        },
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Installs the stderr `tracing` subscriber.
fn init_logging() -> CliResult<()> {
    let raw = read_env_strict(LOG_ENV).map_err(|err| CliError::new(err.to_string()))?;
    let directives = raw.filter(|value| !value.trim().is_empty());
    let filter = EnvFilter::try_new(directives.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
        .map_err(|err| CliError::new(t!("logging.init_failed", env = LOG_ENV, error = err)))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|err| CliError::new(t!("logging.init_failed", env = LOG_ENV, error = err)))
}

// ============================================================================
// SECTION: Suite Commands
// ============================================================================

/// Executes the `run` command.
fn command_run(globals: &Globals, command: &RunCommand) -> CliResult<ExitCode> {
    let config = load_config(globals)?;
    let client = build_client(&config)?;
    let options = BackendOptions {
        include_toolchain: !command.skip_toolchain,
        force_pipeline: command.force_pipeline,
        signature: command.expect_signature.into(),
        ..BackendOptions::default()
    };
    let mut renderer = stdout_renderer(globals.format);
    let ledger = suite::backend_run(&client, &config, &options, &mut renderer);
    let met = finish_ledger(
        renderer,
        &ledger,
        "backend",
        config.thresholds.overall,
        command.report_dir.as_deref(),
    )?;
    Ok(exit_for(met))
}

/// Executes the `contract` command.
fn command_contract(globals: &Globals) -> CliResult<ExitCode> {
    let config = load_config(globals)?;
    let client = build_client(&config)?;
    let mut renderer = stdout_renderer(globals.format);
    let ledger = suite::contract_checks(&client, &config, &mut renderer);
    let met =
        finish_ledger(renderer, &ledger, "contract", config.thresholds.error_handling, None)?;
    Ok(exit_for(met))
}

/// Executes the `pipeline` command.
fn command_pipeline(globals: &Globals, command: &PipelineCommand) -> CliResult<ExitCode> {
    let config = load_config(globals)?;
    let client = build_client(&config)?;
    let mut renderer = stdout_renderer(globals.format);
    let ledger =
        suite::pipeline(&client, &config, command.expect_signature.into(), &mut renderer);
    let met = finish_ledger(renderer, &ledger, "pipeline", FULL_PASS, None)?;
    Ok(exit_for(met))
}

/// Executes the `poll` command.
fn command_poll(globals: &Globals, command: &PollCommand) -> CliResult<ExitCode> {
    let job_id = command.job_id.trim();
    if job_id.is_empty() {
        return Err(CliError::new(t!("poll.invalid_job_id")));
    }
    let config = load_config(globals)?;
    let client = build_client(&config)?;
    let mut renderer = stdout_renderer(globals.format);
    let (ledger, outcome) = suite::poll_existing(&client, &config, job_id, &mut renderer);
    finish_ledger(renderer, &ledger, "poll", FULL_PASS, None)?;
    Ok(exit_for(outcome.is_completed()))
}

/// Executes the `diagnose` command.
fn command_diagnose(globals: &Globals) -> CliResult<ExitCode> {
    let config = load_config(globals)?;
    let client = build_client(&config)?;
    let mut renderer = stdout_renderer(globals.format);
    let ledger = suite::diagnostics(&client, &mut renderer);
    let met = finish_ledger(renderer, &ledger, "diagnostics", FULL_PASS, None)?;
    Ok(exit_for(met))
}

/// Executes the `env` command.
fn command_env(globals: &Globals) -> CliResult<ExitCode> {
    let config = load_config(globals)?;
    let report = EnvAudit::from_config(&config.env_audit).run();
    let mut renderer = stdout_renderer(globals.format);
    let ledger = suite::env_audit_check(&report, &mut renderer);
    finish_ledger(renderer, &ledger, "environment", FULL_PASS, None)?;
    Ok(exit_for(report.passed()))
}

/// Executes the `toolchain` command.
fn command_toolchain(globals: &Globals) -> CliResult<ExitCode> {
    let mut renderer = stdout_renderer(globals.format);
    let ledger = suite::toolchain_check(&default_probes(), DEFAULT_TOOL_TIMEOUT, &mut renderer);
    let met = finish_ledger(renderer, &ledger, "toolchain", FULL_PASS, None)?;
    Ok(exit_for(met))
}

// ============================================================================
// SECTION: Local Commands
// ============================================================================

/// JSON document emitted by `inspect --format json`.
#[derive(Serialize)]
struct InspectOutput<'a> {
    /// Inspected path.
    path: String,
    /// Signing directory expectation applied.
    expectation: &'static str,
    /// Structural findings.
    report: &'a apk_probe_core::ArchiveReport,
    /// Violations under the expectation.
    violations: Vec<String>,
}

/// Executes the `inspect` command.
fn command_inspect(globals: &Globals, command: &InspectCommand) -> CliResult<ExitCode> {
    let kind = t!("input.kind.archive");
    let bytes = read_bytes_with_limit(&command.file, MAX_INSPECT_BYTES)
        .map_err(|err| read_limit_error(&kind, &command.file, err))?;
    let expectation = SignatureExpectation::from(command.expect_signature);
    let report = inspect_archive(&bytes)
        .map_err(|err| CliError::new(t!("inspect.invalid", error = err)))?;
    let violations: Vec<String> =
        report.violations(expectation).iter().map(ToString::to_string).collect();

    let mut renderer = stdout_renderer(globals.format);
    if renderer.is_text() {
        renderer.line(&t!(
            "inspect.summary",
            path = command.file.display(),
            entries = report.entry_count
        ));
        for violation in &violations {
            renderer.line(&t!("inspect.violation", violation = violation));
        }
        if violations.is_empty() {
            renderer.line(&t!("inspect.ok", expectation = expectation.as_str()));
        }
    } else {
        renderer
            .json(&InspectOutput {
                path: command.file.display().to_string(),
                expectation: expectation.as_str(),
                report: &report,
                violations: violations.clone(),
            })
            .map_err(CliError::new)?;
    }
    renderer.finish().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(exit_for(violations.is_empty()))
}

/// Executes the `synth` command.
fn command_synth(globals: &Globals, command: &SynthCommand) -> CliResult<ExitCode> {
    let mut builder = PackageBuilder::new();
    if command.unsigned {
        builder = builder.without_signature();
    }
    let bytes =
        builder.build().map_err(|err| CliError::new(t!("synth.build_failed", error = err)))?;
    fs::write(&command.output, &bytes).map_err(|err| {
        CliError::new(t!("synth.write_failed", path = command.output.display(), error = err))
    })?;
    let mut renderer = stdout_renderer(globals.format);
    renderer.line(&t!("synth.ok", bytes = bytes.len(), path = command.output.display()));
    renderer.finish().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(globals: &Globals) -> CliResult<ExitCode> {
    let config = load_config(globals)?;
    let mut renderer = stdout_renderer(OutputFormat::Json);
    renderer.json(&config).map_err(CliError::new)?;
    renderer.finish().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    if globals.format == OutputFormat::Text {
        write_stderr_line(&t!("config.validate.ok"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration and applies the `--base-url` override.
fn load_config(globals: &Globals) -> CliResult<ProbeConfig> {
    let mut config = ProbeConfig::load(globals.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    if let Some(base_url) = &globals.base_url {
        config.set_base_url(base_url.trim());
        config.validate().map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    }
    Ok(config)
}

/// Builds the service client.
fn build_client(config: &ProbeConfig) -> CliResult<ServiceClient> {
    ServiceClient::new(config).map_err(|err| CliError::new(t!("client.init_failed", error = err)))
}

/// Returns a renderer over stdout.
fn stdout_renderer(format: OutputFormat) -> Renderer<std::io::Stdout> {
    Renderer::new(std::io::stdout(), format)
}

/// Writes the summary and optional report files; returns whether the threshold was met.
fn finish_ledger<W: Write>(
    mut renderer: Renderer<W>,
    ledger: &ResultLedger,
    suite: &str,
    threshold: u8,
    report_dir: Option<&Path>,
) -> CliResult<bool> {
    let summary = ledger.summary(suite, threshold);
    renderer.summary(&summary).map_err(CliError::new)?;
    if let Some(dir) = report_dir {
        let paths = summary
            .write_to(dir)
            .map_err(|err| CliError::new(t!("report.write_failed", error = err)))?;
        for path in paths {
            renderer.line(&t!("report.written", path = path.display()));
        }
    }
    renderer.finish().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(summary.met_threshold)
}

/// Maps a pass flag to an exit code.
fn exit_for(passed: bool) -> ExitCode {
    if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Resolves the locale from the flag, then the environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    match env_lang.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        }),
        None => Ok(Locale::En),
    }
}

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Converts a bounded-read failure into a localized error.
fn read_limit_error(kind: &str, path: &Path, err: ReadLimitError) -> CliError {
    match err {
        ReadLimitError::Io(err) => {
            CliError::new(t!("input.read_failed", kind = kind, path = path.display(), error = err))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!(
            "input.read_too_large",
            kind = kind,
            path = path.display(),
            size = size,
            limit = limit
        )),
    }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
