//! xcapture CLI - capture an xcodebuild build for static analysis

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, MessageFormat};
use xcapture::capture::{ambient_environment, BuildOutcome, CaptureSession, WrapperPaths};
use xcapture::util::config::{global_config_path, load_config, project_config_path, CaptureConfig};
use xcapture::util::process::SystemExecutor;
use xcapture::util::shell::{Shell, Status};

fn main() {
    let cli = Cli::parse();

    let shell = Shell::from_flags(
        cli.quiet,
        cli.color,
        cli.message_format == MessageFormat::Json,
    );

    init_logging(&cli, shell.use_color());

    let code = match run(cli, &shell) {
        Ok(code) => code,
        Err(e) => {
            shell.error(format!("{:#}", e));
            1
        }
    };

    std::process::exit(code);
}

fn init_logging(cli: &Cli, ansi: bool) {
    let default = if cli.verbose {
        "xcapture=debug"
    } else if cli.quiet {
        "xcapture=error"
    } else {
        "xcapture=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .without_time()
        .init();
}

/// Build the session config: global file, project file, then flags.
fn resolve_config(cli: &Cli) -> Result<CaptureConfig> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let global = global_config_path();

    let mut config = load_config(global.as_deref(), &project_config_path(&cwd))?;

    if cli.debug {
        config.debug = true;
    }
    if let Some(ref dir) = cli.results_dir {
        config.results_dir = Some(dir.clone());
    }
    if !cli.frontend_args.is_empty() {
        config.frontend_args = cli.frontend_args.clone();
    }

    Ok(config)
}

/// Run one capture session and return the exit code to relay.
fn run(cli: Cli, shell: &Shell) -> Result<i32> {
    let config = resolve_config(&cli)?;
    let wrappers = WrapperPaths::resolve()?;
    tracing::debug!(
        "Wrappers: cc={}, c++={}",
        wrappers.c.display(),
        wrappers.cxx.display()
    );

    let executor = SystemExecutor;
    let session = CaptureSession::new(&config, cli.build_command, wrappers, &executor)?;

    let compiler = session.compiler().display().to_string();
    let command = session.command().to_vec();

    shell.status(Status::Capturing, command.join(" "));

    let ambient = ambient_environment();
    let outcome = session.capture(&ambient)?;

    match outcome {
        BuildOutcome::Succeeded => {
            shell.status(Status::Finished, format!("capture of `{}`", command.join(" ")))
        }
        BuildOutcome::Failed { code, .. } => shell.status(
            Status::Error,
            format!("build command exited with code {}", code),
        ),
    }

    shell.json_event(&serde_json::json!({
        "reason": "capture-finished",
        "success": outcome.success(),
        "exit_code": outcome.exit_code(),
        "compiler": compiler,
        "command": command,
    }));

    Ok(outcome.exit_code())
}
