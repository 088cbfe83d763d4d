//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use xcapture::util::shell::ColorChoice;

/// Run xcodebuild with compiler invocations routed through capture wrappers
#[derive(Parser)]
#[command(name = "xcapture")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:\n  \
    xcapture -- xcodebuild -target HelloWorldApp -sdk iphonesimulator\n  \
    xcapture -- xcodebuild -workspace HelloWorld.xcworkspace -scheme HelloWorld")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, default_value = "auto", value_parser = parse_color)]
    pub color: ColorChoice,

    /// Dump full failure detail when the build fails
    #[arg(long)]
    pub debug: bool,

    /// Directory the wrappers write capture results into
    #[arg(long, env = "XCAPTURE_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Argument forwarded to the capture front end (repeatable)
    #[arg(long = "frontend-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub frontend_args: Vec<String>,

    /// Output format for the session result
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Build command to capture, e.g. `xcodebuild -target App`
    #[arg(last = true, required = true, value_name = "BUILD_COMMAND")]
    pub build_command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

fn parse_color(s: &str) -> Result<ColorChoice, String> {
    s.parse()
}
