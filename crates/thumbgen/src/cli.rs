use std::ffi::OsString;

use clap::{CommandFactory, Parser};

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "generate-thumbnails",
    about = "Capture a PNG thumbnail for every registered shader",
    override_usage = "generate-thumbnails [--force] [--delay=ms] [--timeout=ms] [--size=px] [--only=id1,id2]",
    args_override_self = true
)]
pub struct Cli {
    /// Overwrite existing PNG files instead of skipping them.
    #[arg(long)]
    pub force: bool,

    /// Extra delay after the frame is ready before capturing (default 250).
    #[arg(long, value_name = "MS")]
    pub delay: Option<String>,

    /// Time to wait for the shader frame ready flag (default 10000).
    #[arg(long, value_name = "MS")]
    pub timeout: Option<String>,

    /// Viewport and output size in pixels (default 512).
    #[arg(long, value_name = "PX")]
    pub size: Option<String>,

    /// Comma-separated shader IDs to process (default all).
    #[arg(long, value_name = "IDS")]
    pub only: Option<String>,
}

pub fn parse() -> Cli {
    parse_from(std::env::args_os())
}

/// Parse after dropping unrecognised arguments with a warning.
///
/// `--help`/`-h` still print usage and exit with status 0.
pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    Cli::parse_from(retain_known_args(args))
}

/// Keep the program name plus every argument the CLI understands.
///
/// Value flags must use the `--flag=value` form and switches must not carry
/// a value; anything else is reported and discarded.
pub fn retain_known_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut kept: Vec<OsString> = args.next().into_iter().collect();
    for arg in args {
        let text = arg.to_string_lossy().into_owned();
        if is_known(&text) {
            kept.push(arg);
        } else {
            tracing::warn!("Unrecognised option \"{text}\" ignored.");
        }
    }
    kept
}

fn is_known(arg: &str) -> bool {
    if arg == "-h" {
        return true;
    }
    let Some(body) = arg.strip_prefix("--") else {
        return false;
    };
    let (name, has_value) = match body.split_once('=') {
        Some((name, _)) => (name, true),
        None => (body, false),
    };
    if name == "help" {
        return !has_value;
    }
    Cli::command()
        .get_arguments()
        .find(|candidate| candidate.get_long() == Some(name))
        .map(|candidate| candidate.get_action().takes_values() == has_value)
        .unwrap_or(false)
}
