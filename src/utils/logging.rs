// file: src/utils/logging.rs
// description: tracing subscriber initialization and colored cli status lines

use crate::pipeline::DocumentStatus;
use colored::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// HTTP internals stay quiet unless RUST_LOG asks for them.
const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn,rustls=warn,lopdf=warn";

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// verbosity flag. Logs go to stderr so stdout carries only results.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", level, QUIET_DEPENDENCIES)));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_ansi(colored_output)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

pub fn format_step(step: usize, total: usize, msg: &str) -> String {
    format!("{} {}", format!("[{}/{}]", step, total).cyan().bold(), msg)
}

/// One line per document for the review summary.
pub fn format_status(label: &str, status: &DocumentStatus) -> String {
    if status.is_ready() {
        format_success(&format!("{}: ready", label))
    } else if status.is_failed() {
        format_error(&format!("{}: {}", label, status))
    } else {
        format_info(&format!("{}: {}", label, status))
    }
}
