//! Tracing subscriber setup for the terminal and optional log files.

use crate::conversation::truncate_chars;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::field::MakeExt as _;
use tracing_subscriber::fmt::format;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use std::path::Path;

/// Longest `message` or `content` field value written before it is cut.
const MAX_FIELD_CHARS: usize = 280;

const LOG_FILE_PREFIX: &str = "mimicbot.log";

/// Install the global subscriber.
///
/// Always logs to the terminal. With `log_dir`, also writes a daily rolling
/// file; the returned guard must be held until exit so buffered lines flush.
pub fn init_tracing(debug: bool, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let terminal_layer = tracing_subscriber::fmt::layer()
        .fmt_fields(field_formatter())
        .compact();

    let (file_layer, guard) = match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .fmt_fields(field_formatter())
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_env_filter(debug))
        .with(terminal_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn field_formatter() -> impl for<'writer> tracing_subscriber::fmt::FormatFields<'writer> + 'static {
    format::debug_fn(|writer, field, value| {
        let field_name = field.name();

        if field_name == "message" || field_name == "content" {
            let formatted = format!("{value:?}");
            let kept = truncate_chars(&formatted, MAX_FIELD_CHARS);
            if kept.len() < formatted.len() {
                write!(writer, "{field_name}={kept}...")
            } else {
                write!(writer, "{field_name}={formatted}")
            }
        } else {
            write!(writer, "{}={value:?}", field_name)
        }
    })
    .delimited(" ")
}

fn build_env_filter(debug: bool) -> tracing_subscriber::EnvFilter {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        return filter;
    }

    if debug {
        tracing_subscriber::EnvFilter::new("debug,serenity=info,h2=info,hyper=info")
    } else {
        tracing_subscriber::EnvFilter::new("info,serenity=warn")
    }
}
