//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from configuration
//! - Render events as sink lines: `[HH:MM:SS] [STATUS] [Title          ]: message`
//!
//! # Design Decisions
//! - Events may carry `status` and `title` fields; without them the status is
//!   derived from the level and the title from the event target
//! - `RUST_LOG` overrides the configured level

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};

const TIME_LAYOUT: &str = "%H:%M:%S";

/// Status tag shown in the second column of a sink line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Info,
    Warn,
    Ok,
    Err,
    Build,
    Debug,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Info => "INFO",
            StatusTag::Warn => "WARN",
            StatusTag::Ok => "OK",
            StatusTag::Err => "ERR",
            StatusTag::Build => "BUILD",
            StatusTag::Debug => "DEBUG",
        }
    }

    pub fn from_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => StatusTag::Err,
            Level::WARN => StatusTag::Warn,
            Level::INFO => StatusTag::Info,
            Level::DEBUG | Level::TRACE => StatusTag::Debug,
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialize the global subscriber.
pub fn init(config: &ObservabilityConfig) {
    let level = config.log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sanitizing_proxy={level},tower_http={level}").into());

    let sink = (config.log_format == LogFormat::Sink)
        .then(|| tracing_subscriber::fmt::layer().event_format(SinkFormat));
    let full = (config.log_format == LogFormat::Full).then(tracing_subscriber::fmt::layer);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(sink)
        .with(full)
        .try_init();
}

/// Render one sink line, without the trailing newline.
pub fn render_line(time: &str, status: &str, title: &str, message: &str) -> String {
    format!("[{time}] [{status:<5}] [{title:<15}]: {message}")
}

/// Event formatter producing sink lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkFormat;

impl<S, N> FormatEvent<S, N> for SinkFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut fields = SinkFields::default();
        event.record(&mut fields);

        let status = fields
            .status
            .unwrap_or_else(|| StatusTag::from_level(metadata.level()).to_string());
        let title = fields.title.unwrap_or_else(|| {
            metadata
                .target()
                .rsplit("::")
                .next()
                .unwrap_or_default()
                .to_string()
        });
        let time = chrono::Local::now().format(TIME_LAYOUT).to_string();
        let message = fields.message + &fields.extra;

        writeln!(writer, "{}", render_line(&time, &status, &title, &message))
    }
}

/// Collects the fields a sink line is made of.
#[derive(Debug, Default)]
struct SinkFields {
    status: Option<String>,
    title: Option<String>,
    message: String,
    extra: String,
}

impl Visit for SinkFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "status" => self.status = Some(value.to_string()),
            "title" => self.title = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => {
                let _ = write!(self.extra, " {name}={value}");
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "status" => self.status = Some(format!("{value:?}")),
            "title" => self.title = Some(format!("{value:?}")),
            "message" => self.message = format!("{value:?}"),
            name => {
                let _ = write!(self.extra, " {name}={value:?}");
            }
        }
    }
}
