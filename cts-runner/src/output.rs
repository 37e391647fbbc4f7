// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log output for the harness.
//!
//! Library code logs through [`tracing`]. Entry points call [`init_logging`] once to print those
//! events to stderr.

use std::fmt;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable read by [`init_logging`] to filter log output.
///
/// The value uses the `tracing_subscriber` targets syntax, e.g. `info,cts_runner::deqp=debug`.
pub static LOG_ENV: &str = "CTS_LOG";

/// Installs a global subscriber that writes log events to stderr.
///
/// Events are filtered by [`LOG_ENV`], defaulting to `info`. An unparseable filter falls back to
/// the default with a warning. Only the first call has any effect.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var(LOG_ENV).unwrap_or_default();

        // If the level string is empty, use the standard level filter instead.
        let (targets, parse_error) = if level_str.is_empty() {
            (default_targets(), None)
        } else {
            match level_str.parse::<Targets>() {
                Ok(targets) => (targets, None),
                Err(error) => (default_targets(), Some(error)),
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter)
            .with_writer(std::io::stderr)
            .with_filter(targets);

        // try_init so that a subscriber installed by an embedding application wins.
        if tracing_subscriber::registry().with(layer).try_init().is_ok() {
            if let Some(error) = parse_error {
                tracing::warn!("ignoring invalid {LOG_ENV} value `{level_str}`: {error}");
            }
        }
    });
}

fn default_targets() -> Targets {
    Targets::new().with_default(LevelFilter::INFO)
}

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let prefix = match *metadata.level() {
            Level::ERROR => "error",
            Level::WARN => "warning",
            Level::INFO => "info",
            Level::DEBUG => "debug",
            Level::TRACE => "trace",
        };
        write!(writer, "{prefix}: ")?;

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            // Show other fields for debug or trace output.
            show_other: *metadata.level() >= Level::DEBUG,
            error: None,
        };

        event.record(&mut visitor);

        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    show_other: bool,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            if let Err(error) = write!(self.writer, "{value:?}") {
                self.error = Some(error);
            }
        } else if self.show_other {
            if let Err(error) = write!(self.writer, "; {} = {:?}", field.name(), value) {
                self.error = Some(error);
            }
        }
    }
}
