//! # OpenTelemetry Trace Listener
//!
//! Bridges a line-oriented trace/logging API onto OpenTelemetry spans, so
//! existing call sites keep emitting events the way they always have while
//! each event lands in a distributed-tracing backend as a fully tagged,
//! immediately completed span.
//!
//! Each event produces exactly one span of kind [`SpanKind::Client`] named
//! `Log: <source>`, carrying the source, rendered message, severity name,
//! and event id as attributes, with its status derived from the severity.
//! Spans never outlive the call that created them.
//!
//! ## Recording events
//!
//! ```
//! use opentelemetry_sdk::trace::SdkTracerProvider;
//! use opentelemetry_trace_listener::{OpenTelemetryTraceListener, Severity};
//!
//! let provider = SdkTracerProvider::builder().build();
//! let listener = OpenTelemetryTraceListener::new(provider);
//!
//! // A pre-formatted event.
//! listener.trace_event("Auth", Severity::Information, 12, "session opened");
//!
//! // A templated event. A template that does not match its arguments is
//! // reported back to the caller as a `FormatError`.
//! listener
//!     .trace_event_format("Auth", Severity::Warning, 7, "user {0} failed", &["bob".into()])
//!     .unwrap();
//! ```
//!
//! ## Routing the `log` crate through the bridge
//!
//! The listener implements [`log::Log`], so it can be registered as the
//! process-wide logger and pick up classic `log::warn!`-style calls:
//!
//! ```no_run
//! use opentelemetry_sdk::trace::SdkTracerProvider;
//! use opentelemetry_trace_listener::OpenTelemetryTraceListener;
//!
//! let provider = SdkTracerProvider::builder().build();
//! log::set_boxed_logger(Box::new(OpenTelemetryTraceListener::new(provider))).unwrap();
//! log::set_max_level(log::LevelFilter::Info);
//!
//! log::warn!(target: "Auth", "user bob failed");
//! ```

use std::env;
use std::fmt;

use log::{Metadata, Record};
use opentelemetry::baggage::{Baggage, BaggageExt};
use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{global, otel_debug, Array, Context, KeyValue, StringValue, Value};

mod format;

pub use format::FormatError;

use format::format_positional;

/// Environment variable naming the tracer scope prefix; the resolved scope
/// is `<value>.Logs`.
pub const OTEL_TRACE_LISTENER_SOURCE_NAME: &str = "OTEL_TRACE_LISTENER_SOURCE_NAME";
/// Scope prefix used when [`OTEL_TRACE_LISTENER_SOURCE_NAME`] is unset.
pub const OTEL_TRACE_LISTENER_SOURCE_NAME_DEFAULT: &str = "Web";

const SCOPE_NAME_SUFFIX: &str = ".Logs";
const SPAN_NAME_PREFIX: &str = "Log: ";
const WRITE_SOURCE: &str = "log";
const BAGGAGE_MESSAGE_KEY: &str = "message";

/// Importance of a legacy trace event.
///
/// The first five values drive span status derivation. The remaining
/// activity-lifecycle values carried by the legacy enumeration are recorded
/// verbatim in the `eventType` attribute but leave the status untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
    Start,
    Stop,
    Suspend,
    Resume,
    Transfer,
}

impl Severity {
    /// Canonical name, as recorded in the `eventType` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Information => "Information",
            Severity::Verbose => "Verbose",
            Severity::Start => "Start",
            Severity::Stop => "Stop",
            Severity::Suspend => "Suspend",
            Severity::Resume => "Resume",
            Severity::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Information,
            log::Level::Debug | log::Level::Trace => Severity::Verbose,
        }
    }
}

/// A trace listener that records legacy trace events as OpenTelemetry spans.
///
/// The listener holds nothing but the provider handle; every other piece of
/// state is local to a call, so a single instance can be shared freely
/// across threads. Telemetry-side failures never reach the caller: a
/// disabled or non-sampling provider simply means nothing is recorded.
#[derive(Debug)]
pub struct OpenTelemetryTraceListener<P> {
    provider: P,
}

impl<P> OpenTelemetryTraceListener<P>
where
    P: TracerProvider,
{
    /// Creates a listener that records spans through `provider`.
    pub fn new(provider: P) -> Self {
        OpenTelemetryTraceListener { provider }
    }

    /// Records a pre-formatted trace event as one completed span.
    ///
    /// Unlike [`trace_event_format`](Self::trace_event_format), an empty
    /// message is still recorded: an intentionally empty log line carries
    /// information, an empty template does not.
    pub fn trace_event(
        &self,
        source: &str,
        severity: Severity,
        id: i64,
        message: impl Into<StringValue>,
    ) {
        self.emit_span(source, severity, id, message.into(), None, &[]);
    }

    /// Records a templated trace event as one completed span.
    ///
    /// `args` are substituted into `format` positionally (`{0}`, `{1}`, …;
    /// `{{` and `}}` escape literal braces). With empty `args` the template
    /// is recorded verbatim as the message. An empty `format` drops the
    /// event without creating a span.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when a placeholder is malformed or has no
    /// matching argument; no span is recorded in that case.
    pub fn trace_event_format(
        &self,
        source: &str,
        severity: Severity,
        id: i64,
        format: &str,
        args: &[StringValue],
    ) -> Result<(), FormatError> {
        if format.is_empty() {
            otel_debug!(name: "TraceListener.TraceEvent.EmptyFormat");
            return Ok(());
        }
        let message = if args.is_empty() {
            format.to_owned()
        } else {
            format_positional(format, args)?
        };
        self.emit_span(source, severity, id, message.into(), Some(format), args);
        Ok(())
    }

    /// Attaches free-form text to the current trace.
    ///
    /// With no span active on `cx`, the text is recorded as a regular event
    /// span with source `"log"`, severity [`Severity::Information`], and id
    /// 0. With an active span, no new span is created; the text travels as
    /// baggage under the `"message"` key on the returned context instead.
    /// Attach the returned context to propagate it; writing again under the
    /// same span overwrites the key.
    pub fn write(&self, cx: &Context, text: impl Into<StringValue>) -> Context {
        let text = text.into();
        if cx.has_active_span() {
            // Baggage on a context is replaced wholesale, so carry the
            // existing entries over before overwriting the message key.
            let mut baggage = Baggage::new();
            for (key, (value, metadata)) in cx.baggage().iter() {
                let _ = baggage.insert_with_metadata(key.clone(), value.clone(), metadata.clone());
            }
            let _ = baggage.insert(BAGGAGE_MESSAGE_KEY, text);
            cx.with_baggage(baggage)
        } else {
            self.trace_event(WRITE_SOURCE, Severity::Information, 0, text);
            cx.clone()
        }
    }

    /// Identical to [`write`](Self::write); a line terminator has no
    /// meaning at the span level.
    pub fn write_line(&self, cx: &Context, text: impl Into<StringValue>) -> Context {
        self.write(cx, text)
    }

    // One started span in, one ended span out, on every path. Nothing
    // fallible runs between start and end, and the SDK additionally ends
    // spans on drop.
    fn emit_span(
        &self,
        source: &str,
        severity: Severity,
        id: i64,
        message: StringValue,
        format: Option<&str>,
        args: &[StringValue],
    ) {
        let tracer = self.provider.tracer(scope_name());
        let mut span = tracer
            .span_builder(format!("{SPAN_NAME_PREFIX}{source}"))
            .with_kind(SpanKind::Client)
            .start(&tracer);

        if span.is_recording() {
            span.set_attribute(KeyValue::new("source", source.to_owned()));
            span.set_attribute(KeyValue::new("message", Value::String(message)));
            span.set_attribute(KeyValue::new("eventType", severity.as_str()));
            span.set_attribute(KeyValue::new("id", id));
            if let Some(template) = format {
                span.set_attribute(KeyValue::new("format", template.to_owned()));
            }
            if !args.is_empty() {
                span.set_attribute(KeyValue::new(
                    "args",
                    Value::Array(Array::String(args.to_vec())),
                ));
            }
            match severity {
                Severity::Critical | Severity::Error | Severity::Warning => {
                    span.set_status(Status::error(""));
                }
                Severity::Information => span.set_status(Status::Ok),
                Severity::Verbose => span.set_status(Status::Unset),
                _ => {}
            }
        }

        span.end();
    }
}

impl Default for OpenTelemetryTraceListener<global::GlobalTracerProvider> {
    /// A listener over the globally registered tracer provider.
    fn default() -> Self {
        OpenTelemetryTraceListener::new(global::tracer_provider())
    }
}

impl<P> log::Log for OpenTelemetryTraceListener<P>
where
    P: TracerProvider + Send + Sync,
{
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.trace_event(
            record.target(),
            Severity::from(record.level()),
            0,
            record.args().to_string(),
        );
    }

    fn flush(&self) {}
}

// Resolved on every event so a runtime change to the configured name is
// picked up by the next call.
fn scope_name() -> String {
    let configured = env::var(OTEL_TRACE_LISTENER_SOURCE_NAME)
        .unwrap_or_else(|_| OTEL_TRACE_LISTENER_SOURCE_NAME_DEFAULT.to_owned());
    format!("{configured}{SCOPE_NAME_SUFFIX}")
}
