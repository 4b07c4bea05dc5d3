//! run with `$ cargo run --example trace-listener-stdout`

use opentelemetry::Context;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_trace_listener::{OpenTelemetryTraceListener, Severity};

fn main() {
    // Spans go to stdout so the recorded events are visible immediately.
    let exporter = opentelemetry_stdout::SpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter)
        .build();
    let listener = OpenTelemetryTraceListener::new(provider.clone());

    // A pre-formatted event.
    listener.trace_event("Billing", Severity::Information, 1001, "invoice 42 posted");

    // A templated event.
    listener
        .trace_event_format(
            "Auth",
            Severity::Warning,
            7,
            "user {0} failed to sign in",
            &["bob".into()],
        )
        .expect("template matches arguments");

    // A free-form write; with no active span this becomes a span of its own.
    let _cx = listener.write(&Context::current(), "free-form diagnostics line");

    // The log crate can be routed through the same listener.
    log::set_boxed_logger(Box::new(OpenTelemetryTraceListener::new(provider.clone())))
        .expect("no logger registered yet");
    log::set_max_level(log::LevelFilter::Info);
    log::error!(target: "Worker", "queue drain failed");

    provider.shutdown().expect("spans flushed on shutdown");
}
