//! render-snapshot library
//!
//! Serves (or probes) a page origin, loads the page in a WebDriver browser,
//! waits until the page's loading marker disappears, and hands the rendered
//! markup of the `<html>` element to an output sink.

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod extract;
pub mod gate;
pub mod output;
pub mod target;
pub mod wait;

pub use config::RenderConfig;
pub use coordinator::{Coordinator, RunSummary};
pub use errors::{RenderError, RenderResult};
pub use extract::RenderedDocument;
pub use gate::{OriginHandle, OriginMode};
pub use output::{sink_for, EmitReceipt, FileSink, OutputSink, StdoutSink, StreamSink};
pub use target::RenderTarget;
pub use wait::{PollClock, PollPolicy, PollReport, RenderState, RenderWait, TokioClock};
