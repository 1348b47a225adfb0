//! Adapter implementations of the workflow ports.

pub mod memory;
mod notification;

pub use notification::{NoopNotificationSink, RecordingNotificationSink, TracingNotificationSink};
