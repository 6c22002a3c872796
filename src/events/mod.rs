//! Event records
//!
//! Every state transition of the supervisor is emitted as an immutable,
//! append-only record on a dedicated channel, separate from `tracing` logs.

mod recorder;
mod sink;
mod types;

pub use recorder::{EventRecorder, RecorderStats};
pub use sink::{EventSink, MemorySink, SinkError};
pub use types::{EventRecord, TradeEvent};
