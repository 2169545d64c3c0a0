//! Runtime telemetry.
//!
//! `runc events` writes an unframed sequence of JSON objects on stdout. The
//! stream reader decodes them one at a time and republishes them on a bounded
//! channel:
//!
//! - malformed records are logged and skipped, never sent;
//! - a full channel blocks the decoder instead of dropping records;
//! - the channel closes on end of stream, on a fatal read error, on
//!   cancellation, or when the receiver goes away.

mod decoder;
mod stream;
mod types;

pub use stream::EVENT_CHANNEL_CAPACITY;
pub use types::{
    Blkio, BlkioEntry, Cpu, CpuUsage, Event, EventKind, Hugetlb, Memory, MemoryEntry,
    NetworkInterface, Pids, Stats, Throttling,
};

pub(crate) use stream::{read_first_event, spawn_event_stream};
