//! etwtrace - a real-time Event Tracing for Windows consumer that re-emits
//! kernel events as Perfetto trace packets.
//!
//! The consumer decodes a fixed set of kernel providers (thread context
//! switches, real-time loss notifications) and groups the decoded events
//! into one `TracePacket` per ETW buffer, each carrying an
//! `EtwTraceEventBundle`.
//!
//! # Modules
//!
//! - [`consumer`] - the event/buffer callback bodies and the run loop
//! - [`providers`] - provider dispatch and per-provider decoders
//! - [`wire`] - the Perfetto ETW wire schema
//! - [`writer`] - streaming trace file output
//!
//! # Example
//!
//! ```
//! use etwtrace::consumer::EtwConsumer;
//! use etwtrace::providers::THREAD_PROVIDER;
//! use etwtrace::record::EventRecord;
//! use etwtrace::sink::VecSink;
//! use etwtrace::timestamp::TickConverter;
//!
//! let mut sink = VecSink::default();
//! {
//!     let mut consumer =
//!         EtwConsumer::with_tick_converter(&mut sink, TickConverter::new(10_000_000));
//!     // Too short to be a context switch: dropped with a warning.
//!     consumer.process_event(&EventRecord::new(THREAD_PROVIDER, 36, 10_000, 0, &[0; 4]));
//!     consumer.process_buffer();
//! }
//! assert!(sink.packets.is_empty());
//! ```

pub mod config;
pub mod consume;
pub mod consumer;
pub mod error;
pub mod guid;
pub mod packet_builder;
pub mod payload;
pub mod providers;
pub mod record;
pub mod sequence;
#[cfg(windows)]
pub mod session;
pub mod sink;
pub mod source;
pub mod timestamp;
pub mod trace_reader;
pub mod wire;
pub mod writer;

pub use config::Config;
pub use consume::consume;
pub use consumer::{ConsumerState, ConsumerStats, EtwConsumer};
pub use guid::Guid;
pub use sink::{TraceSink, VecSink};
pub use timestamp::{to_nanoseconds, TickConverter};
