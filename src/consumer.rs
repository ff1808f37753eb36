//! The ETW real-time consumer.
//!
//! The platform drives the consumer through two callbacks: one per event and
//! one per delivered buffer. [`EtwConsumer::process_event`] and
//! [`EtwConsumer::process_buffer`] are their bodies. [`EtwConsumer::run`]
//! hands the consumer to an [`EventSource`], which on Windows is the
//! real-time session adapter.
//!
//! Each buffer becomes one output packet. The first decoded event of a buffer
//! opens the packet and sets its timestamp, later events of the same buffer
//! append to it, and the buffer callback hands it to the sink. Events with
//! malformed payloads are logged and dropped. Events from unknown providers
//! or with unknown opcodes are dropped silently.

use anyhow::Result;

use crate::packet_builder::PacketBuilder;
use crate::providers::{self, DecodeContext};
use crate::record::EventRecord;
use crate::sequence::SequenceChecker;
use crate::sink::TraceSink;
use crate::source::{EventCallbacks, EventSource};
use crate::timestamp::TickConverter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Consuming,
}

/// Running totals kept by the consumer. None of these are written to the
/// output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub events_seen: u64,
    pub events_decoded: u64,
    pub events_rejected: u64,
    pub events_unknown_provider: u64,
    pub events_lost: u64,
    pub buffers_lost: u64,
    pub buffers_seen: u64,
    pub packets_finished: u64,
}

pub struct EtwConsumer<S: TraceSink> {
    sink: S,
    packets: PacketBuilder,
    stats: ConsumerStats,
    state: ConsumerState,
    sequence: SequenceChecker,
}

impl<S: TraceSink> EtwConsumer<S> {
    /// Creates a consumer writing to `sink`, with timestamps converted using
    /// the platform performance-counter frequency.
    pub fn new(sink: S) -> Self {
        Self::with_tick_converter(sink, TickConverter::platform())
    }

    pub fn with_tick_converter(sink: S, converter: TickConverter) -> Self {
        Self {
            sink,
            packets: PacketBuilder::new(converter),
            stats: ConsumerStats::default(),
            state: ConsumerState::Idle,
            sequence: SequenceChecker::detached(),
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn has_open_packet(&self) -> bool {
        self.packets.has_open_packet()
    }

    /// Blocks while `source` delivers events, moving `Idle -> Consuming`
    /// on entry and back to `Idle` once the source returns. There is no
    /// internal cancellation: closing the underlying session ends the run.
    pub fn run<E: EventSource + ?Sized>(&mut self, source: &mut E) -> Result<()> {
        debug_assert!(self.sequence.called_on_valid_sequence());
        self.state = ConsumerState::Consuming;
        log::debug!("ETW consumer entering run loop");
        let result = source.pump(self);
        self.state = ConsumerState::Idle;

        let stats = self.stats;
        if stats.events_lost > 0 || stats.buffers_lost > 0 {
            log::error!(
                "Trace capture lost {} event notifications and {} buffers",
                stats.events_lost,
                stats.buffers_lost
            );
        }
        log::debug!("ETW consumer left run loop: {stats:?}");
        result
    }

    /// Event callback body: look up the provider and let its handler decode
    /// the payload.
    pub fn process_event(&mut self, record: &EventRecord<'_>) {
        let token = self.sequence.check();
        self.stats.events_seen += 1;

        let mut ctx = DecodeContext {
            packets: &mut self.packets,
            stats: &mut self.stats,
            token,
        };
        if !providers::dispatch(&mut ctx, record) {
            self.stats.events_unknown_provider += 1;
        }
    }

    /// Buffer callback body: finalise the packet for the buffer that just
    /// ended. Always asks the platform to keep going; shutdown comes from
    /// the session owner closing the session.
    pub fn process_buffer(&mut self) -> bool {
        let token = self.sequence.check();
        self.stats.buffers_seen += 1;
        if self.packets.finish_buffer(&token, &mut self.sink) {
            self.stats.packets_finished += 1;
        }
        true
    }

    fn finish_pending(&mut self) {
        let token = self.sequence.check();
        if self.packets.finish_buffer(&token, &mut self.sink) {
            self.stats.packets_finished += 1;
        }
    }
}

impl<S: TraceSink> EventCallbacks for EtwConsumer<S> {
    fn on_event(&mut self, record: &EventRecord<'_>) {
        self.process_event(record);
    }

    fn on_buffer(&mut self) -> bool {
        self.process_buffer()
    }
}

impl<S: TraceSink> Drop for EtwConsumer<S> {
    fn drop(&mut self) {
        self.finish_pending();
        log::debug!("ETW consumer finished: {:?}", self.stats);
    }
}
