//! Platform-neutral view of an ETW event record.
//!
//! The Windows callback adapter copies the fields it needs out of the native
//! `EVENT_RECORD` into these types and wraps the user data pointer into a
//! slice exactly once, so nothing past the adapter touches raw pointers.

use crate::guid::Guid;

/// The subset of `EVENT_DESCRIPTOR` the decoders look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDescriptor {
    pub version: u8,
    pub opcode: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventHeader {
    pub provider_id: Guid,
    pub descriptor: EventDescriptor,
    /// Raw performance-counter reading.
    pub timestamp_ticks: i64,
}

impl EventHeader {
    pub fn opcode(&self) -> u8 {
        self.descriptor.opcode
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferContext {
    /// Index of the CPU the event was recorded on.
    pub processor_index: u16,
    pub logger_id: u16,
}

/// One event as delivered by the event callback.
#[derive(Debug, Clone, Copy)]
pub struct EventRecord<'a> {
    pub header: EventHeader,
    pub buffer_context: BufferContext,
    pub payload: &'a [u8],
}

impl<'a> EventRecord<'a> {
    pub fn new(
        provider_id: Guid,
        opcode: u8,
        timestamp_ticks: i64,
        processor_index: u16,
        payload: &'a [u8],
    ) -> Self {
        Self {
            header: EventHeader {
                provider_id,
                descriptor: EventDescriptor {
                    opcode,
                    ..Default::default()
                },
                timestamp_ticks,
            },
            buffer_context: BufferContext {
                processor_index,
                logger_id: 0,
            },
            payload,
        }
    }
}
