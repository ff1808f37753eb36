//! Groups decoded events into one output packet per ETW buffer.

use crate::record::{BufferContext, EventHeader};
use crate::sequence::SequenceToken;
use crate::sink::{EventBuilder, TraceSink};
use crate::timestamp::TickConverter;
use crate::wire::{etw_events, new_etw_packet, EtwTraceEvent, TracePacket};

pub struct PacketBuilder {
    converter: TickConverter,
    // The open packet; its bundle's `event` list is the events container.
    packet: Option<TracePacket>,
}

impl PacketBuilder {
    pub fn new(converter: TickConverter) -> Self {
        Self {
            converter,
            packet: None,
        }
    }

    pub fn converter(&self) -> TickConverter {
        self.converter
    }

    pub fn has_open_packet(&self) -> bool {
        self.packet.is_some()
    }

    pub fn open_event_count(&self) -> usize {
        self.packet.as_ref().map_or(0, |p| etw_events(p).len())
    }

    /// Appends a new event stamped with the header's time and the buffer's
    /// CPU, opening a packet first if this is the buffer's first event.
    pub fn next_event(
        &mut self,
        _token: &SequenceToken<'_>,
        header: &EventHeader,
        buffer_context: &BufferContext,
    ) -> EventBuilder<'_> {
        let now = self.converter.to_nanoseconds(header.timestamp_ticks);
        let packet = self.packet.get_or_insert_with(|| new_etw_packet(now));

        let events = &mut packet.mut_etw_events().event;
        let index = events.len();
        events.push(EtwTraceEvent::default());
        let mut builder = EventBuilder::new(&mut events[index]);
        builder
            .set_timestamp(now)
            .set_cpu(u32::from(buffer_context.processor_index));
        builder
    }

    /// Closes the open packet, if any, by handing it to `sink`. Returns
    /// whether a packet was finalised.
    pub fn finish_buffer(&mut self, _token: &SequenceToken<'_>, sink: &mut dyn TraceSink) -> bool {
        match self.packet.take() {
            Some(packet) => {
                sink.finish_packet(packet);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::Guid;
    use crate::sequence::SequenceChecker;
    use crate::sink::VecSink;

    fn header(ticks: i64) -> EventHeader {
        EventHeader {
            provider_id: Guid::default(),
            descriptor: Default::default(),
            timestamp_ticks: ticks,
        }
    }

    fn cpu(index: u16) -> BufferContext {
        BufferContext {
            processor_index: index,
            logger_id: 0,
        }
    }

    #[test]
    fn test_first_event_opens_packet_with_its_timestamp() {
        let checker = SequenceChecker::detached();
        let token = checker.check();
        let mut builder = PacketBuilder::new(TickConverter::new(10_000_000));
        let mut sink = VecSink::default();

        assert!(!builder.has_open_packet());
        builder.next_event(&token, &header(10_000), &cpu(3));
        builder.next_event(&token, &header(20_000), &cpu(3));
        assert_eq!(builder.open_event_count(), 2);

        assert!(builder.finish_buffer(&token, &mut sink));
        assert!(!builder.has_open_packet());

        assert_eq!(sink.packets.len(), 1);
        let packet = &sink.packets[0];
        assert_eq!(packet.timestamp(), 1_000_000);
        let events = etw_events(packet);
        let stamps: Vec<_> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![Some(1_000_000), Some(2_000_000)]);
        assert!(events.iter().all(|e| e.cpu == Some(3)));
    }

    #[test]
    fn test_finish_without_events_emits_nothing() {
        let checker = SequenceChecker::detached();
        let token = checker.check();
        let mut builder = PacketBuilder::new(TickConverter::new(1_000));
        let mut sink = VecSink::default();

        assert!(!builder.finish_buffer(&token, &mut sink));
        assert!(!builder.finish_buffer(&token, &mut sink));
        assert!(sink.packets.is_empty());
    }

    #[test]
    fn test_each_buffer_gets_a_fresh_packet() {
        let checker = SequenceChecker::detached();
        let token = checker.check();
        let mut builder = PacketBuilder::new(TickConverter::new(1_000_000_000));
        let mut sink = VecSink::default();

        builder.next_event(&token, &header(5), &cpu(0));
        builder.finish_buffer(&token, &mut sink);
        builder.next_event(&token, &header(9), &cpu(1));
        builder.finish_buffer(&token, &mut sink);

        let stamps: Vec<_> = sink.packets.iter().map(|p| p.timestamp()).collect();
        assert_eq!(stamps, vec![5, 9]);
        assert_eq!(etw_events(&sink.packets[1])[0].cpu, Some(1));
    }
}
