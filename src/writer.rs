//! Streams finished packets into a Perfetto trace file.
//!
//! A trace file is a `Trace` message: a sequence of `packet` (field 1)
//! length-delimited `TracePacket`s, so packets can be appended one at a time
//! without holding the whole trace in memory.

use std::io::Write;

use anyhow::{Context, Result};
use protobuf::{CodedOutputStream, Message};

use crate::sink::{TracePacket, TraceSink};
use crate::wire::etw_events;

/// `Trace.packet`
pub(crate) const TRACE_PACKET_FIELD: u32 = 1;

pub struct StreamingTraceWriter<W: Write> {
    writer: W,
    sequence_id: u32,
    packet_count: u64,
    event_count: u64,
    bytes_written: u64,
    error: Option<anyhow::Error>,
}

impl<W: Write> StreamingTraceWriter<W> {
    pub fn new(writer: W, sequence_id: u32) -> Self {
        Self {
            writer,
            sequence_id,
            packet_count: 0,
            event_count: 0,
            bytes_written: 0,
            error: None,
        }
    }

    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Stamps the writer's sequence id on `packet` and appends it.
    pub fn write_packet(&mut self, mut packet: TracePacket) -> Result<()> {
        packet.set_trusted_packet_sequence_id(self.sequence_id);
        let body = packet
            .write_to_bytes()
            .context("Failed to encode trace packet")?;

        let mut framed = Vec::with_capacity(body.len() + 8);
        let mut os = CodedOutputStream::vec(&mut framed);
        os.write_bytes(TRACE_PACKET_FIELD, &body)?;
        os.flush()?;
        drop(os);

        self.writer
            .write_all(&framed)
            .context("Failed to write trace packet")?;
        self.packet_count += 1;
        self.event_count += etw_events(&packet).len() as u64;
        self.bytes_written += framed.len() as u64;
        Ok(())
    }

    /// Flushes the underlying writer, reporting the first error any earlier
    /// `finish_packet` ran into.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush().context("Failed to flush trace output")
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for StreamingTraceWriter<W> {
    fn finish_packet(&mut self, packet: TracePacket) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_packet(packet) {
            log::error!("{e:#}; dropping further packets");
            self.error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{c_switch, new_etw_packet, CSwitchEtwEvent, EtwTraceEvent};
    use perfetto_protos::trace::Trace;

    #[test]
    fn test_packets_are_framed_as_trace_field_one() {
        let mut writer = StreamingTraceWriter::new(Vec::new(), 7);
        writer.finish_packet(new_etw_packet(1_000));
        writer.finish_packet(new_etw_packet(2_000));
        writer.flush().unwrap();
        assert_eq!(writer.packet_count(), 2);

        let bytes = writer.into_inner();
        assert_eq!(bytes[0], 0x0a);

        let trace = Trace::parse_from_bytes(&bytes).unwrap();
        assert_eq!(trace.packet.len(), 2);
        assert_eq!(trace.packet[0].timestamp(), 1_000);
        assert_eq!(trace.packet[0].trusted_packet_sequence_id(), 7);
        assert!(trace.packet[0].has_etw_events());
        assert_eq!(trace.packet[1].timestamp(), 2_000);
    }

    #[test]
    fn test_events_parse_back_through_the_schema() {
        let mut writer = StreamingTraceWriter::new(Vec::new(), 3);
        let mut packet = new_etw_packet(42);
        let mut cs = CSwitchEtwEvent::default();
        cs.set_new_thread_priority(-7);
        cs.set_old_thread_wait_ideal_processor(-1);
        let mut event = EtwTraceEvent::default();
        event.set_timestamp(42);
        event.set_cpu(1);
        event.set_c_switch(cs.clone());
        packet.mut_etw_events().event.push(event);

        writer.write_packet(packet).unwrap();
        assert_eq!(writer.event_count(), 1);

        let trace = Trace::parse_from_bytes(&writer.into_inner()).unwrap();
        let parsed = &trace.packet[0];
        assert_eq!(parsed.timestamp(), 42);
        assert_eq!(parsed.trusted_packet_sequence_id(), 3);
        let events = etw_events(parsed);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cpu(), 1);
        assert_eq!(c_switch(&events[0]), Some(&cs));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_errors_surface_on_flush() {
        let mut writer = StreamingTraceWriter::new(FailingWriter, 1);
        writer.finish_packet(new_etw_packet(1));
        writer.finish_packet(new_etw_packet(2));
        assert_eq!(writer.packet_count(), 0);
        let err = writer.flush().unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        assert!(writer.flush().is_ok());
    }
}
