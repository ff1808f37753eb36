//! The downstream side of the consumer.
//!
//! A packet handle is an owned [`TracePacket`]; the `event` list of its
//! `etw_events` bundle is the events container. Handing the packet to
//! [`TraceSink::finish_packet`] is what finalises it. Sinks own their
//! failures: nothing is reported back to the consumer.

use crate::wire::{CSwitchEtwEvent, EtwTraceEvent};

pub use crate::wire::TracePacket;

pub trait TraceSink {
    fn finish_packet(&mut self, packet: TracePacket);
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn finish_packet(&mut self, packet: TracePacket) {
        (**self).finish_packet(packet)
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Box<S> {
    fn finish_packet(&mut self, packet: TracePacket) {
        (**self).finish_packet(packet)
    }
}

/// Handed to decoders to attach their typed sub-record to the event the
/// packet builder just appended.
pub struct EventBuilder<'a> {
    event: &'a mut EtwTraceEvent,
}

impl<'a> EventBuilder<'a> {
    pub(crate) fn new(event: &'a mut EtwTraceEvent) -> Self {
        Self { event }
    }

    pub fn set_timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.event.set_timestamp(timestamp);
        self
    }

    pub fn set_cpu(&mut self, cpu: u32) -> &mut Self {
        self.event.set_cpu(cpu);
        self
    }

    pub fn set_c_switch(&mut self, c_switch: CSwitchEtwEvent) -> &mut Self {
        self.event.set_c_switch(c_switch);
        self
    }
}

/// Keeps every finished packet in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub packets: Vec<TracePacket>,
}

impl TraceSink for VecSink {
    fn finish_packet(&mut self, packet: TracePacket) {
        self.packets.push(packet);
    }
}

impl TraceSink for std::sync::mpsc::Sender<TracePacket> {
    fn finish_packet(&mut self, packet: TracePacket) {
        if self.send(packet).is_err() {
            log::debug!("packet receiver went away, dropping packet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{c_switch, new_etw_packet, OldThreadWaitReason};

    #[test]
    fn test_event_builder_sets_fields() {
        let mut event = EtwTraceEvent::default();
        let mut cs = CSwitchEtwEvent::default();
        cs.set_new_thread_id(1);
        cs.set_old_thread_priority(-4);
        cs.set_old_thread_wait_reason(OldThreadWaitReason::WR_QUEUE);
        EventBuilder::new(&mut event)
            .set_timestamp(100)
            .set_cpu(3)
            .set_c_switch(cs.clone());

        assert_eq!(event.timestamp(), 100);
        assert_eq!(event.cpu(), 3);
        assert_eq!(c_switch(&event), Some(&cs));
    }

    #[test]
    fn test_channel_sink_forwards_packets() {
        let (mut tx, rx) = std::sync::mpsc::channel();
        tx.finish_packet(new_etw_packet(5));
        assert_eq!(rx.recv().unwrap().timestamp(), 5);

        drop(rx);
        // A closed receiver is not an error for the producer.
        tx.finish_packet(new_etw_packet(6));
    }
}
