//! The Perfetto ETW trace schema.
//!
//! Output packets are the generated `perfetto_protos` messages: a
//! [`TracePacket`] whose `etw_events` bundle holds one [`EtwTraceEvent`] per
//! decoded event. This module re-exports those types and adds the range
//! checks the raw kernel values need before they become schema enums.

use protobuf::Enum;

pub use perfetto_protos::etw::cswitch_etw_event::{
    OldThreadState, OldThreadWaitMode, OldThreadWaitReason,
};
pub use perfetto_protos::etw::CSwitchEtwEvent;
pub use perfetto_protos::etw_event::EtwTraceEvent;
pub use perfetto_protos::etw_event_bundle::EtwTraceEventBundle;
pub use perfetto_protos::trace_packet::TracePacket;

/// Exclusive upper bound of valid wait reasons. The schema lists it as an
/// enum value, but it is never a wait reason itself.
pub const MAXIMUM_WAIT_REASON: i32 = OldThreadWaitReason::MAXIMUM_WAIT_REASON as i32;

pub fn wait_reason_from_raw(value: i32) -> Option<OldThreadWaitReason> {
    if value >= MAXIMUM_WAIT_REASON {
        return None;
    }
    OldThreadWaitReason::from_i32(value)
}

pub fn wait_mode_from_raw(value: i32) -> Option<OldThreadWaitMode> {
    OldThreadWaitMode::from_i32(value)
}

pub fn thread_state_from_raw(value: i32) -> Option<OldThreadState> {
    OldThreadState::from_i32(value)
}

/// A packet stamped at `timestamp` carrying an empty ETW bundle.
pub fn new_etw_packet(timestamp: u64) -> TracePacket {
    let mut packet = TracePacket::default();
    packet.set_timestamp(timestamp);
    packet.set_etw_events(EtwTraceEventBundle::default());
    packet
}

/// The ETW events carried by `packet`; empty when it has no bundle.
pub fn etw_events(packet: &TracePacket) -> &[EtwTraceEvent] {
    &packet.etw_events().event
}

pub fn c_switch(event: &EtwTraceEvent) -> Option<&CSwitchEtwEvent> {
    event.has_c_switch().then(|| event.c_switch())
}
