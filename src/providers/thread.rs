//! Thread provider: context switches.

use crate::error::DecodeError;
use crate::payload::PayloadReader;
use crate::record::EventRecord;
use crate::wire::{thread_state_from_raw, wait_mode_from_raw, wait_reason_from_raw, CSwitchEtwEvent};

use super::DecodeContext;

pub const OPCODE_CSWITCH: u8 = 36;

/// CSwitch v2: four 32-bit fields and eight 8-bit fields.
pub const CSWITCH_MIN_LEN: usize = 4 * 4 + 8;

pub fn handle_thread(ctx: &mut DecodeContext<'_>, record: &EventRecord<'_>) {
    if record.header.opcode() != OPCODE_CSWITCH {
        return;
    }

    match decode_c_switch(record.payload) {
        Ok(c_switch) => {
            ctx.packets
                .next_event(&ctx.token, &record.header, &record.buffer_context)
                .set_c_switch(c_switch);
            ctx.stats.events_decoded += 1;
        }
        Err(e) => {
            log::warn!(
                "Error decoding CSwitch v{} event: {e}",
                record.header.descriptor.version
            );
            ctx.stats.events_rejected += 1;
        }
    }
}

/// Parses a CSwitch payload. Nothing past the span is read, and the three
/// enum-valued fields must fall inside their schema ranges.
pub fn decode_c_switch(payload: &[u8]) -> Result<CSwitchEtwEvent, DecodeError> {
    const NAME: &str = "CSwitch";

    if payload.len() < CSWITCH_MIN_LEN {
        return Err(DecodeError::TooShort {
            event_name: NAME,
            size: payload.len(),
            min: CSWITCH_MIN_LEN,
        });
    }

    let out_of_range = |field: &'static str, value: i8| DecodeError::OutOfRange {
        event_name: NAME,
        field,
        value: value.into(),
    };

    let mut r = PayloadReader::new(payload);
    let mut c_switch = CSwitchEtwEvent::default();
    c_switch.set_new_thread_id(r.read_u32()?);
    c_switch.set_old_thread_id(r.read_u32()?);
    c_switch.set_new_thread_priority(r.read_i8()?.into());
    c_switch.set_old_thread_priority(r.read_i8()?.into());
    c_switch.set_previous_c_state(r.read_u8()?.into());
    r.skip(1)?; // SpareByte

    let raw = r.read_i8()?;
    let reason = wait_reason_from_raw(raw.into())
        .ok_or_else(|| out_of_range("old_thread_wait_reason", raw))?;
    c_switch.set_old_thread_wait_reason(reason);
    let raw = r.read_i8()?;
    let mode =
        wait_mode_from_raw(raw.into()).ok_or_else(|| out_of_range("old_thread_wait_mode", raw))?;
    c_switch.set_old_thread_wait_mode(mode);
    let raw = r.read_i8()?;
    let state =
        thread_state_from_raw(raw.into()).ok_or_else(|| out_of_range("old_thread_state", raw))?;
    c_switch.set_old_thread_state(state);

    c_switch.set_old_thread_wait_ideal_processor(r.read_i8()?.into());
    c_switch.set_new_thread_wait_time(r.read_u32()?);
    r.skip(4)?; // Reserved

    Ok(c_switch)
}
