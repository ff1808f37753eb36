//! Real-time loss notifications.
//!
//! The payloads carry nothing useful, so only the opcode is inspected. Losses
//! are counted and logged; nothing is written to the output stream.

use crate::record::EventRecord;

use super::DecodeContext;

pub const OPCODE_RT_LOST_EVENT: u8 = 32;
pub const OPCODE_RT_LOST_BUFFER: u8 = 33;
pub const OPCODE_RT_LOST_FILE: u8 = 34;

pub fn handle_lost_event(ctx: &mut DecodeContext<'_>, record: &EventRecord<'_>) {
    match record.header.opcode() {
        OPCODE_RT_LOST_EVENT => {
            ctx.stats.events_lost += 1;
            log::error!("One or more events lost during trace capture");
        }
        OPCODE_RT_LOST_BUFFER => {
            ctx.stats.buffers_lost += 1;
            log::error!("One or more buffers lost during trace capture");
        }
        // OPCODE_RT_LOST_FILE and anything newer.
        _ => {}
    }
}
