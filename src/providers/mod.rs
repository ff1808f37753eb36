//! Provider dispatch.
//!
//! A fixed table maps provider GUIDs to handlers. It is kept sorted by
//! [`Guid`]'s ordering so lookup is a binary search with no allocation.
//! Events from providers missing from the table are dropped without a
//! diagnostic. Among those are providers every kernel session carries
//! but which nothing here needs yet:
//!
//! - EventTrace `68fdd900-4a3e-11d1-84f4-0000f80464e3` (header extensions,
//!   rundown complete)
//! - EventTraceConfig `01853a65-418f-4f36-aefc-dc0f1d2fd235` (hardware
//!   configuration)

pub mod lost_event;
pub mod thread;

use crate::consumer::ConsumerStats;
use crate::guid::Guid;
use crate::packet_builder::PacketBuilder;
use crate::record::EventRecord;
use crate::sequence::SequenceToken;

/// `ThreadGuid`, kernel thread events.
pub const THREAD_PROVIDER: Guid = Guid::from_fields(
    0x3d6fa8d1,
    0xfe05,
    0x11d0,
    [0x9d, 0xda, 0x00, 0xc0, 0x4f, 0xd7, 0xba, 0x7c],
);

/// `LostEventGuid`, real-time loss notifications.
pub const LOST_EVENT_PROVIDER: Guid = Guid::from_fields(
    0x6a399ae0,
    0x4bc6,
    0x4de9,
    [0x87, 0x0b, 0x36, 0x57, 0xf8, 0x94, 0x7e, 0x7e],
);

/// Everything a handler may touch while decoding one event.
pub struct DecodeContext<'a> {
    pub packets: &'a mut PacketBuilder,
    pub stats: &'a mut ConsumerStats,
    pub token: SequenceToken<'a>,
}

pub type EventHandler = fn(&mut DecodeContext<'_>, &EventRecord<'_>);

pub struct Provider {
    pub guid: Guid,
    pub name: &'static str,
    pub handler: EventHandler,
}

static PROVIDERS: [Provider; 2] = [
    Provider {
        guid: THREAD_PROVIDER,
        name: "Thread",
        handler: thread::handle_thread,
    },
    Provider {
        guid: LOST_EVENT_PROVIDER,
        name: "LostEvent",
        handler: lost_event::handle_lost_event,
    },
];

pub fn find_provider(guid: &Guid) -> Option<&'static Provider> {
    PROVIDERS
        .binary_search_by(|p| p.guid.cmp(guid))
        .ok()
        .map(|index| &PROVIDERS[index])
}

/// Routes `record` to its provider's handler. Returns false when the
/// provider is unknown.
pub fn dispatch(ctx: &mut DecodeContext<'_>, record: &EventRecord<'_>) -> bool {
    match find_provider(&record.header.provider_id) {
        Some(provider) => {
            (provider.handler)(ctx, record);
            true
        }
        None => false,
    }
}
