use thiserror::Error;

/// Structural problems found while decoding an event payload.
///
/// These never escape the event callback; the handler logs them and drops
/// the event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{event_name}: payload is {size} bytes, need at least {min}")]
    TooShort {
        event_name: &'static str,
        size: usize,
        min: usize,
    },

    #[error("unexpected end of payload at offset {offset} reading {want} bytes")]
    Truncated { offset: usize, want: usize },

    #[error("{event_name}: {field} value {value} out of range")]
    OutOfRange {
        event_name: &'static str,
        field: &'static str,
        value: i64,
    },
}
