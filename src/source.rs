//! Event sources: whatever drives the consumer's two callbacks.

use anyhow::Result;

use crate::record::{BufferContext, EventHeader, EventRecord};

/// The two callbacks a source invokes while it runs.
pub trait EventCallbacks {
    fn on_event(&mut self, record: &EventRecord<'_>);

    /// Called at every buffer boundary. Returning false asks the source to
    /// stop.
    fn on_buffer(&mut self) -> bool;
}

pub trait EventSource {
    /// Blocks, delivering events and buffer boundaries in order, until the
    /// source is exhausted or its session is closed.
    fn pump(&mut self, callbacks: &mut dyn EventCallbacks) -> Result<()>;
}

/// An event with an owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedEventRecord {
    pub header: EventHeader,
    pub buffer_context: BufferContext,
    pub payload: Vec<u8>,
}

impl OwnedEventRecord {
    pub fn as_record(&self) -> EventRecord<'_> {
        EventRecord {
            header: self.header,
            buffer_context: self.buffer_context,
            payload: &self.payload,
        }
    }
}

impl From<&EventRecord<'_>> for OwnedEventRecord {
    fn from(record: &EventRecord<'_>) -> Self {
        Self {
            header: record.header,
            buffer_context: record.buffer_context,
            payload: record.payload.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceItem {
    Event(OwnedEventRecord),
    BufferEnd,
}

/// Replays a fixed sequence of events and buffer boundaries.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    items: Vec<SourceItem>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, record: EventRecord<'_>) -> Self {
        self.items.push(SourceItem::Event((&record).into()));
        self
    }

    pub fn buffer_end(mut self) -> Self {
        self.items.push(SourceItem::BufferEnd);
        self
    }
}

impl EventSource for ScriptedSource {
    fn pump(&mut self, callbacks: &mut dyn EventCallbacks) -> Result<()> {
        for item in &self.items {
            match item {
                SourceItem::Event(record) => callbacks.on_event(&record.as_record()),
                SourceItem::BufferEnd => {
                    if !callbacks.on_buffer() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::Guid;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        stop_after_buffers: Option<usize>,
    }

    impl EventCallbacks for Recorder {
        fn on_event(&mut self, record: &EventRecord<'_>) {
            self.seen
                .push(format!("event:{}:{}", record.header.opcode(), record.payload.len()));
        }

        fn on_buffer(&mut self) -> bool {
            self.seen.push("buffer".to_string());
            let buffers = self.seen.iter().filter(|s| *s == "buffer").count();
            self.stop_after_buffers.map_or(true, |n| buffers < n)
        }
    }

    #[test]
    fn test_scripted_source_preserves_order() {
        let payload = [1u8, 2, 3];
        let mut source = ScriptedSource::new()
            .event(EventRecord::new(Guid::default(), 1, 0, 0, &payload))
            .buffer_end()
            .event(EventRecord::new(Guid::default(), 2, 0, 0, &[]))
            .buffer_end();
        let mut recorder = Recorder::default();
        source.pump(&mut recorder).unwrap();
        assert_eq!(
            recorder.seen,
            vec!["event:1:3", "buffer", "event:2:0", "buffer"]
        );
    }

    #[test]
    fn test_scripted_source_stops_when_asked() {
        let mut source = ScriptedSource::new()
            .buffer_end()
            .event(EventRecord::new(Guid::default(), 1, 0, 0, &[]))
            .buffer_end();
        let mut recorder = Recorder {
            stop_after_buffers: Some(1),
            ..Default::default()
        };
        source.pump(&mut recorder).unwrap();
        assert_eq!(recorder.seen, vec!["buffer"]);
    }
}
