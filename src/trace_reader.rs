//! Reads back traces produced by [`crate::writer::StreamingTraceWriter`].

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use protobuf::Message;

use crate::wire::TracePacket;
use crate::writer::TRACE_PACKET_FIELD;

/// Streams packets out of a `Trace`-framed file without loading it whole.
pub struct TracePacketIterator<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> TracePacketIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }
}

impl<R: BufRead> Iterator for TracePacketIterator<R> {
    type Item = Result<TracePacket>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tag = match read_varint(&mut self.reader) {
                Ok(Some(tag)) => tag,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            let wire_type = (tag & 0x07) as u8;
            let field_number = (tag >> 3) as u32;

            if field_number == TRACE_PACKET_FIELD && wire_type == 2 {
                let length = match read_varint(&mut self.reader) {
                    Ok(Some(len)) => len as usize,
                    Ok(None) => return Some(Err(anyhow::anyhow!("Truncated packet length"))),
                    Err(e) => return Some(Err(e)),
                };
                self.buffer.clear();
                self.buffer.resize(length, 0);
                if let Err(e) = self.reader.read_exact(&mut self.buffer) {
                    return Some(Err(e.into()));
                }
                return match TracePacket::parse_from_bytes(&self.buffer) {
                    Ok(packet) => Some(Ok(packet)),
                    Err(e) => Some(Err(e.into())),
                };
            }

            if let Err(e) = skip_field(&mut self.reader, wire_type) {
                return Some(Err(e));
            }
        }
    }
}

/// Reads a varint; `None` on a clean end of stream before the first byte.
fn read_varint<R: Read>(reader: &mut R) -> Result<Option<u64>> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let mut byte = [0u8; 1];
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && shift == 0 => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        }
        result |= ((byte[0] & 0x7f) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(result));
        }
        shift += 7;
        if shift >= 64 {
            bail!("Varint too large");
        }
    }
}

fn skip_field<R: Read>(reader: &mut R, wire_type: u8) -> Result<()> {
    let len = match wire_type {
        0 => {
            read_varint(reader)?.context("Truncated varint")?;
            return Ok(());
        }
        1 => 8,
        2 => read_varint(reader)?.context("Truncated length")?,
        5 => 4,
        _ => bail!("Unknown wire type: {wire_type}"),
    };
    let copied = std::io::copy(&mut reader.take(len), &mut std::io::sink())?;
    if copied != len {
        bail!("Truncated field");
    }
    Ok(())
}

pub fn open_trace(path: &Path) -> Result<TracePacketIterator<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(TracePacketIterator::new(BufReader::with_capacity(
        256 * 1024,
        file,
    )))
}
