//! Top-level driver: consume a live session into a trace file.

use anyhow::Result;

use crate::config::Config;
use crate::consumer::ConsumerStats;

#[cfg(windows)]
pub fn consume(config: &Config) -> Result<ConsumerStats> {
    use std::fs::File;
    use std::io::BufWriter;
    use std::thread;
    use std::time::Duration;

    use anyhow::Context;

    use crate::consumer::EtwConsumer;
    use crate::session::RealtimeSession;
    use crate::timestamp::TickConverter;
    use crate::writer::StreamingTraceWriter;

    let file = File::create(&config.output)
        .with_context(|| format!("Failed to create output file: {}", config.output.display()))?;
    let mut writer = StreamingTraceWriter::new(BufWriter::new(file), config.sequence_id);

    let converter = match config.tick_frequency {
        Some(frequency) => TickConverter::new(frequency),
        None => TickConverter::platform(),
    };

    let mut session = RealtimeSession::open(&config.session_name)?;
    let closer = session.closer();
    ctrlc::set_handler(move || closer.close()).context("Failed to install Ctrl-C handler")?;
    if config.duration > 0 {
        let closer = session.closer();
        let duration = Duration::from_secs(config.duration);
        thread::spawn(move || {
            thread::sleep(duration);
            closer.close();
        });
    }

    let stats = {
        let mut consumer = EtwConsumer::with_tick_converter(&mut writer, converter);
        consumer.run(&mut session)?;
        consumer.stats()
    };

    writer.flush()?;
    log::info!(
        "Wrote {} packets ({} events, {} bytes) to {}",
        writer.packet_count(),
        writer.event_count(),
        writer.bytes_written(),
        config.output.display()
    );
    Ok(stats)
}

#[cfg(not(windows))]
pub fn consume(config: &Config) -> Result<ConsumerStats> {
    anyhow::bail!(
        "consuming ETW session {:?} requires Windows",
        config.session_name
    )
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn test_consume_reports_unsupported_platform() {
        let err = consume(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("requires Windows"));
    }
}
