use std::path::PathBuf;

/// Runtime options for a consume run, separated from CLI parsing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,
    /// Name of the already running real-time logger session
    pub session_name: String,
    /// Perfetto trace file to write
    pub output: PathBuf,
    /// Performance-counter frequency override in ticks per second
    pub tick_frequency: Option<i64>,
    /// trusted_packet_sequence_id stamped on every packet
    pub sequence_id: u32,
    /// Duration in seconds (0 = until the session is closed)
    pub duration: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: 0,
            session_name: "NT Kernel Logger".to_string(),
            output: PathBuf::from("etw.pftrace"),
            tick_frequency: None,
            sequence_id: 1,
            duration: 0,
        }
    }
}

impl Config {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
