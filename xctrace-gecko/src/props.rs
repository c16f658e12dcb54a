use std::path::PathBuf;

/// How to detect idle time on threads that have no thread-state table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IdleGapMode {
    /// Use the per-sample durations if every CPU sample has one, otherwise the
    /// sampling interval.
    #[default]
    Auto,
    /// Compare gaps to the sampling interval.
    FixedInterval,
    /// Compare gaps to the duration of the sample before the gap.
    PreviousDuration,
    /// Never insert idle samples.
    Disabled,
}

/// Properties which control how a trace is converted into a profile.
#[derive(Debug, Clone)]
pub struct ConversionProps {
    /// The run of the trace to convert, starting at 1.
    pub run: u32,
    /// The name used to recognize the application's own images. Defaults to
    /// the name of the recorded process.
    pub app_name: Option<String>,
    pub idle_gap_mode: IdleGapMode,
    /// Where the symbols of connected devices are cached. Only consulted for
    /// traces recorded on a device other than this machine.
    pub device_support_dir: Option<PathBuf>,
    /// Look up names for frames that the trace doesn't name.
    pub symbolicate: bool,
}

impl Default for ConversionProps {
    fn default() -> Self {
        ConversionProps {
            run: 1,
            app_name: None,
            idle_gap_mode: IdleGapMode::Auto,
            device_support_dir: None,
            symbolicate: false,
        }
    }
}
