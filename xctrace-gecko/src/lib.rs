//! Converts Instruments traces into Gecko profiles for the Firefox Profiler.
//!
//! A run of a `.trace` bundle is read through `xctrace export`, one XML
//! document per table: the CPU samples of the time profiler, and optionally the
//! thread states, virtual memory operations and syscalls. The samples of all
//! tables are merged into one timeline per thread and interned into a
//! [`gecko_profile::ProfileBuilder`].
//!
//! ```no_run
//! use xctrace_gecko::{convert, save_profile_to_file, ConversionProps, XctraceExport};
//!
//! let source = XctraceExport::new("Recording.trace");
//! let profile = convert(&source, &ConversionProps::default())?;
//! save_profile_to_file(&profile, "profile.json.gz".as_ref())?;
//! # Ok::<(), xctrace_gecko::Error>(())
//! ```

mod assembler;
mod convert;
mod document;
mod error;
mod fast_hash_map;
mod images;
mod props;
mod save_profile;
mod settings;
mod source;
mod symbolication;
mod tables;
mod types;

pub use gecko_profile;

pub use assembler::{
    IdleGapStrategy, SampleAssembler, SampleTables, ThreadSamples, IDLE_GAP_MULTIPLIER,
};
pub use convert::{convert, convert_run, probe_settings};
pub use document::{Identity, Node, NodeId, TraceDocument};
pub use error::Error;
pub use images::{CategoryRules, FrameClassifier, ImageResolver};
pub use props::{ConversionProps, IdleGapMode};
pub use save_profile::save_profile_to_file;
pub use settings::{RunSettings, TargetDevice, TargetProcess};
pub use source::{source_for_input, ExportDirectory, TraceSource, XctraceExport};
pub use symbolication::{
    default_device_support_dir, find_device_support_symbols, symbolicate_samples,
    AtosSymbolicator, Symbolicator,
};
pub use tables::{
    load_cpu_samples, load_images, load_syscall_samples, load_thread_state_samples,
    load_virtual_memory_samples,
};
pub use types::{
    Library, Sample, SampleSource, SymbolEntry, SymbolName, ThreadDescriptor,
    UNATTRIBUTED_ADDRESS, VM_OPERATION_ADDRESS,
};
