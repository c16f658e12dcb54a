use std::path::PathBuf;
use std::str::FromStr;

use gecko_profile::debugid::{CodeId, DebugId};
use gecko_profile::{Frame, Lib, ProfileBuilder, ThreadBuilder};
use rayon::prelude::*;

use crate::assembler::{IdleGapStrategy, SampleAssembler, SampleTables, ThreadSamples};
use crate::document::TraceDocument;
use crate::error::Error;
use crate::images::{CategoryRules, FrameClassifier, ImageResolver};
use crate::props::ConversionProps;
use crate::settings::{
    RunSettings, SYSCALL_SCHEMA, THREAD_STATE_SCHEMA, TIME_PROFILE_SCHEMA, VIRTUAL_MEMORY_SCHEMA,
};
use crate::source::TraceSource;
use crate::symbolication::{
    default_device_support_dir, find_device_support_symbols, symbolicate_samples,
    AtosSymbolicator, Symbolicator,
};
use crate::tables::{
    load_cpu_samples, load_images, load_syscall_samples, load_thread_state_samples,
    load_virtual_memory_samples,
};
use crate::types::{Library, Sample, SymbolName};

/// The product name used when neither the props nor the trace name the app.
const FALLBACK_PRODUCT_NAME: &str = "Instruments";

type SampleLoader = fn(&TraceDocument, Option<u32>) -> Result<Vec<Sample>, Error>;

/// The samples of one table and the images its frames referenced.
#[derive(Debug, Default)]
struct LoadedTable {
    samples: Vec<Sample>,
    libraries: Vec<Library>,
}

/// Converts one run of a trace into a profile. Frames are symbolicated with
/// `atos` if `props.symbolicate` is set.
pub fn convert(source: &dyn TraceSource, props: &ConversionProps) -> Result<ProfileBuilder, Error> {
    let settings = probe_settings(source, props.run)?;
    if !props.symbolicate {
        return convert_run(source, &settings, props, None);
    }

    let symbols_root = match &settings.device {
        Some(device) if device.is_remote() => {
            let os_version = device.os_version.as_deref().unwrap_or_default();
            let dir = device_support_dir(props).unwrap_or_default();
            Some(find_device_support_symbols(&dir, os_version)?)
        }
        _ => None,
    };
    let symbolicator = AtosSymbolicator::new(symbols_root);
    convert_run(source, &settings, props, Some(&symbolicator))
}

/// Reads the trace's table of contents and probes the settings of `run`.
pub fn probe_settings(source: &dyn TraceSource, run: u32) -> Result<RunSettings, Error> {
    let toc = TraceDocument::parse(&source.toc()?)?;
    RunSettings::probe(&toc, run)
}

/// Converts the run described by `settings`, using `symbolicator` for the
/// frames that the trace didn't name.
pub fn convert_run(
    source: &dyn TraceSource,
    settings: &RunSettings,
    props: &ConversionProps,
    symbolicator: Option<&dyn Symbolicator>,
) -> Result<ProfileBuilder, Error> {
    let run = settings.run;
    let target_pid = settings.target_pid();
    let load = |schema: &'static str, loader: SampleLoader| {
        load_table(source, run, schema, loader, target_pid)
    };

    let mut cpu = None;
    let mut thread_state = None;
    let mut virtual_memory = None;
    let mut syscall = None;
    rayon::scope(|s| {
        s.spawn(|_| cpu = Some(load(TIME_PROFILE_SCHEMA, load_cpu_samples)));
        if settings.has_thread_state() {
            s.spawn(|_| {
                thread_state = Some(load(THREAD_STATE_SCHEMA, load_thread_state_samples))
            });
        }
        if settings.has_virtual_memory() {
            s.spawn(|_| {
                virtual_memory = Some(load(VIRTUAL_MEMORY_SCHEMA, load_virtual_memory_samples))
            });
        }
        if settings.has_syscall() {
            s.spawn(|_| syscall = Some(load(SYSCALL_SCHEMA, load_syscall_samples)));
        }
    });

    let cpu = cpu.transpose()?.unwrap_or_default();
    let thread_state = thread_state.transpose()?.unwrap_or_default();
    let virtual_memory = virtual_memory.transpose()?.unwrap_or_default();
    let syscall = syscall.transpose()?.unwrap_or_default();

    let mut libraries = Vec::new();
    let mut tables = SampleTables::default();
    for (loaded, slot) in [
        (cpu, &mut tables.cpu),
        (thread_state, &mut tables.thread_state),
        (virtual_memory, &mut tables.virtual_memory),
        (syscall, &mut tables.syscall),
    ] {
        libraries.extend(loaded.libraries);
        *slot = loaded.samples;
    }
    let resolver = ImageResolver::new(libraries);

    if let Some(symbolicator) = symbolicator {
        symbolicate_samples(tables.iter_mut(), &resolver, symbolicator);
    }

    let interval_ms = settings.sampling_interval_ms();
    let strategy = IdleGapStrategy::select(
        props.idle_gap_mode,
        settings.has_thread_state(),
        &tables.cpu,
        interval_ms,
    );
    log::debug!("Idle gap strategy: {strategy:?}");
    let input_sample_count = tables.len();
    let threads = SampleAssembler::new(strategy).assemble(tables);

    let app_name = props
        .app_name
        .clone()
        .or_else(|| settings.target_name().map(ToOwned::to_owned));
    let device_support_prefix =
        device_support_dir(props).map(|dir| dir.to_string_lossy().into_owned());
    let classifier = FrameClassifier::new(
        resolver,
        CategoryRules::new(app_name.clone(), device_support_prefix),
    );

    let thread_builders: Vec<ThreadBuilder> = threads
        .into_par_iter()
        .map(|thread| build_thread(thread, &classifier))
        .collect();

    let product = app_name.as_deref().unwrap_or(FALLBACK_PRODUCT_NAME);
    let mut profile = ProfileBuilder::new(product, interval_ms);
    let resolver = classifier.resolver();
    for (index, library) in resolver.libraries().iter().enumerate() {
        profile.add_lib(lib_for_library(library, resolver.range_end(index)));
    }
    let thread_count = thread_builders.len();
    for thread in thread_builders {
        profile.add_thread(thread);
    }
    log::info!(
        "Converted {input_sample_count} samples on {thread_count} threads with {} images",
        profile.libs().len()
    );
    Ok(profile)
}

fn load_table(
    source: &dyn TraceSource,
    run: u32,
    schema: &'static str,
    loader: SampleLoader,
    target_pid: Option<u32>,
) -> Result<LoadedTable, Error> {
    let document = TraceDocument::parse(&source.table(run, schema)?)?;
    Ok(LoadedTable {
        samples: loader(&document, target_pid)?,
        libraries: load_images(&document)?,
    })
}

fn device_support_dir(props: &ConversionProps) -> Option<PathBuf> {
    props
        .device_support_dir
        .clone()
        .or_else(default_device_support_dir)
}

/// Interns one thread's samples, in time order.
fn build_thread(thread: ThreadSamples, classifier: &FrameClassifier) -> ThreadBuilder {
    let mut builder = ThreadBuilder::new(thread.thread.tid, &thread.thread.name);
    let mut frames = Vec::new();
    for sample in &thread.samples {
        frames.clear();
        for entry in &sample.backtrace {
            let frame = match &entry.name {
                SymbolName::Resolved(name) => Frame::Name(name),
                SymbolName::Unresolved => Frame::Address(entry.address),
            };
            frames.push(builder.intern_frame(frame, || classifier.classify(entry.address)));
        }
        builder.add_sample(sample.timestamp_ms, &frames);
    }
    builder
}

fn lib_for_library(library: &Library, end_address: u64) -> Lib {
    let build_id = library.build_id.as_deref();
    Lib {
        name: library.name.clone(),
        path: library.path.clone(),
        debug_name: library.name.clone(),
        debug_path: library.path.clone(),
        arch: library.arch.clone(),
        debug_id: build_id
            .and_then(|id| DebugId::from_str(id).ok())
            .unwrap_or_else(DebugId::nil),
        code_id: build_id.map(|id| CodeId::new(id.replace('-', ""))),
        start_address: library.load_address,
        end_address,
    }
}
