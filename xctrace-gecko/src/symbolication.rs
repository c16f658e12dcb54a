//! Names for frames that the trace left unnamed.
//!
//! Instruments doesn't always symbolicate the frames it records, especially
//! for recordings made on a connected device. Those frames can be looked up
//! after the fact, one batch of addresses per image.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use rayon::prelude::*;

use crate::error::Error;
use crate::fast_hash_map::FastHashMap;
use crate::images::ImageResolver;
use crate::types::{Library, Sample, SymbolName, UNATTRIBUTED_ADDRESS, VM_OPERATION_ADDRESS};

/// Looks up the function names for addresses inside one image.
pub trait Symbolicator: Sync {
    /// Returns one entry per address, in the same order. `None` means that no
    /// name was found for that address.
    fn symbolicate(&self, library: &Library, addresses: &[u64])
        -> Result<Vec<Option<String>>, Error>;
}

/// Symbolicates with `atos`, which ships with the Xcode command line tools.
#[derive(Debug, Clone, Default)]
pub struct AtosSymbolicator {
    /// The copy of the device's file system in the device support directory.
    /// Image paths are looked up under this directory when it's set.
    symbols_root: Option<PathBuf>,
}

impl AtosSymbolicator {
    pub fn new(symbols_root: Option<PathBuf>) -> Self {
        AtosSymbolicator { symbols_root }
    }

    fn image_path(&self, library: &Library) -> PathBuf {
        match &self.symbols_root {
            Some(root) => root.join(library.path.trim_start_matches('/')),
            None => PathBuf::from(&library.path),
        }
    }
}

impl Symbolicator for AtosSymbolicator {
    fn symbolicate(
        &self,
        library: &Library,
        addresses: &[u64],
    ) -> Result<Vec<Option<String>>, Error> {
        let mut command = Command::new("atos");
        command.arg("-o").arg(self.image_path(library));
        if let Some(arch) = &library.arch {
            command.arg("-arch").arg(arch);
        }
        command
            .arg("-l")
            .arg(format!("{:#x}", library.load_address))
            .args(addresses.iter().map(|address| format!("{address:#x}")));

        let output = command.output().map_err(|source| Error::ToolLaunch {
            tool: "atos",
            source,
        })?;
        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: "atos",
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut names: Vec<Option<String>> = stdout.lines().map(parse_atos_line).collect();
        names.resize(addresses.len(), None);
        Ok(names)
    }
}

/// Extracts the function name from a line of `atos` output, such as
/// `-[AppDelegate application:didFinishLaunchingWithOptions:] (in MyApp) (AppDelegate.m:21)`.
/// Addresses that `atos` couldn't symbolicate are echoed back as hex.
fn parse_atos_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("0x") {
        return None;
    }
    let name = match line.find(" (in ") {
        Some(end) => &line[..end],
        None => line,
    };
    Some(name.to_owned())
}

/// `~/Library/Developer/Xcode/iOS DeviceSupport`, where Xcode copies the system
/// libraries of connected devices.
pub fn default_device_support_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library/Developer/Xcode/iOS DeviceSupport"))
}

/// Finds the symbols directory for a device OS version, e.g. `17.0.3 (21A360)`.
///
/// Xcode names the per-version directories either after the version alone or
/// after the device model followed by the version.
pub fn find_device_support_symbols(dir: &Path, os_version: &str) -> Result<PathBuf, Error> {
    let unresolvable = || Error::UnresolvableDeviceSupport {
        os_version: os_version.to_owned(),
        searched: dir.to_owned(),
    };
    let entries = std::fs::read_dir(dir).map_err(|_| unresolvable())?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name == os_version || name.ends_with(&format!(" {os_version}"))
        })
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    let found = candidates.into_iter().next().ok_or_else(unresolvable)?;
    let symbols = found.join("Symbols");
    log::debug!("Using device support symbols in {}", symbols.display());
    Ok(if symbols.is_dir() { symbols } else { found })
}

/// Fills in the names of unresolved frames, querying each image in parallel.
/// Returns the number of addresses that got a name.
///
/// A failing image is logged and its frames stay unresolved.
pub fn symbolicate_samples<'s>(
    samples: impl IntoIterator<Item = &'s mut Sample>,
    resolver: &ImageResolver,
    symbolicator: &dyn Symbolicator,
) -> usize {
    let mut samples: Vec<&mut Sample> = samples.into_iter().collect();

    let mut addresses_by_library: FastHashMap<usize, BTreeSet<u64>> = FastHashMap::default();
    for sample in &samples {
        for entry in &sample.backtrace {
            if entry.is_resolved()
                || entry.address == VM_OPERATION_ADDRESS
                || entry.address == UNATTRIBUTED_ADDRESS
            {
                continue;
            }
            if let Some(index) = resolver.resolve_index(entry.address) {
                addresses_by_library
                    .entry(index)
                    .or_default()
                    .insert(entry.address);
            }
        }
    }
    if addresses_by_library.is_empty() {
        return 0;
    }

    let mut work: Vec<(usize, Vec<u64>)> = addresses_by_library
        .into_iter()
        .map(|(index, addresses)| (index, addresses.into_iter().collect()))
        .collect();
    work.sort_unstable_by_key(|(index, _)| *index);

    let names: FastHashMap<u64, String> = work
        .par_iter()
        .flat_map_iter(|(index, addresses)| {
            let library = &resolver.libraries()[*index];
            let names = match symbolicator.symbolicate(library, addresses) {
                Ok(names) => names,
                Err(err) => {
                    log::warn!("Could not symbolicate {}: {err}", library.path);
                    Vec::new()
                }
            };
            addresses
                .iter()
                .zip(names)
                .filter_map(|(address, name)| Some((*address, name?)))
                .collect::<Vec<_>>()
        })
        .collect();
    log::debug!("Symbolicated {} addresses", names.len());

    for sample in samples.iter_mut() {
        for entry in sample.backtrace.iter_mut() {
            if entry.is_resolved() {
                continue;
            }
            if let Some(name) = names.get(&entry.address) {
                entry.name = SymbolName::Resolved(name.clone());
            }
        }
    }
    names.len()
}
