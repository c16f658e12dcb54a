//! Build per-thread interned profiles and serialize them in the Gecko profile
//! JSON format, which the Firefox Profiler can import.
//!
//! Each [`ThreadBuilder`] owns a string table, a frame table, a stack table and a
//! sample table. Frames are deduplicated by their display string and stacks form
//! a prefix tree keyed by `(parent stack, frame)`, so the size of the output is
//! bounded by the number of distinct call paths rather than by the number of
//! samples.

pub use debugid;

mod category;
mod fast_hash_map;
mod frame_table;
mod lib_info;
mod sample_table;
mod serialization_helpers;
mod stack_table;
mod string_table;
mod thread;

pub use category::{Category, CategoryColor};
pub use frame_table::{FrameIndex, FrameTable};
pub use lib_info::Lib;
pub use sample_table::SampleTable;
pub use stack_table::{StackIndex, StackTable};
pub use string_table::{StringIndex, StringTable};
pub use thread::{Frame, ThreadBuilder};

use std::cmp::Ordering;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;

use category::SerializableCategoryPalette;

/// The Gecko profile format version we emit.
pub const GECKO_PROFILE_VERSION: u32 = 24;

#[derive(Debug)]
pub struct ProfileBuilder {
    product: String,
    interval_ms: f64,
    libs: Vec<Lib>,
    threads: Vec<ThreadBuilder>,
}

impl ProfileBuilder {
    pub fn new(product: &str, interval_ms: f64) -> Self {
        ProfileBuilder {
            product: product.to_owned(),
            interval_ms,
            libs: Vec::new(),
            threads: Vec::new(),
        }
    }

    pub fn add_lib(&mut self, lib: Lib) {
        self.libs.push(lib);
    }

    pub fn add_thread(&mut self, thread_builder: ThreadBuilder) {
        self.threads.push(thread_builder);
    }

    pub fn threads(&self) -> &[ThreadBuilder] {
        &self.threads
    }

    pub fn libs(&self) -> &[Lib] {
        &self.libs
    }

    /// The earliest sample timestamp across all threads, or 0 for a profile
    /// without samples.
    pub fn start_time(&self) -> f64 {
        self.threads
            .iter()
            .filter_map(|thread| thread.first_sample_time())
            .min_by(f64::total_cmp)
            .unwrap_or(0.0)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!(self)
    }

    fn sorted_threads(&self) -> Vec<&ThreadBuilder> {
        let mut sorted_threads: Vec<_> = self.threads.iter().collect();
        sorted_threads.sort_by(|a, b| {
            let ordering = match (a.first_sample_time(), b.first_sample_time()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_none().cmp(&b.is_none()),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
            let ordering = a.name().cmp(b.name());
            if ordering != Ordering::Equal {
                return ordering;
            }
            a.tid().cmp(&b.tid())
        });
        sorted_threads
    }
}

impl Serialize for ProfileBuilder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut sorted_libs: Vec<_> = self.libs.iter().collect();
        sorted_libs.sort_by_key(|l| l.start_address);
        let threads: Vec<_> = self
            .sorted_threads()
            .into_iter()
            .map(|thread| thread.serialize_with_process(&self.product))
            .collect();

        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(
            "meta",
            &SerializableMeta {
                profile: self,
                start_time: self.start_time(),
            },
        )?;
        map.serialize_entry("libs", &sorted_libs)?;
        map.serialize_entry("threads", &threads)?;
        map.serialize_entry("processes", &[(); 0])?;
        map.end()
    }
}

struct SerializableMeta<'a> {
    profile: &'a ProfileBuilder,
    start_time: f64,
}

impl Serialize for SerializableMeta<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("version", &GECKO_PROFILE_VERSION)?;
        map.serialize_entry("startTime", &self.start_time)?;
        map.serialize_entry("shutdownTime", &None::<f64>)?;
        map.serialize_entry("pausedRanges", &[(); 0])?;
        map.serialize_entry("product", &self.profile.product)?;
        map.serialize_entry("interval", &self.profile.interval_ms)?;
        map.serialize_entry("stackwalk", &1)?;
        map.serialize_entry("debug", &false)?;
        map.serialize_entry("processType", &0)?;
        map.serialize_entry("categories", &SerializableCategoryPalette)?;
        map.serialize_entry("markerSchema", &[(); 0])?;
        map.end()
    }
}
