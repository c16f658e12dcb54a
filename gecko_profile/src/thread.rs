use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;

use crate::category::Category;
use crate::frame_table::{FrameIndex, FrameTable};
use crate::sample_table::SampleTable;
use crate::stack_table::{StackIndex, StackTable};
use crate::string_table::{StringIndex, StringTable};

/// A frame as handed to [`ThreadBuilder::intern_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// A symbol name.
    Name(&'a str),
    /// An address we have no name for; displayed as `0x...`.
    Address(u64),
}

/// The interning state for a single thread.
///
/// All tables are private to the thread and only ever grow, so threads can be
/// built independently of each other.
#[derive(Debug)]
pub struct ThreadBuilder {
    tid: u64,
    name: String,
    string_table: StringTable,
    frame_table: FrameTable,
    stack_table: StackTable,
    samples: SampleTable,
}

impl ThreadBuilder {
    pub fn new(tid: u64, name: &str) -> Self {
        ThreadBuilder {
            tid,
            name: name.to_owned(),
            string_table: StringTable::new(),
            frame_table: FrameTable::new(),
            stack_table: StackTable::new(),
            samples: SampleTable::new(),
        }
    }

    pub fn tid(&self) -> u64 {
        self.tid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interns the frame's display string and then the frame itself. Frames are
    /// keyed by display string; `category` is only evaluated for new frames.
    pub fn intern_frame(
        &mut self,
        frame: Frame<'_>,
        category: impl FnOnce() -> Category,
    ) -> FrameIndex {
        let location = match frame {
            Frame::Name(name) => self.string_table.index_for_string(name),
            Frame::Address(address) => self.string_table.index_for_hex_address_string(address),
        };
        self.frame_table.index_for_frame(location, category)
    }

    /// Adds a sample whose stack is given leaf frame first, and returns the
    /// stack it was assigned. An empty stack is recorded as an idle sample.
    pub fn add_sample(
        &mut self,
        timestamp_ms: f64,
        leaf_first_frames: &[FrameIndex],
    ) -> Option<StackIndex> {
        let frame_table = &self.frame_table;
        let stack = self.stack_table.index_for_frames(
            leaf_first_frames
                .iter()
                .rev()
                .map(|frame| (*frame, frame_table.category(*frame))),
        );
        self.samples.add_sample(timestamp_ms, stack);
        stack
    }

    pub fn first_sample_time(&self) -> Option<f64> {
        self.samples.first_time()
    }

    pub fn get_string(&self, index: StringIndex) -> Option<&str> {
        self.string_table.get_string(index)
    }

    pub fn string_table(&self) -> &StringTable {
        &self.string_table
    }

    pub fn frame_table(&self) -> &FrameTable {
        &self.frame_table
    }

    pub fn stack_table(&self) -> &StackTable {
        &self.stack_table
    }

    pub fn samples(&self) -> &SampleTable {
        &self.samples
    }

    /// The display string of each frame on `stack`, leaf first.
    pub fn stack_frame_names(&self, stack: Option<StackIndex>) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = stack;
        while let Some(stack) = current {
            let location = self.frame_table.location(self.stack_table.frame(stack));
            names.push(self.string_table.get_string(location).unwrap_or_default());
            current = self.stack_table.prefix(stack);
        }
        names
    }

    pub(crate) fn serialize_with_process<'a>(
        &'a self,
        process_name: &'a str,
    ) -> impl Serialize + 'a {
        SerializableThread {
            thread: self,
            process_name,
        }
    }
}

struct SerializableThread<'a> {
    thread: &'a ThreadBuilder,
    process_name: &'a str,
}

impl Serialize for SerializableThread<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let thread = self.thread;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &thread.name)?;
        map.serialize_entry("tid", &thread.tid)?;
        // Only single-process profiles are produced.
        map.serialize_entry("pid", &0)?;
        map.serialize_entry("processType", "default")?;
        map.serialize_entry("processName", self.process_name)?;
        map.serialize_entry("registerTime", &0.0)?;
        map.serialize_entry("unregisterTime", &None::<f64>)?;
        map.serialize_entry("frameTable", &thread.frame_table)?;
        map.serialize_entry("stackTable", &thread.stack_table)?;
        map.serialize_entry("samples", &thread.samples)?;
        map.serialize_entry(
            "markers",
            &json!({
                "schema": {
                    "name": 0,
                    "startTime": 1,
                    "endTime": 2,
                    "phase": 3,
                    "category": 4,
                    "data": 5
                },
                "data": []
            }),
        )?;
        map.serialize_entry("stringTable", &thread.string_table)?;
        map.end()
    }
}
