use serde::ser::{Serialize, Serializer};

use crate::category::Category;
use crate::fast_hash_map::FastHashMap;
use crate::frame_table::FrameIndex;
use crate::serialization_helpers::SerializableGeckoTable;

/// An index into a thread's stack table.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct StackIndex(pub(crate) u32);

impl StackIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Serialize for StackIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

/// The stack table is a prefix tree: each entry is a frame plus the entry for
/// the rest of the stack towards the root.
#[derive(Debug, Clone, Default)]
pub struct StackTable {
    prefixes: Vec<Option<StackIndex>>,
    frames: Vec<FrameIndex>,
    categories: Vec<Category>,

    // (parent stack, frame) -> stack index
    index: FastHashMap<(Option<StackIndex>, FrameIndex), StackIndex>,
}

impl StackTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn index_for_stack(
        &mut self,
        prefix: Option<StackIndex>,
        frame: FrameIndex,
        category: Category,
    ) -> StackIndex {
        match self.index.get(&(prefix, frame)) {
            Some(stack) => *stack,
            None => {
                let stack = StackIndex(self.prefixes.len() as u32);
                self.prefixes.push(prefix);
                self.frames.push(frame);
                self.categories.push(category);
                self.index.insert((prefix, frame), stack);
                stack
            }
        }
    }

    /// Walks `frames` from the root towards the leaf and returns the stack for
    /// the full sequence, or `None` for an empty sequence.
    pub fn index_for_frames(
        &mut self,
        root_first_frames: impl Iterator<Item = (FrameIndex, Category)>,
    ) -> Option<StackIndex> {
        let mut prefix = None;
        for (frame, category) in root_first_frames {
            prefix = Some(self.index_for_stack(prefix, frame, category));
        }
        prefix
    }

    pub fn prefix(&self, stack: StackIndex) -> Option<StackIndex> {
        self.prefixes[stack.as_usize()]
    }

    pub fn frame(&self, stack: StackIndex) -> FrameIndex {
        self.frames[stack.as_usize()]
    }

    pub fn category(&self, stack: StackIndex) -> Category {
        self.categories[stack.as_usize()]
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Serialize for StackTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableGeckoTable {
            schema: &["prefix", "frame", "category"],
            len: self.prefixes.len(),
            row: |i| (self.prefixes[i], self.frames[i], self.categories[i]),
        }
        .serialize(serializer)
    }
}
