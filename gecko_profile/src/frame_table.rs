use serde::ser::{Serialize, Serializer};

use crate::category::Category;
use crate::fast_hash_map::FastHashMap;
use crate::serialization_helpers::SerializableGeckoTable;
use crate::string_table::StringIndex;

/// An index into a thread's frame table.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct FrameIndex(pub(crate) u32);

impl FrameIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Serialize for FrameIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

/// The frame table is keyed by the frame's display string, not by its address:
/// two return addresses inside the same function collapse into one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameTable {
    locations: Vec<StringIndex>,
    categories: Vec<Category>,

    // location string -> frame index
    index: FastHashMap<StringIndex, FrameIndex>,
}

impl FrameTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the frame for `location`, creating it if necessary. `category` is
    /// only called when a new frame is created.
    pub fn index_for_frame(
        &mut self,
        location: StringIndex,
        category: impl FnOnce() -> Category,
    ) -> FrameIndex {
        if let Some(frame) = self.index.get(&location) {
            return *frame;
        }
        let frame = FrameIndex(self.locations.len() as u32);
        self.locations.push(location);
        self.categories.push(category());
        self.index.insert(location, frame);
        frame
    }

    pub fn location(&self, frame: FrameIndex) -> StringIndex {
        self.locations[frame.as_usize()]
    }

    pub fn category(&self, frame: FrameIndex) -> Category {
        self.categories[frame.as_usize()]
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl Serialize for FrameTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableGeckoTable {
            schema: &[
                "location",
                "relevantForJS",
                "innerWindowID",
                "implementation",
                "line",
                "column",
                "category",
                "subcategory",
            ],
            len: self.locations.len(),
            row: |i| {
                (
                    self.locations[i],
                    false,
                    0,
                    None::<()>,
                    None::<()>,
                    None::<()>,
                    self.categories[i],
                    0,
                )
            },
        }
        .serialize(serializer)
    }
}
