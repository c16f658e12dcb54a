use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// The coarse attribution bucket of a stack frame.
///
/// The set of categories is fixed: every profile carries the same palette, and a
/// category's index into that palette is what the frame and stack tables store.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum Category {
    /// Code from the profiled application itself.
    User,
    /// Code from a system framework.
    Framework,
    /// Code from a system library or other platform binary.
    Library,
    /// Anything we couldn't attribute.
    Other,
    /// Synthetic frames describing virtual memory operations.
    VirtualMemory,
}

impl Category {
    /// All categories, in palette order.
    pub const ALL: [Category; 5] = [
        Category::User,
        Category::Framework,
        Category::Library,
        Category::Other,
        Category::VirtualMemory,
    ];

    /// The index of this category in the profile's `meta.categories` array.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::User => "User",
            Category::Framework => "Framework",
            Category::Library => "Library",
            Category::Other => "Other",
            Category::VirtualMemory => "Virtual Memory",
        }
    }

    pub fn color(self) -> CategoryColor {
        match self {
            Category::User => CategoryColor::Yellow,
            Category::Framework => CategoryColor::Blue,
            Category::Library => CategoryColor::Purple,
            Category::Other => CategoryColor::Gray,
            Category::VirtualMemory => CategoryColor::Orange,
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.index())
    }
}

/// One of the colors the Firefox Profiler knows for categories.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq)]
pub enum CategoryColor {
    Yellow,
    Blue,
    Purple,
    Gray,
    Orange,
}

impl Serialize for CategoryColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CategoryColor::Yellow => "yellow".serialize(serializer),
            CategoryColor::Blue => "blue".serialize(serializer),
            CategoryColor::Purple => "purple".serialize(serializer),
            CategoryColor::Gray => "grey".serialize(serializer),
            CategoryColor::Orange => "orange".serialize(serializer),
        }
    }
}

/// Serializes the fixed palette for `meta.categories`.
pub(crate) struct SerializableCategoryPalette;

impl Serialize for SerializableCategoryPalette {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(Category::ALL.len()))?;
        for category in Category::ALL {
            seq.serialize_element(&SerializableCategory(category))?;
        }
        seq.end()
    }
}

struct SerializableCategory(Category);

impl Serialize for SerializableCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("name", self.0.name())?;
        map.serialize_entry("color", &self.0.color())?;
        map.serialize_entry("subcategories", &["Other"])?;
        map.end()
    }
}
