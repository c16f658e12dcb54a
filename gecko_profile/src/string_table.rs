use std::ops::Deref;

use serde::ser::{Serialize, Serializer};

use crate::fast_hash_map::FastHashMap;

/// An index into a thread's string table.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct StringIndex(pub(crate) u32);

impl StringIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Serialize for StringIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
    index: FastHashMap<String, StringIndex>,
    hex_address_strings: FastHashMap<u64, StringIndex>,
}

impl StringTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn index_for_string(&mut self, s: &str) -> StringIndex {
        match self.index.get(s) {
            Some(string_index) => *string_index,
            None => {
                let string_index = StringIndex(self.strings.len() as u32);
                self.strings.push(s.to_string());
                self.index.insert(s.to_string(), string_index);
                string_index
            }
        }
    }

    /// Interns the string `0x...` for an address. Shares entries with
    /// [`StringTable::index_for_string`], so an address string and an identical
    /// name string map to the same index.
    pub fn index_for_hex_address_string(&mut self, address: u64) -> StringIndex {
        if let Some(string_index) = self.hex_address_strings.get(&address) {
            return *string_index;
        }
        let string_index = self.index_for_string(&format!("{address:#x}"));
        self.hex_address_strings.insert(address, string_index);
        string_index
    }

    pub fn get_string(&self, index: StringIndex) -> Option<&str> {
        self.strings.get(index.as_usize()).map(Deref::deref)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Serialize for StringTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.strings.serialize(serializer)
    }
}
