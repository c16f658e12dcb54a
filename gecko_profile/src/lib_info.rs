use debugid::{CodeId, DebugId};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A loaded image, as listed in the profile's `libs` array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lib {
    pub name: String,
    pub path: String,
    pub debug_name: String,
    pub debug_path: String,
    pub arch: Option<String>,
    pub debug_id: DebugId,
    pub code_id: Option<CodeId>,
    pub start_address: u64,
    pub end_address: u64,
}

impl Serialize for Lib {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("start", &self.start_address)?;
        map.serialize_entry("end", &self.end_address)?;
        // Mach-O images are mapped from the start of the file.
        map.serialize_entry("offset", &0)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("path", &self.path)?;
        map.serialize_entry("debugName", &self.debug_name)?;
        map.serialize_entry("debugPath", &self.debug_path)?;
        map.serialize_entry("breakpadId", &self.debug_id.breakpad().to_string())?;
        map.serialize_entry("codeId", &self.code_id.as_ref().map(ToString::to_string))?;
        map.serialize_entry("arch", &self.arch)?;
        map.end()
    }
}
