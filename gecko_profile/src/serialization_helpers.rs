use serde::ser::{Serialize, SerializeMap, Serializer};

/// The `schema` object of a Gecko table: maps each column name to its position
/// in the rows of `data`.
pub struct SerializableSchema(pub &'static [&'static str]);

impl Serialize for SerializableSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, column) in self.0.iter().enumerate() {
            map.serialize_entry(column, &index)?;
        }
        map.end()
    }
}

/// A Gecko table in its array-of-arrays form: `{ "schema": {...}, "data": [[...], ...] }`.
pub struct SerializableGeckoTable<F> {
    pub schema: &'static [&'static str],
    pub len: usize,
    pub row: F,
}

impl<F, R> Serialize for SerializableGeckoTable<F>
where
    F: Fn(usize) -> R,
    R: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("schema", &SerializableSchema(self.schema))?;
        map.serialize_entry("data", &SerializableRows(self))?;
        map.end()
    }
}

struct SerializableRows<'a, F>(&'a SerializableGeckoTable<F>);

impl<F, R> Serialize for SerializableRows<'_, F>
where
    F: Fn(usize) -> R,
    R: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let table = self.0;
        serializer.collect_seq((0..table.len).map(|i| (table.row)(i)))
    }
}
