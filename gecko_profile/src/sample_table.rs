use serde::ser::{Serialize, Serializer};

use crate::serialization_helpers::SerializableGeckoTable;
use crate::stack_table::StackIndex;

/// Samples in the order they were added. `None` stacks mark the thread as idle.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    stacks: Vec<Option<StackIndex>>,
    times: Vec<f64>,
    event_delays: Vec<f64>,
}

impl SampleTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_sample(&mut self, timestamp_ms: f64, stack: Option<StackIndex>) {
        self.stacks.push(stack);
        self.times.push(timestamp_ms);
        self.event_delays.push(0.0);
    }

    pub fn stack(&self, index: usize) -> Option<StackIndex> {
        self.stacks[index]
    }

    pub fn first_time(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl Serialize for SampleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializableGeckoTable {
            schema: &["stack", "time", "eventDelay"],
            len: self.times.len(),
            row: |i| (self.stacks[i], self.times[i], self.event_delays[i]),
        }
        .serialize(serializer)
    }
}
