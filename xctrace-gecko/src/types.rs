use std::borrow::Cow;

/// The address used for synthetic virtual memory operation frames. No image is
/// loaded there, and [`crate::images::FrameClassifier`] maps it to the virtual
/// memory category.
pub const VM_OPERATION_ADDRESS: u64 = u64::MAX;

/// The address used for synthetic frames that aren't backed by code, such as
/// the frame naming a syscall. It precedes every loaded image.
pub const UNATTRIBUTED_ADDRESS: u64 = 0;

/// A loaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub path: String,
    /// The Mach-O UUID, as written by the exporter.
    pub build_id: Option<String>,
    pub load_address: u64,
    pub arch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolName {
    Resolved(String),
    /// No name is known; the frame is displayed as its address.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolEntry {
    pub address: u64,
    pub name: SymbolName,
}

impl SymbolEntry {
    pub fn resolved(address: u64, name: impl Into<String>) -> Self {
        SymbolEntry {
            address,
            name: SymbolName::Resolved(name.into()),
        }
    }

    pub fn unresolved(address: u64) -> Self {
        SymbolEntry {
            address,
            name: SymbolName::Unresolved,
        }
    }

    /// A frame for a virtual memory operation, e.g. `VM: Zero Fill`.
    pub fn vm_operation(operation: &str) -> Self {
        Self::resolved(VM_OPERATION_ADDRESS, format!("VM: {operation}"))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.name, SymbolName::Resolved(_))
    }

    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.name {
            SymbolName::Resolved(name) => Cow::Borrowed(name),
            SymbolName::Unresolved => Cow::Owned(format!("{:#x}", self.address)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadDescriptor {
    pub name: String,
    pub tid: u64,
}

/// Which table a sample came from. The declaration order is the order in which
/// samples with equal timestamps are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleSource {
    Syscall,
    ThreadState,
    VirtualMemory,
    CpuProfile,
    /// Inserted by the assembler to mark a gap in which the thread was idle.
    IdleGap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub thread: ThreadDescriptor,
    pub timestamp_ms: f64,
    pub duration_ms: f64,
    pub source: SampleSource,
    /// Leaf frame first.
    pub backtrace: Vec<SymbolEntry>,
}

impl Sample {
    pub fn end_ms(&self) -> f64 {
        self.timestamp_ms + self.duration_ms
    }
}
