use gecko_profile::Category;

use crate::types::{Library, VM_OPERATION_ADDRESS};

/// Path prefix of the platform's system frameworks.
pub const SYSTEM_FRAMEWORK_PREFIX: &str = "/System/Library/";
/// Path prefix of the platform's system libraries and binaries.
pub const SYSTEM_BINARIES_PREFIX: &str = "/usr/lib/";

/// The loaded images of a trace, sorted by load address.
///
/// Images only have a start address. An image is assumed to extend up to the
/// next image's load address, and the last one to the end of the address space.
#[derive(Debug, Clone, Default)]
pub struct ImageResolver {
    libraries: Vec<Library>,
}

impl ImageResolver {
    pub fn new(mut libraries: Vec<Library>) -> Self {
        libraries.sort_by_key(|library| library.load_address);
        libraries.dedup_by_key(|library| library.load_address);
        ImageResolver { libraries }
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    /// The index of the image containing `address`.
    pub fn resolve_index(&self, address: u64) -> Option<usize> {
        match self
            .libraries
            .binary_search_by_key(&address, |library| library.load_address)
        {
            Ok(index) => Some(index),
            // Below the first image, e.g. in the dynamic loader's preamble.
            Err(0) => None,
            Err(insertion_point) => Some(insertion_point - 1),
        }
    }

    pub fn resolve_library(&self, address: u64) -> Option<&Library> {
        self.resolve_index(address).map(|index| &self.libraries[index])
    }

    /// The exclusive end address of the image at `index`.
    pub fn range_end(&self, index: usize) -> u64 {
        self.libraries
            .get(index + 1)
            .map_or(u64::MAX, |next| next.load_address)
    }
}

/// How images map to categories.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    /// Images whose path contains this name belong to the application.
    pub app_name: Option<String>,
    pub system_framework_prefix: String,
    /// Images under any of these prefixes are system libraries.
    pub library_prefixes: Vec<String>,
}

impl CategoryRules {
    pub fn new(app_name: Option<String>, device_support_dir: Option<String>) -> Self {
        let mut library_prefixes: Vec<String> = device_support_dir.into_iter().collect();
        library_prefixes.push(SYSTEM_BINARIES_PREFIX.to_owned());
        CategoryRules {
            app_name: app_name.filter(|name| !name.is_empty()),
            system_framework_prefix: SYSTEM_FRAMEWORK_PREFIX.to_owned(),
            library_prefixes,
        }
    }

    /// Applies the rules in priority order; the first match wins.
    pub fn classify(&self, address: u64, library: Option<&Library>) -> Category {
        if address == VM_OPERATION_ADDRESS {
            return Category::VirtualMemory;
        }
        let Some(library) = library else {
            return Category::Other;
        };
        let path = library.path.as_str();
        if matches!(&self.app_name, Some(app_name) if path.contains(app_name.as_str())) {
            Category::User
        } else if path.starts_with(&self.system_framework_prefix) {
            Category::Framework
        } else if self
            .library_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            Category::Library
        } else {
            Category::Other
        }
    }
}

/// Classifies frames by the image their address falls into.
#[derive(Debug, Clone)]
pub struct FrameClassifier {
    resolver: ImageResolver,
    rules: CategoryRules,
}

impl FrameClassifier {
    pub fn new(resolver: ImageResolver, rules: CategoryRules) -> Self {
        FrameClassifier { resolver, rules }
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    pub fn classify(&self, address: u64) -> Category {
        let library = if address == VM_OPERATION_ADDRESS {
            None
        } else {
            self.resolver.resolve_library(address)
        };
        self.rules.classify(address, library)
    }
}
