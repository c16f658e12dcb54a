use super::parse_number;
use crate::document::TraceDocument;
use crate::error::Error;
use crate::types::Library;

/// Collects the loaded images referenced by the document's frames. Every image
/// is written once as a canonical `<binary>` element.
pub fn load_images(document: &TraceDocument) -> Result<Vec<Library>, Error> {
    let mut libraries = Vec::new();
    for binary in document.canonical_nodes("binary") {
        let Some(load_address) = binary.attribute("load-addr").and_then(parse_number) else {
            log::trace!("Skipping binary without load address: {:?}", binary.attribute("name"));
            continue;
        };
        let name = binary.attribute("name").unwrap_or_default();
        let path = binary.attribute("path").unwrap_or(name);
        libraries.push(Library {
            name: name.to_owned(),
            path: path.to_owned(),
            build_id: binary.attribute("UUID").map(ToOwned::to_owned),
            load_address,
            arch: binary.attribute("arch").map(ToOwned::to_owned),
        });
    }
    log::debug!("Found {} loaded images", libraries.len());
    Ok(libraries)
}
