mod discovery;
mod walker;

pub use discovery::{Documents, MARKER_FILE, discover_documents};
pub use walker::{WalkError, WalkReport, postprocess_directory, postprocess_directory_with};
