//! Download names and archive packaging for converted items.

mod archive;
mod filename;

pub use archive::{ArchiveEntry, build_archive, completed_entries};
pub use filename::{NAME_TOKEN, SEQUENCE_TOKEN, download_name, entry_name};
