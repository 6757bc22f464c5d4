//! Indexing pipeline: discover → parallel extract → batched
//! populate → finalize.

mod pipeline;
mod records;
mod walker;

pub use pipeline::run;
pub use walker::discover_files;
