//! Persistence: a compact, streaming, versioned on-disk index with
//! an event-driven reader supporting partial-load modes.

mod reader;
mod writer;

pub use reader::{LoadMode, load, load_from_reader, stream_all_symbols, stream_file_paths, stream_search_symbols};
pub use writer::save;

/// Current schema version (semver). The reader rejects files whose major
/// version differs, or whose major.minor is below `MIN_COMPATIBLE`.
pub const SCHEMA_VERSION: &str = "1.0.0";
pub const MIN_COMPATIBLE: &str = "1.0.0";

/// Flush threshold for the streaming writer ("~32 MiB").
pub const FLUSH_THRESHOLD_BYTES: usize = 32 * 1024 * 1024;

fn parse_major_minor(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

pub(crate) fn is_schema_compatible(found: &str) -> bool {
    let (Some((found_major, found_minor)), Some((want_major, want_minor))) = (
        parse_major_minor(found),
        parse_major_minor(MIN_COMPATIBLE),
    ) else {
        return false;
    };
    let (reader_major, _) = parse_major_minor(SCHEMA_VERSION).expect("SCHEMA_VERSION is valid");
    found_major == reader_major && (found_major, found_minor) >= (want_major, want_minor)
}
