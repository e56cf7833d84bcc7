pub use rayon;
pub use smallvec;
pub use ustr;

pub mod coordinates;
pub mod error;
pub mod location;
pub mod locations_db;
pub mod record;
pub mod search;
pub mod title;

/// Last line of the `locations.list` header block.
pub const HEADER_SENTINEL: &str = "==============";
pub const FIELD_DELIMITER: u8 = b'\t';
/// A location needs at least this many comma-separated parts to be placed on a map.
pub const MIN_LOCATION_SEGMENTS: usize = 3;

/// Removes every ASCII punctuation character, leaving spacing untouched.
pub fn strip_punctuation(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

/// Postal codes and years carry no place name, so they never count as tags.
pub fn is_numeric_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(char::is_numeric)
}
