use smallvec::SmallVec;

use crate::strip_punctuation;

pub type Tags<'a> = SmallVec<[&'a str; 8]>;

/// Drops the trailing `(description)` of a location field.
pub fn strip_description(location: &str) -> &str {
    let place = match location.find('(') {
        Some(idx) => &location[..idx],
        None => location,
    };
    place.trim()
}

pub fn segment_count(location: &str) -> usize {
    location.split(',').count()
}

/// Builds the mapping key for a raw location field, or `None` when the place
/// is too vague (fewer than `min_segments` comma-separated parts) to be found
/// on a map.
pub fn canonical_location(raw: &str, min_segments: usize) -> Option<String> {
    let place = strip_description(raw);
    if place.is_empty() || segment_count(place) < min_segments {
        return None;
    }
    let canonical = strip_punctuation(place);
    let canonical = canonical.trim();
    match canonical.is_empty() {
        true => None,
        false => Some(canonical.to_string()),
    }
}

/// Tags of a canonical location, least specific (country) first.
pub fn key_tags(key: &str) -> Tags<'_> {
    key.split_whitespace().rev().collect()
}
