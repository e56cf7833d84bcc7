use std::borrow::Cow;
use std::str::from_utf8;

use csv::ByteRecord;

/// Why a dataset line did not make it into the mapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter,
)]
pub enum SkipReason {
    #[strum(serialize = "not valid utf-8")]
    Decode,
    #[strum(serialize = "no location field")]
    MissingDelimiter,
    #[strum(serialize = "no title")]
    EmptyTitle,
    #[strum(serialize = "location too generic")]
    TooGeneric,
}

/// One data line of `locations.list`, split but not yet interpreted.
#[derive(Debug, PartialEq)]
pub struct RawRecord<'a> {
    pub title: &'a str,
    pub location: Cow<'a, str>,
}

impl<'a> RawRecord<'a> {
    /// Everything after the first field is the location; IMDb spreads it over
    /// several tab-separated columns (padding, place, description) which are
    /// glued back together.
    pub fn from_fields(fields: &'a ByteRecord) -> Result<Self, SkipReason> {
        let mut decoded = fields.iter().map(from_utf8);
        let title = match decoded.next() {
            Some(Ok(title)) => title,
            Some(Err(_)) => return Err(SkipReason::Decode),
            None => return Err(SkipReason::MissingDelimiter),
        };
        let rest = decoded
            .collect::<Result<Vec<&str>, _>>()
            .map_err(|_| SkipReason::Decode)?;
        let location = match rest.as_slice() {
            [] => return Err(SkipReason::MissingDelimiter),
            [single] => Cow::Borrowed(*single),
            many => Cow::Owned(many.concat()),
        };
        Ok(RawRecord { title, location })
    }
}
