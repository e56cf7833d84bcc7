use rayon::prelude::*;
use serde::Serialize;
use ustr::Ustr;

use crate::is_numeric_tag;
use crate::location::{key_tags, Tags};
use crate::locations_db::LocationTitles;

/// A place as the user (or the reverse geocoder) spells it,
/// most specific tag first: `"Lyon, Rhone, France"`.
/// Empty parts such as the middle of `"Lviv, , Ukraine"` keep their position
/// but never match.
#[derive(Debug, Clone, Serialize)]
pub struct UserLocation {
    pub raw: String,
    pub tags: Vec<String>,
}

impl UserLocation {
    pub fn from_raw_query(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let tags = if raw.trim().is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(|t| t.trim().to_string()).collect()
        };
        UserLocation { raw, tags }
    }

    /// Country first; the position of a tag here is its weight.
    pub fn weighted_tags(&self) -> Tags<'_> {
        self.tags.iter().rev().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankedLocation {
    pub key: Ustr,
    pub score: u64,
}

/// Sums the positions (in `user`, least specific first) of every
/// non-empty, non-numeric user tag that also appears in `subject`.
/// `None` means the two share no tag at all; `Some(0)` is a country-only match.
pub fn score_tags(user: &[&str], subject: &[&str]) -> Option<u64> {
    user.iter()
        .enumerate()
        .filter(|&(_, tag)| !tag.is_empty() && !is_numeric_tag(tag))
        .filter(|&(_, tag)| subject.contains(tag))
        .fold(None, |score, (i, _)| Some(score.unwrap_or(0) + i as u64))
}

/// Every overlapping key with its score, best first. Equal scores keep the
/// mapping's insertion order.
pub fn rank_scored(user: &UserLocation, db: &LocationTitles) -> Vec<RankedLocation> {
    let user_tags = user.weighted_tags();
    let mut res = db
        .keys()
        .filter_map(|key| {
            let subject = key_tags(key.as_str());
            score_tags(&user_tags, &subject).map(|score| RankedLocation { key, score })
        })
        .collect::<Vec<_>>();
    res.sort_by(|a, b| b.score.cmp(&a.score));
    res
}

pub fn rank(user: &UserLocation, db: &LocationTitles) -> Vec<Ustr> {
    rank_scored(user, db).into_iter().map(|r| r.key).collect()
}

/// Ranks independent queries in parallel against one mapping.
pub fn rank_batch(users: &[UserLocation], db: &LocationTitles) -> Vec<Vec<Ustr>> {
    users.par_iter().map(|user| rank(user, db)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(keys: &[&str]) -> LocationTitles {
        let mut db = LocationTitles::default();
        for key in keys {
            db.insert(key, Ustr::from("Film"));
        }
        db
    }

    fn ranked(query: &str, db: &LocationTitles) -> Vec<&'static str> {
        rank(&UserLocation::from_raw_query(query), db)
            .into_iter()
            .map(|k| k.as_str())
            .collect()
    }

    #[test]
    fn user_tags_are_trimmed() {
        let user = UserLocation::from_raw_query("Lviv,  Lviv Oblast , Ukraine");
        assert_eq!(user.tags, vec!["Lviv", "Lviv Oblast", "Ukraine"]);
        assert_eq!(user.weighted_tags().as_slice(), &["Ukraine", "Lviv Oblast", "Lviv"]);
        assert!(UserLocation::from_raw_query("  ").tags.is_empty());
    }

    #[test]
    fn empty_parts_keep_their_position() {
        let user = UserLocation::from_raw_query("Lviv, , Ukraine");
        assert_eq!(user.weighted_tags().as_slice(), &["Ukraine", "", "Lviv"]);
        let db = db(&["Rynok Lviv Ukraine"]);
        assert_eq!(
            rank_scored(&user, &db),
            vec![RankedLocation { key: "Rynok Lviv Ukraine".into(), score: 2 }]
        );
        assert_eq!(score_tags(&["", "Lviv"], &[""]), None);
    }

    #[test]
    fn score_is_sum_of_positions() {
        // positions: France=0, Rhone=1, Lyon=2
        let user = ["France", "Rhone", "Lyon"];
        assert_eq!(score_tags(&user, &["France", "Rhone", "Lyon"]), Some(3));
        assert_eq!(score_tags(&user, &["France", "Paris"]), Some(0));
        assert_eq!(score_tags(&user, &["Japan", "Tokyo"]), None);
    }

    #[test]
    fn numeric_tags_never_score() {
        let user = ["France", "69001", "Lyon"];
        assert_eq!(score_tags(&user, &["69001", "Lyon"]), Some(2));
        assert_eq!(score_tags(&["75001", "2020"], &["75001", "2020"]), None);
    }

    #[test]
    fn more_specific_match_ranks_first() {
        let db = db(&["Gare Paris France", "Bellecour Lyon France"]);
        assert_eq!(
            ranked("Lyon, Auvergne-Rhone-Alpes, France", &db),
            vec!["Bellecour Lyon France", "Gare Paris France"]
        );
    }

    #[test]
    fn country_only_match_is_kept() {
        let db = db(&["Gare Paris France"]);
        let res = rank_scored(&UserLocation::from_raw_query("Lyon, France"), &db);
        assert_eq!(res, vec![RankedLocation { key: "Gare Paris France".into(), score: 0 }]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let db = db(&["B Lyon France", "A Lyon France", "C Lyon France"]);
        assert_eq!(
            ranked("Lyon, France", &db),
            vec!["B Lyon France", "A Lyon France", "C Lyon France"]
        );
    }

    #[test]
    fn empty_inputs() {
        assert!(ranked("Lyon, France", &LocationTitles::default()).is_empty());
        assert!(ranked("75001, 2020", &db(&["75001 2020 Paris"])).is_empty());
        assert!(ranked("", &db(&["Lyon Rhone France"])).is_empty());
    }

    #[test]
    fn batch_matches_single_queries() {
        let db = db(&["Bellecour Lyon France", "Shibuya Tokyo Japan"]);
        let users = vec![
            UserLocation::from_raw_query("Tokyo, Japan"),
            UserLocation::from_raw_query("Lyon, France"),
            UserLocation::from_raw_query("Lima, Peru"),
        ];
        let batch = rank_batch(&users, &db);
        let single: Vec<_> = users.iter().map(|u| rank(u, &db)).collect();
        assert_eq!(batch, single);
        assert_eq!(batch[0], vec![Ustr::from("Shibuya Tokyo Japan")]);
        assert!(batch[2].is_empty());
    }
}
