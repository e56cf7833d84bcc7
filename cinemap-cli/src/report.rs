use std::time::Duration;

use schemars::{schema_for, JsonSchema};
use serde::Serialize;

use cinemap_core::locations_db::LocationTitles;
use cinemap_core::search::{RankedLocation, UserLocation};

#[derive(Serialize, JsonSchema)]
pub struct RankReport {
    pub time: String,
    pub query: QueryJson,
    pub results: Vec<RankedJson>,
}

#[derive(Serialize, JsonSchema)]
pub struct QueryJson {
    pub raw: String,
    pub tags: Vec<String>,
}

#[derive(Serialize, JsonSchema)]
pub struct RankedJson {
    pub key: &'static str,
    pub score: u64,
    pub titles: Vec<&'static str>,
}

impl RankReport {
    pub fn new(
        user: &UserLocation,
        ranked: &[RankedLocation],
        db: &LocationTitles,
        elapsed: Duration,
    ) -> Self {
        let results = ranked
            .iter()
            .map(|r| RankedJson {
                key: r.key.as_str(),
                score: r.score,
                titles: db
                    .get(r.key.as_str())
                    .unwrap_or_default()
                    .iter()
                    .map(|t| t.as_str())
                    .collect(),
            })
            .collect();
        RankReport {
            time: format!("{:.2?}", elapsed),
            query: QueryJson {
                raw: user.raw.clone(),
                tags: user.tags.clone(),
            },
            results,
        }
    }
}

pub fn report_schema() -> serde_json::Result<String> {
    let schema = schema_for!(RankReport);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinemap_core::search::rank_scored;
    use ustr::Ustr;

    #[test]
    fn report_lists_titles_per_key() {
        let db: LocationTitles = [
            ("Bellecour Lyon France", Ustr::from("Show A")),
            ("Bellecour Lyon France", Ustr::from("Film B")),
        ]
        .into_iter()
        .collect();
        let user = UserLocation::from_raw_query("Lyon, France");
        let ranked = rank_scored(&user, &db);
        let report = RankReport::new(&user, &ranked, &db, Duration::from_millis(3));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["query"]["tags"], serde_json::json!(["Lyon", "France"]));
        assert_eq!(json["results"][0]["key"], "Bellecour Lyon France");
        assert_eq!(json["results"][0]["score"], 1);
        assert_eq!(json["results"][0]["titles"], serde_json::json!(["Show A", "Film B"]));
    }

    #[test]
    fn schema_names_the_report() {
        let schema = report_schema().unwrap();
        assert!(schema.contains("\"RankReport\""));
        assert!(schema.contains("\"results\""));
    }
}
