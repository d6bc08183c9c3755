use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{query_as, WikiApi, WikiError};

const SEARCH_LIMIT: &str = "3";

struct HintBucket {
    keywords: &'static [&'static str],
    hints: &'static [&'static str],
}

const HINT_BUCKETS: &[HintBucket] = &[
    // music
    HintBucket {
        keywords: &["band", "rock", "pop", "music", "singer", "artist", "rapper", "hip hop"],
        hints: &["musician", "band", "singer", "musical artist"],
    },
    // film and tv
    HintBucket {
        keywords: &["movie", "film", "actor", "actress", "star", "hollywood"],
        hints: &["actor", "actress", "film", "entertainer"],
    },
    // sports
    HintBucket {
        keywords: &[
            "sport", "athlete", "player", "olympic", "champion", "football", "basketball", "tennis",
        ],
        hints: &["athlete", "sportsperson", "player"],
    },
    // science
    HintBucket {
        keywords: &["scientist", "physicist", "nobel", "inventor", "researcher"],
        hints: &["scientist", "physicist", "researcher"],
    },
    // politics and royalty
    HintBucket {
        keywords: &["leader", "president", "monarch", "king", "queen", "politician"],
        hints: &["politician", "leader", "monarch"],
    },
];

/// Title qualifiers worth trying for items of this category, e.g. `"musician"`
/// for rock bands. The first bucket whose keyword occurs in the category wins.
pub fn category_hints(category: Option<&str>) -> &'static [&'static str] {
    let Some(category) = category.filter(|c| !c.is_empty()) else {
        return &[];
    };
    let lower = category.to_lowercase();
    HINT_BUCKETS
        .iter()
        .find(|bucket| bucket.keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|bucket| bucket.hints)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Matched,
    DisambiguationResolved,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMatch {
    pub title: String,
    pub search_query: String,
    pub strategy: MatchStrategy,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

async fn search_titles(api: &dyn WikiApi, query: &str, limit: &str) -> Result<Vec<String>, WikiError> {
    let envelope: SearchEnvelope = query_as(
        api,
        &[
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("srsearch", query.to_string()),
            ("srlimit", limit.to_string()),
        ],
    )
    .await?;
    Ok(envelope
        .query
        .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
        .unwrap_or_default())
}

/// Picks the page for `titles` (one search result list), if any is convincing.
fn choose_title(titles: &[String], item_lower: &str) -> Option<(String, MatchStrategy)> {
    let first = titles.first()?;
    let first_lower = first.to_lowercase();

    if first_lower.starts_with(item_lower) || first_lower.contains(item_lower) {
        return Some((first.clone(), MatchStrategy::Matched));
    }

    // A disambiguation page that does not name the item: look further down.
    if first_lower.contains("disambiguation") {
        return titles[1..]
            .iter()
            .find(|title| title.to_lowercase().contains(item_lower))
            .map(|title| (title.clone(), MatchStrategy::DisambiguationResolved));
    }
    None
}

/// Finds the Wikipedia page that best matches `item`.
///
/// Queries, in order: the bare name, the name with up to two category hints as
/// a parenthesised qualifier, and the name followed by the category. A final
/// unscored query takes whatever comes first. A failed search request moves
/// on to the next query; the failure is only returned when nothing matched.
pub async fn search_wikipedia_page(
    api: &dyn WikiApi,
    item: &str,
    category: Option<&str>,
) -> Result<Option<PageMatch>, WikiError> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let mut strategies = vec![item.to_string()];
    for hint in category_hints(category).iter().take(2) {
        strategies.push(format!("{} ({})", item, hint));
    }
    if let Some(category) = category {
        strategies.push(format!("{} {}", item, category));
    }

    let item_lower = item.to_lowercase();
    let mut last_error = None;

    for query in strategies {
        let titles = match search_titles(api, &query, SEARCH_LIMIT).await {
            Ok(titles) => titles,
            Err(err) => {
                warn!(%query, error = %err, "Wikipedia search failed, trying next query");
                last_error = Some(err);
                continue;
            }
        };
        if let Some((title, strategy)) = choose_title(&titles, &item_lower) {
            debug!(%query, %title, ?strategy, "Wikipedia page resolved");
            return Ok(Some(PageMatch {
                title,
                search_query: query,
                strategy,
            }));
        }
    }

    let fallback_query = match category {
        Some(category) => format!("{} {}", item, category),
        None => item.to_string(),
    };
    match search_titles(api, &fallback_query, "1").await {
        Ok(titles) => {
            if let Some(title) = titles.into_iter().next() {
                debug!(query = %fallback_query, %title, "Wikipedia page taken from fallback search");
                return Ok(Some(PageMatch {
                    title,
                    search_query: fallback_query,
                    strategy: MatchStrategy::Fallback,
                }));
            }
        }
        Err(err) => {
            warn!(query = %fallback_query, error = %err, "Wikipedia fallback search failed");
            last_error = Some(err);
        }
    }

    match last_error {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikipedia::testing::ScriptedWiki;
    use serde_json::json;

    fn hits(titles: &[&str]) -> serde_json::Value {
        let search: Vec<_> = titles.iter().map(|t| json!({"title": t})).collect();
        json!({"query": {"search": search}})
    }

    #[test]
    fn music_categories_hint_musicians() {
        assert!(category_hints(Some("80s rock bands")).contains(&"musician"));
        assert!(category_hints(Some("pop singers")).contains(&"singer"));
        assert!(category_hints(Some("hip hop artists")).contains(&"musical artist"));
    }

    #[test]
    fn other_buckets() {
        assert!(category_hints(Some("movie stars")).contains(&"actor"));
        assert!(category_hints(Some("Hollywood actors")).contains(&"actor"));
        assert!(category_hints(Some("Olympic athletes")).contains(&"athlete"));
        assert!(category_hints(Some("football players")).contains(&"player"));
        assert!(category_hints(Some("Nobel Prize scientists")).contains(&"scientist"));
        assert!(category_hints(Some("famous physicists")).contains(&"physicist"));
        assert!(category_hints(Some("world leaders")).contains(&"leader"));
        assert!(category_hints(Some("British monarchs")).contains(&"monarch"));
    }

    #[test]
    fn generic_and_empty_categories_have_no_hints() {
        assert!(category_hints(Some("car brands")).is_empty());
        assert!(category_hints(Some("dog breeds")).is_empty());
        assert!(category_hints(Some("")).is_empty());
        assert!(category_hints(None).is_empty());
    }

    #[test]
    fn hints_ignore_case() {
        let lower = category_hints(Some("rock bands"));
        assert_eq!(lower, category_hints(Some("ROCK BANDS")));
        assert_eq!(lower, category_hints(Some("Rock Bands")));
    }

    #[tokio::test]
    async fn exact_title_is_matched() {
        let wiki = ScriptedWiki::new(vec![hits(&["The Beatles"])]);
        let found = search_wikipedia_page(&wiki, "The Beatles", Some("rock bands"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "The Beatles");
        assert_eq!(found.search_query, "The Beatles");
        assert_eq!(found.strategy, MatchStrategy::Matched);
        assert_eq!(wiki.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_results_everywhere_is_no_match() {
        let wiki = ScriptedWiki::new(vec![hits(&[])]);
        let found = search_wikipedia_page(&wiki, "xyznonexistent123", Some("")).await.unwrap();
        assert!(found.is_none());
        // bare name plus the unscored fallback
        assert_eq!(wiki.calls().len(), 2);
    }

    #[tokio::test]
    async fn strategies_run_in_order() {
        let wiki = ScriptedWiki::new(vec![hits(&[])]);
        let found = search_wikipedia_page(&wiki, "Queen", Some("rock bands")).await.unwrap();
        assert!(found.is_none());
        let queries: Vec<String> = wiki
            .calls()
            .iter()
            .map(|params| params["srsearch"].clone())
            .collect();
        assert_eq!(
            queries,
            vec![
                "Queen",
                "Queen (musician)",
                "Queen (band)",
                "Queen rock bands",
                "Queen rock bands",
            ]
        );
        assert_eq!(wiki.calls()[4]["srlimit"], "1");
    }

    #[tokio::test]
    async fn disambiguation_page_defers_to_later_result() {
        let wiki = ScriptedWiki::new(vec![hits(&[
            "List of people known as the Purple One (disambiguation)",
            "Prince (musician)",
        ])]);
        let found = search_wikipedia_page(&wiki, "Prince", Some("80s musicians"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Prince (musician)");
        assert_eq!(found.strategy, MatchStrategy::DisambiguationResolved);
    }

    #[tokio::test]
    async fn name_match_wins_over_disambiguation_scan() {
        let wiki = ScriptedWiki::new(vec![hits(&["Mercury (disambiguation)", "Freddie Mercury"])]);
        let found = search_wikipedia_page(&wiki, "Mercury", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Mercury (disambiguation)");
        assert_eq!(found.strategy, MatchStrategy::Matched);
        assert_eq!(wiki.calls().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_disambiguation_tries_next_query() {
        let wiki = ScriptedWiki::new(vec![
            hits(&["Purple One (disambiguation)", "Purple rain"]),
            hits(&["Prince (musician)"]),
        ]);
        let found = search_wikipedia_page(&wiki, "Prince", Some("rock singers"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Prince (musician)");
        assert_eq!(found.search_query, "Prince (musician)");
        assert_eq!(found.strategy, MatchStrategy::Matched);
    }

    #[tokio::test]
    async fn hint_query_can_win() {
        let wiki = ScriptedWiki::new(vec![
            hits(&["Mercury (planet)"]),
            hits(&["Freddie Mercury"]),
        ]);
        let found = search_wikipedia_page(&wiki, "Freddie Mercury", Some("rock singers"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Freddie Mercury");
        assert_eq!(found.search_query, "Freddie Mercury (musician)");
    }

    #[tokio::test]
    async fn unconvincing_results_fall_back_to_first_hit() {
        let wiki = ScriptedWiki::new(vec![
            hits(&["Something else"]),
            hits(&["Something else"]),
            hits(&["Best guess"]),
        ]);
        let found = search_wikipedia_page(&wiki, "Zork", Some("games"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Best guess");
        assert_eq!(found.search_query, "Zork games");
        assert_eq!(found.strategy, MatchStrategy::Fallback);
    }

    #[tokio::test]
    async fn network_failure_surfaces_when_nothing_matched() {
        let wiki = ScriptedWiki::failing("connection refused");
        let outcome = search_wikipedia_page(&wiki, "Paris", None).await;
        assert!(matches!(outcome, Err(WikiError::Network(_))));
    }
}
