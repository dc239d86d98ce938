use super::lexicon;
use super::types::QueryIntent;
use crate::models::{FilterCondition, SortOrder};

/// Parse a free-text health question into a `QueryIntent`.
///
/// Total: every extraction step runs independently and simply leaves its field
/// unset when nothing matches.
pub fn parse_intent(text: &str) -> QueryIntent {
    let lower = text.trim().to_lowercase();

    QueryIntent {
        record_type: lexicon::match_record_type(&lower),
        metric: lexicon::match_metric(&lower),
        time_period: lexicon::match_time_period(&lower).map(String::from),
        attribute: lexicon::match_attribute(&lower).map(String::from),
        filter_condition: detect_filter(&lower),
        sort_order: detect_sort_order(&lower),
        raw_query: text.to_string(),
    }
}

/// Fixed priority: abnormal, then active, then recent.
fn detect_filter(text: &str) -> Option<FilterCondition> {
    [
        FilterCondition::Abnormal,
        FilterCondition::Active,
        FilterCondition::Recent,
    ]
    .into_iter()
    .find(|condition| text.contains(condition.as_str()))
}

fn detect_sort_order(text: &str) -> SortOrder {
    let ascending = ["ascending", "oldest first"];
    let descending = ["descending", "newest first", "most recent"];

    if ascending.iter().any(|cue| text.contains(cue)) {
        SortOrder::Asc
    } else if descending.iter().any(|cue| text.contains(cue)) {
        SortOrder::Desc
    } else {
        SortOrder::default()
    }
}
