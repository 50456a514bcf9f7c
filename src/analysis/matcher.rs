//! Approximate tag-group lookup.
//!
//! The opportunity-cost tag group is workspace-provisioned and its exact
//! name is not guaranteed, so lookup fuzzy-matches the group name with a
//! conservative distance threshold instead of comparing exactly.

use crate::models::TagGroup;
use thiserror::Error;
use tracing::debug;

/// Default normalized-distance threshold for tag-group lookup.
/// Lower is stricter; 0.2 tolerates small typos without false positives.
pub const DEFAULT_THRESHOLD: f64 = 0.2;

/// Recoverable analysis failures. The caller decides whether a missing
/// tag group is fatal or the feature is silently skipped.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no tag group matching \"{search_term}\" within distance {threshold}")]
    TagGroupNotFound { search_term: String, threshold: f64 },
}

/// Normalized edit distance between two strings, in `[0, 1]`.
/// 0 = identical (ignoring case), 1 = nothing in common.
fn normalized_distance(a: &str, b: &str) -> f64 {
    1.0 - strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Find the candidate whose name is closest to `query`, provided the
/// distance clears `threshold`. Ties on distance keep the earliest
/// candidate in input order.
pub fn approx_match<'a, T>(
    query: &str,
    candidates: &'a [T],
    name_of: impl Fn(&T) -> &str,
    threshold: f64,
) -> Option<&'a T> {
    let mut best: Option<(&'a T, f64)> = None;

    for candidate in candidates {
        let distance = normalized_distance(query, name_of(candidate));
        if distance > threshold {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((candidate, distance)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Resolve the tag group for `search_term` among groups applicable to
/// `fact_sheet_type`.
pub fn resolve_tag_group<'a>(
    groups: &'a [TagGroup],
    search_term: &str,
    fact_sheet_type: &str,
    threshold: f64,
) -> Result<&'a TagGroup, AnalysisError> {
    let candidates: Vec<&TagGroup> = groups
        .iter()
        .filter(|g| g.applies_to(fact_sheet_type))
        .collect();

    debug!(
        "{} of {} tag groups apply to {}",
        candidates.len(),
        groups.len(),
        fact_sheet_type
    );

    approx_match(search_term, &candidates, |g| g.name.as_str(), threshold)
        .copied()
        .ok_or_else(|| AnalysisError::TagGroupNotFound {
            search_term: search_term.to_string(),
            threshold,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, name: &str, restrict: &[&str]) -> TagGroup {
        TagGroup {
            id: id.to_string(),
            name: name.to_string(),
            restrict_to_fact_sheet_types: restrict.iter().map(|s| s.to_string()).collect(),
            tags: vec![],
        }
    }

    #[test]
    fn test_exact_name_matches() {
        let groups = vec![group("tg-1", "Opportunity Cost", &[])];
        let found = resolve_tag_group(&groups, "Opportunity Cost", "Project", 0.2).unwrap();
        assert_eq!(found.id, "tg-1");
    }

    #[test]
    fn test_typo_within_threshold_matches() {
        let groups = vec![
            group("tg-1", "Transition Phase", &[]),
            group("tg-2", "Oportunity Cost", &[]),
        ];
        let found = resolve_tag_group(&groups, "Opportunity Cost", "Project", 0.2).unwrap();
        assert_eq!(found.id, "tg-2");
    }

    #[test]
    fn test_unrelated_names_rejected() {
        let groups = vec![group("tg-1", "Data Classification", &[])];
        let err = resolve_tag_group(&groups, "Opportunity Cost", "Project", 0.2).unwrap_err();
        assert!(matches!(err, AnalysisError::TagGroupNotFound { .. }));
    }

    #[test]
    fn test_restriction_filter_excludes_group() {
        let groups = vec![group("tg-1", "Opportunity Cost", &["Application"])];
        assert!(resolve_tag_group(&groups, "Opportunity Cost", "Project", 0.2).is_err());
        assert!(resolve_tag_group(&groups, "Opportunity Cost", "Application", 0.2).is_ok());
    }

    #[test]
    fn test_best_of_several_candidates_wins() {
        let groups = vec![
            group("tg-1", "Opportunity Costs", &[]),
            group("tg-2", "Opportunity Cost", &[]),
        ];
        let found = resolve_tag_group(&groups, "Opportunity Cost", "Project", 0.2).unwrap();
        assert_eq!(found.id, "tg-2");
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        // Same distance to the query from both names.
        let groups = vec![
            group("tg-1", "opportunity cost a", &[]),
            group("tg-2", "opportunity cost b", &[]),
        ];
        let found = resolve_tag_group(&groups, "opportunity cost x", "Project", 0.2).unwrap();
        assert_eq!(found.id, "tg-1");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let groups = vec![group("tg-1", "OPPORTUNITY COST", &[])];
        assert!(resolve_tag_group(&groups, "opportunity cost", "Project", 0.0).is_ok());
    }

    #[test]
    fn test_empty_candidates() {
        let groups: Vec<TagGroup> = vec![];
        assert!(resolve_tag_group(&groups, "Opportunity Cost", "Project", 0.2).is_err());
    }
}
