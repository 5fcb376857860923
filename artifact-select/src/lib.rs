//! Winner selection for `artifact-select`.
//!
//! `Selector::select(candidates)` partitions candidates by logical key and
//! picks exactly one authoritative copy per group. Rules are applied in a
//! fixed order; each later rule only breaks ties left by the earlier ones:
//!
//! 1. explicit priority (trusted source tags)
//! 2. newest modification time
//! 3. largest size
//! 4. smallest absolute path
//!
//! The last rule is total over distinct paths, so the winner never depends on
//! input order. Selection reads no files.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use artifact_core::{
    CanonConfig, Candidate, CandidateGroup, LogicalKey, Select, SelectionError,
    SelectionReason, SelectionResult,
};

/// Rules in precedence order.
const RULES: [SelectionReason; 4] = [
    SelectionReason::ExplicitPriority,
    SelectionReason::Newest,
    SelectionReason::Largest,
    SelectionReason::LexicalTiebreak,
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One group member with its position in the ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub candidate: Candidate,
    pub trusted: bool,
    /// Rule that put the winner ahead of this member. `None` for the winner.
    pub lost_on: Option<SelectionReason>,
}

/// Ranks candidate groups.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    trusted: BTreeSet<String>,
}

impl Selector {
    pub fn new<I, S>(trusted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted: trusted.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &CanonConfig) -> Self {
        Self::new(config.trusted_source_tags.iter().cloned())
    }

    pub fn is_trusted(&self, candidate: &Candidate) -> bool {
        self.trusted.contains(&candidate.source_tag.0)
    }

    /// Total order over candidates. `Less` means `a` ranks ahead of `b`.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        RULES
            .iter()
            .map(|rule| self.compare_on(*rule, a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn compare_on(&self, rule: SelectionReason, a: &Candidate, b: &Candidate) -> Ordering {
        match rule {
            SelectionReason::ExplicitPriority => self.is_trusted(b).cmp(&self.is_trusted(a)),
            SelectionReason::Newest => b.modified_time.cmp(&a.modified_time),
            SelectionReason::Largest => b.size_bytes.cmp(&a.size_bytes),
            SelectionReason::LexicalTiebreak => {
                a.absolute_path.as_os_str().cmp(b.absolute_path.as_os_str())
            }
            SelectionReason::SoleCandidate => Ordering::Equal,
        }
    }

    /// First rule on which `winner` and `other` differ.
    fn separating_rule(&self, winner: &Candidate, other: &Candidate) -> SelectionReason {
        RULES
            .iter()
            .copied()
            .find(|rule| self.compare_on(*rule, winner, other).is_ne())
            .unwrap_or(SelectionReason::LexicalTiebreak)
    }

    /// Full ordering of a group, winner first.
    pub fn rank(&self, group: &CandidateGroup) -> Vec<Ranked> {
        let mut ordered: Vec<&Candidate> = group.members().iter().collect();
        ordered.sort_by(|a, b| self.compare(a, b));

        let Some(winner) = ordered.first().copied() else {
            return vec![];
        };
        ordered
            .iter()
            .enumerate()
            .map(|(i, candidate)| Ranked {
                candidate: (*candidate).clone(),
                trusted: self.is_trusted(candidate),
                lost_on: (i > 0).then(|| self.separating_rule(winner, candidate)),
            })
            .collect()
    }

    /// Pick the winner of one group.
    ///
    /// The reason is the rule at which the winner became the only survivor,
    /// i.e. the latest separating rule across all losers.
    pub fn select_group(&self, group: CandidateGroup) -> SelectionResult {
        let key = group.key().clone();
        let mut members = group.into_members();

        let winner_at = members
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| self.compare(a, b))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let winner = members.remove(winner_at);

        let reason = members
            .iter()
            .map(|loser| self.separating_rule(&winner, loser))
            .max_by_key(|rule| precedence(*rule))
            .unwrap_or(SelectionReason::SoleCandidate);

        tracing::debug!(
            "{key}: {} wins over {} other(s) ({reason})",
            winner.absolute_path.display(),
            members.len()
        );
        SelectionResult {
            logical_key: key,
            winner,
            losers: members,
            reason,
        }
    }
}

impl Select for Selector {
    fn select(&self, candidates: Vec<Candidate>) -> Result<Vec<SelectionResult>, SelectionError> {
        let groups = group_candidates(candidates)?;
        let results: Vec<SelectionResult> =
            groups.into_values().map(|g| self.select_group(g)).collect();
        let contested = results.iter().filter(|r| !r.losers.is_empty()).count();
        tracing::info!(
            "selected {} winner(s), {contested} from competing copies",
            results.len()
        );
        Ok(results)
    }
}

/// Partition candidates by logical key.
pub fn group_candidates(
    candidates: Vec<Candidate>,
) -> Result<BTreeMap<LogicalKey, CandidateGroup>, SelectionError> {
    let mut by_key: BTreeMap<LogicalKey, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        by_key
            .entry(candidate.logical_key.clone())
            .or_default()
            .push(candidate);
    }
    by_key
        .into_iter()
        .map(|(key, members)| {
            CandidateGroup::from_members(key.clone(), members).map(|group| (key, group))
        })
        .collect()
}

fn precedence(rule: SelectionReason) -> usize {
    RULES.iter().position(|r| *r == rule).unwrap_or(RULES.len())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_core::SourceTag;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::path::PathBuf;

    fn candidate(path: &str, tag: &str, minute: u32, size: u64) -> Candidate {
        Candidate {
            logical_key: LogicalKey::parse("report.md").unwrap(),
            absolute_path: PathBuf::from(path),
            size_bytes: size,
            modified_time: Utc.with_ymd_and_hms(2025, 3, 1, 10, minute, 0).unwrap(),
            content_hash: None,
            source_tag: SourceTag::from(tag),
        }
    }

    fn group(members: Vec<Candidate>) -> CandidateGroup {
        CandidateGroup::from_members(LogicalKey::parse("report.md").unwrap(), members).unwrap()
    }

    #[test]
    fn single_member_is_sole_candidate() {
        let result = Selector::default().select_group(group(vec![candidate("/a", "r", 0, 1)]));
        assert_eq!(result.reason, SelectionReason::SoleCandidate);
        assert!(result.losers.is_empty());
        assert_eq!(result.candidate_count(), 1);
    }

    #[rstest]
    #[case::newest(
        vec![candidate("/a", "r1", 0, 100), candidate("/b", "r2", 5, 100)],
        "/b",
        SelectionReason::Newest
    )]
    #[case::largest(
        vec![candidate("/a", "r1", 0, 100), candidate("/b", "r2", 0, 200)],
        "/b",
        SelectionReason::Largest
    )]
    #[case::lexical(
        vec![candidate("/b", "r1", 0, 100), candidate("/a", "r2", 0, 100)],
        "/a",
        SelectionReason::LexicalTiebreak
    )]
    #[case::recency_beats_size(
        vec![candidate("/a", "r1", 5, 10), candidate("/b", "r2", 0, 900)],
        "/a",
        SelectionReason::Newest
    )]
    fn rules_pick_expected_winner(
        #[case] members: Vec<Candidate>,
        #[case] winner: &str,
        #[case] reason: SelectionReason,
    ) {
        let result = Selector::default().select_group(group(members));
        assert_eq!(result.winner.absolute_path, PathBuf::from(winner));
        assert_eq!(result.reason, reason);
    }

    #[test]
    fn trusted_tag_beats_newer_candidate() {
        let selector = Selector::new(["curated"]);
        let result = selector.select_group(group(vec![
            candidate("/a", "curated", 0, 10),
            candidate("/b", "nightly", 30, 10),
        ]));
        assert_eq!(result.winner.source_tag.0, "curated");
        assert_eq!(result.reason, SelectionReason::ExplicitPriority);
    }

    #[test]
    fn priority_ignored_when_all_trusted() {
        let selector = Selector::new(["r1", "r2"]);
        let result = selector.select_group(group(vec![
            candidate("/a", "r1", 0, 10),
            candidate("/b", "r2", 1, 10),
        ]));
        assert_eq!(result.winner.absolute_path, PathBuf::from("/b"));
        assert_eq!(result.reason, SelectionReason::Newest);
    }

    #[test]
    fn reason_is_latest_rule_needed() {
        // Priority eliminates /c; recency then separates /b from /a.
        let selector = Selector::new(["t"]);
        let result = selector.select_group(group(vec![
            candidate("/a", "t", 0, 10),
            candidate("/b", "t", 9, 10),
            candidate("/c", "u", 59, 10),
        ]));
        assert_eq!(result.winner.absolute_path, PathBuf::from("/b"));
        assert_eq!(result.reason, SelectionReason::Newest);
    }

    #[test]
    fn losers_are_sorted_by_path() {
        let result = Selector::default().select_group(group(vec![
            candidate("/c", "r", 0, 1),
            candidate("/z", "r", 9, 1),
            candidate("/a", "r", 0, 1),
        ]));
        let losers: Vec<_> = result.losers.iter().map(|c| c.absolute_path.clone()).collect();
        assert_eq!(losers, vec![PathBuf::from("/a"), PathBuf::from("/c")]);
    }

    #[test]
    fn rank_explains_each_loser() {
        let selector = Selector::new(["t"]);
        let ranking = selector.rank(&group(vec![
            candidate("/a", "t", 0, 10),
            candidate("/b", "u", 9, 10),
            candidate("/c", "t", 0, 5),
        ]));
        let lost_on: Vec<_> = ranking.iter().map(|r| r.lost_on).collect();
        assert_eq!(
            lost_on,
            vec![
                None,
                Some(SelectionReason::Largest),
                Some(SelectionReason::ExplicitPriority),
            ]
        );
        assert!(ranking[0].trusted);
        assert!(!ranking[2].trusted);
    }

    #[test]
    fn grouping_sorts_keys() {
        let mut other = candidate("/x", "r", 0, 1);
        other.logical_key = LogicalKey::parse("a/first.md").unwrap();
        let groups = group_candidates(vec![candidate("/a", "r", 0, 1), other]).unwrap();
        let keys: Vec<_> = groups.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a/first.md", "report.md"]);
    }
}
