//! Method recommendation by group count.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::table::CanonicalTable;

/// The closed set of test procedures the engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureId {
    /// Two-sample t-test.
    TwoSample,
    /// One-way ANOVA.
    MultiGroupVariance,
    /// Tukey's HSD.
    PosthocPairwise,
    /// Permutation test on the absolute mean difference.
    Resampling,
    /// Normal-approximation posterior comparison.
    Probabilistic,
}

impl ProcedureId {
    pub const ALL: [ProcedureId; 5] = [
        ProcedureId::TwoSample,
        ProcedureId::MultiGroupVariance,
        ProcedureId::PosthocPairwise,
        ProcedureId::Resampling,
        ProcedureId::Probabilistic,
    ];

    /// User-facing label.
    pub fn display_name(self) -> &'static str {
        match self {
            ProcedureId::TwoSample => "T-Test",
            ProcedureId::MultiGroupVariance => "ANOVA",
            ProcedureId::PosthocPairwise => "Tukey's HSD",
            ProcedureId::Resampling => "Bootstrap",
            ProcedureId::Probabilistic => "Bayesian A/B",
        }
    }

    /// Looks up a procedure by its display name.
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.display_name() == name.trim())
    }
}

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Ordered list of applicable procedures, most relevant first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RecommendationSet(Vec<ProcedureId>);

impl RecommendationSet {
    pub fn as_slice(&self) -> &[ProcedureId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: ProcedureId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcedureId> + '_ {
        self.0.iter().copied()
    }
}

impl IntoIterator for RecommendationSet {
    type Item = ProcedureId;
    type IntoIter = std::vec::IntoIter<ProcedureId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Recommends procedures for a canonical table.
///
/// # Examples
/// ```
/// use u_abtest::recommend::{recommend, ProcedureId};
/// use u_abtest::table::CanonicalTable;
///
/// let t = CanonicalTable::from_groups(&[("a", &[1.0, 2.0][..]), ("b", &[3.0, 4.0][..])]).unwrap();
/// assert_eq!(recommend(&t).as_slice()[0], ProcedureId::TwoSample);
/// ```
pub fn recommend(table: &CanonicalTable) -> RecommendationSet {
    recommend_for_group_count(table.group_count())
}

/// Recommendation policy for `groups` distinct groups.
///
/// Resampling is listed for three or more groups even though the
/// permutation procedure itself only accepts two; running it there yields
/// a group-count error.
pub fn recommend_for_group_count(groups: usize) -> RecommendationSet {
    use ProcedureId::*;
    let ids = match groups {
        0 | 1 => Vec::new(),
        2 => vec![TwoSample, Resampling, Probabilistic],
        _ => vec![MultiGroupVariance, PosthocPairwise, Resampling],
    };
    RecommendationSet(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcedureId::*;

    #[test]
    fn test_policy() {
        assert!(recommend_for_group_count(0).is_empty());
        assert!(recommend_for_group_count(1).is_empty());
        assert_eq!(
            recommend_for_group_count(2).as_slice(),
            &[TwoSample, Resampling, Probabilistic]
        );
        for k in [3, 4, 10] {
            assert_eq!(
                recommend_for_group_count(k).as_slice(),
                &[MultiGroupVariance, PosthocPairwise, Resampling]
            );
        }
    }

    #[test]
    fn test_recommend_table() {
        let t = CanonicalTable::from_groups(&[
            ("x", &[1.0, 2.0][..]),
            ("y", &[3.0, 4.0][..]),
            ("z", &[5.0, 6.0][..]),
        ])
        .unwrap();
        let rec = recommend(&t);
        assert_eq!(rec.len(), 3);
        assert!(rec.contains(PosthocPairwise));
        assert!(!rec.contains(TwoSample));
    }

    #[test]
    fn test_display_names_round_trip() {
        for id in ProcedureId::ALL {
            assert_eq!(ProcedureId::from_display_name(&id.to_string()), Some(id));
        }
        assert_eq!(ProcedureId::from_display_name("Chi-Square"), None);
        assert_eq!(PosthocPairwise.to_string(), "Tukey's HSD");
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&recommend_for_group_count(2)).unwrap();
        assert_eq!(json, r#"["two_sample","resampling","probabilistic"]"#);
    }
}
