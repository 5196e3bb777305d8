//! Version mediation: choosing a single winner among conflicting
//! version requests for the same logical artifact
//!
//! Policy, in order: a managed (pinned) version always wins; otherwise
//! the candidate at the smallest depth wins; ties are broken by the
//! smallest declaration index. No semantic version comparison is
//! performed; mediation is purely structural.

use crate::artifact::ArtifactKey;
use crate::error::{ResolveError, ResolveResult};
use std::fmt;

/// A version request observed during graph construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCandidate {
    pub version: String,
    /// Distance from the requesting project (direct dependency = 1)
    pub depth: usize,
    /// Position in the declaring dependency list, top to bottom
    pub declaration_index: usize,
    /// Whether this version was pinned by dependency management
    pub managed: bool,
}

impl VersionCandidate {
    /// Create an unmanaged candidate
    pub fn new(version: impl Into<String>, depth: usize, declaration_index: usize) -> Self {
        Self {
            version: version.into(),
            depth,
            declaration_index,
            managed: false,
        }
    }

    /// Create a managed (pinned) candidate
    pub fn managed(version: impl Into<String>, depth: usize, declaration_index: usize) -> Self {
        Self {
            version: version.into(),
            depth,
            declaration_index,
            managed: true,
        }
    }
}

/// Outcome of mediating one artifact key
#[derive(Debug, Clone, PartialEq)]
pub struct MediationOutcome {
    pub winner: VersionCandidate,
    pub losers: Vec<VersionCandidate>,
    /// Present when more than one distinct version was seen
    pub conflict: Option<ConflictRecord>,
}

/// Diagnostic record of a non-trivial mediation
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    pub key: ArtifactKey,
    pub winning_version: String,
    pub omitted_versions: Vec<String>,
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: selected {} (omitted for conflict: {})",
            self.key,
            self.winning_version,
            self.omitted_versions.join(", ")
        )
    }
}

/// Structural nearest-wins mediator
pub struct VersionMediator;

impl VersionMediator {
    /// Pick the winning candidate for `key` from `candidates`.
    ///
    /// Fails only when the candidate set is empty; conflicting versions
    /// are always mediable because the policy is a total order.
    pub fn mediate(
        key: &ArtifactKey,
        candidates: Vec<VersionCandidate>,
    ) -> ResolveResult<MediationOutcome> {
        if candidates.is_empty() {
            return Err(ResolveError::unresolvable(
                key.to_string(),
                "no candidate versions",
            ));
        }

        let winner_idx = Self::winner_index(&candidates);
        let winner = candidates[winner_idx].clone();

        let losers: Vec<VersionCandidate> = candidates
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != winner_idx)
            .map(|(_, c)| c)
            .collect();

        let mut omitted: Vec<String> = losers
            .iter()
            .map(|c| c.version.clone())
            .filter(|v| *v != winner.version)
            .collect();
        omitted.dedup();

        let conflict = if omitted.is_empty() {
            None
        } else {
            Some(ConflictRecord {
                key: key.clone(),
                winning_version: winner.version.clone(),
                omitted_versions: omitted,
            })
        };

        Ok(MediationOutcome {
            winner,
            losers,
            conflict,
        })
    }

    fn winner_index(candidates: &[VersionCandidate]) -> usize {
        let mut best = 0;
        for (i, candidate) in candidates.iter().enumerate().skip(1) {
            if Self::beats(candidate, &candidates[best]) {
                best = i;
            }
        }
        best
    }

    /// Whether `a` wins over `b` under the mediation policy
    fn beats(a: &VersionCandidate, b: &VersionCandidate) -> bool {
        if a.managed != b.managed {
            return a.managed;
        }
        if a.depth != b.depth {
            return a.depth < b.depth;
        }
        a.declaration_index < b.declaration_index
    }
}
