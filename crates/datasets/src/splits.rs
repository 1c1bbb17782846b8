//! Participant-level train/validation/test splits

use std::collections::{BTreeSet, HashMap};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};
use crate::trial::TrialRef;

const SPLIT_TOLERANCE: f64 = 1e-4;

/// Partitions trials into `fractions.len()` groups so that no participant appears in two groups.
///
/// Each group receives `floor(fraction * participants)` randomly chosen participants; whatever the
/// rounding leaves over goes to the first group. `fractions` must be non-negative and sum to 1.0.
/// Trials keep their input order within a group.
pub fn split_by_participant<'a, I, R>(
    trials: I,
    fractions: &[f64],
    rng: &mut R,
) -> DatasetResult<Vec<Vec<TrialRef<'a>>>>
where
    I: IntoIterator<Item = TrialRef<'a>>,
    R: Rng + ?Sized,
{
    validate_fractions(fractions)?;
    let trials: Vec<TrialRef<'a>> = trials.into_iter().collect();

    if fractions.len() == 1 {
        return Ok(vec![trials]);
    }

    let mut participants: Vec<u32> = trials
        .iter()
        .map(|t| t.participant_id())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let counts = participant_counts(fractions, participants.len());
    participants.shuffle(rng);

    let mut group_of = HashMap::with_capacity(participants.len());
    let mut remaining = participants.iter();
    for (group, &count) in counts.iter().enumerate() {
        for &participant in remaining.by_ref().take(count) {
            group_of.insert(participant, group);
        }
    }

    let mut groups = vec![Vec::new(); fractions.len()];
    for trial in trials {
        if let Some(&group) = group_of.get(&trial.participant_id()) {
            groups[group].push(trial);
        }
    }

    debug!(
        "Split {} participants into {:?} ({:?} trials)",
        participants.len(),
        counts,
        groups.iter().map(Vec::len).collect::<Vec<_>>()
    );
    Ok(groups)
}

fn validate_fractions(fractions: &[f64]) -> DatasetResult<()> {
    if fractions.is_empty() {
        return Err(DatasetError::Configuration(
            "at least one split fraction is required".to_string(),
        ));
    }
    if fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(DatasetError::Configuration(format!(
            "split fractions must be non-negative: {:?}",
            fractions
        )));
    }
    let total: f64 = fractions.iter().sum();
    if (1.0 - total).abs() > SPLIT_TOLERANCE {
        return Err(DatasetError::Configuration(format!(
            "split fractions must sum to 1.0, got {}",
            total
        )));
    }
    Ok(())
}

/// Participants per group; the rounding remainder is added to the first group.
fn participant_counts(fractions: &[f64], participants: usize) -> Vec<usize> {
    let mut counts: Vec<usize> = fractions
        .iter()
        .map(|f| (f * participants as f64) as usize)
        .collect();
    let assigned: usize = counts.iter().sum();
    if assigned < participants {
        counts[0] += participants - assigned;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_give_remainder_to_first_group() {
        assert_eq!(participant_counts(&[0.7, 0.15, 0.15], 10), vec![8, 1, 1]);
        assert_eq!(participant_counts(&[0.5, 0.5], 4), vec![2, 2]);
        // 0.33 * 3 truncates to 0
        assert_eq!(participant_counts(&[0.34, 0.33, 0.33], 3), vec![3, 0, 0]);
    }

    #[test]
    fn test_fraction_validation() {
        assert!(validate_fractions(&[1.0]).is_ok());
        assert!(validate_fractions(&[0.7, 0.2, 0.1]).is_ok());
        assert!(validate_fractions(&[0.33333, 0.33333, 0.33334]).is_ok());
        assert!(validate_fractions(&[]).is_err());
        assert!(validate_fractions(&[0.7, 0.2]).is_err());
        assert!(validate_fractions(&[1.2, -0.2]).is_err());
        assert!(validate_fractions(&[f64::NAN]).is_err());
    }
}
