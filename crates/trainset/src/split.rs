//! Class balancing and train/validation/test splitting.

use mapping_common::{MappingError, MappingResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// Dataset subsets, in the order they are carved from each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subset {
    Test,
    Validation,
    Train,
}

impl Subset {
    pub const ALL: [Subset; 3] = [Subset::Train, Subset::Validation, Subset::Test];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Validation => "validation",
            Subset::Test => "test",
        }
    }
}

/// Positive and negative samples of one subset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassPair<T> {
    pub positive: Vec<T>,
    pub negative: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetSplit<T> {
    pub train: ClassPair<T>,
    pub validation: ClassPair<T>,
    pub test: ClassPair<T>,
}

impl<T> DatasetSplit<T> {
    pub fn subset(&self, subset: Subset) -> &ClassPair<T> {
        match subset {
            Subset::Train => &self.train,
            Subset::Validation => &self.validation,
            Subset::Test => &self.test,
        }
    }
}

/// Round half to even, matching the rounding used for split sizes.
fn round_count(x: f64) -> usize {
    x.round_ties_even().max(0.0) as usize
}

/// Split `samples` into (test, validation, train) with sizes computed from
/// `total` and clamped to what is available.
fn carve<T>(
    mut samples: Vec<T>,
    total: usize,
    test_size: f64,
    validation_size: f64,
) -> (Vec<T>, Vec<T>, Vec<T>) {
    let n_test = round_count(total as f64 * test_size).min(samples.len());
    let n_validation = round_count(total as f64 * validation_size).min(samples.len() - n_test);

    let train = samples.split_off(n_test + n_validation);
    let validation = samples.split_off(n_test);
    (samples, validation, train)
}

/// Shuffle both classes, balance them and split each into test,
/// validation and train subsets.
///
/// The number of positives kept is `min(|positives|, |negatives|)`; the
/// number of negatives is that count times `balancing_multiplier`, rounded
/// (capped by the negatives available). Subset sizes are
/// `round(kept * fraction)` per class, test first, then validation; the
/// remainder is train.
pub fn split_dataset<T, R: Rng + ?Sized>(
    mut positives: Vec<T>,
    mut negatives: Vec<T>,
    test_size: f64,
    validation_size: f64,
    balancing_multiplier: f64,
    rng: &mut R,
) -> MappingResult<DatasetSplit<T>> {
    if !(0.0..=1.0).contains(&test_size) || !(0.0..=1.0).contains(&validation_size) {
        return Err(MappingError::configuration(format!(
            "split fractions must be between 0 and 1, got test {} and validation {}",
            test_size, validation_size
        )));
    }
    if balancing_multiplier < 1.0 {
        return Err(MappingError::configuration(format!(
            "balancing multiplier must be at least 1, got {}",
            balancing_multiplier
        )));
    }

    if positives.len() >= negatives.len() {
        tracing::warn!(
            positives = positives.len(),
            negatives = negatives.len(),
            "There are at least as many positive samples as negative samples"
        );
    }

    positives.shuffle(rng);
    negatives.shuffle(rng);

    let n_positive = positives.len().min(negatives.len());
    let n_negative = round_count(n_positive as f64 * balancing_multiplier);
    positives.truncate(n_positive);
    negatives.truncate(n_negative);

    let (t_test, t_validation, t_train) = carve(positives, n_positive, test_size, validation_size);
    let (f_test, f_validation, f_train) = carve(negatives, n_negative, test_size, validation_size);

    tracing::info!(
        t_train = t_train.len(),
        t_validation = t_validation.len(),
        t_test = t_test.len(),
        f_train = f_train.len(),
        f_validation = f_validation.len(),
        f_test = f_test.len(),
        "Split dataset"
    );

    Ok(DatasetSplit {
        train: ClassPair {
            positive: t_train,
            negative: f_train,
        },
        validation: ClassPair {
            positive: t_validation,
            negative: f_validation,
        },
        test: ClassPair {
            positive: t_test,
            negative: f_test,
        },
    })
}
