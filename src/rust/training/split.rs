use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Index partition produced by [`stratified_split`]. Both lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partitions `labels` into train and held-out indices, preserving the
/// class proportions in both.
///
/// For each class (0, then 1) the indices are shuffled with a `StdRng`
/// seeded from `seed` and `round(n_class * test_ratio)` of them are held
/// out, never the whole class. The same labels, ratio and seed always give
/// the same partition.
pub fn stratified_split(labels: &[u8], test_ratio: f64, seed: u64) -> SplitIndices {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in 0..=1u8 {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let wanted = (members.len() as f64 * test_ratio).round() as usize;
        let held_out = wanted.min(members.len() - 1);
        test.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}
