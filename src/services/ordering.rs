use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub(crate) fn new_seed() -> i64 {
    rand::random::<i64>()
}

/// Question order for a new attempt.
///
/// Canonical quizzes keep the assignment order. Randomized quizzes get a
/// Fisher-Yates permutation driven by `seed`, so the same seed always replays
/// the same paper.
pub(crate) fn freeze_order(assigned: &[String], randomize: bool, seed: i64) -> Vec<String> {
    let mut order = assigned.to_vec();
    if randomize {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        order.shuffle(&mut rng);
    }
    order
}
