use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::model::Question;

/// Returns the questions in a pseudo-random order determined by `seed`.
///
/// The same input and seed always produce the same order.
#[must_use]
pub fn permute(mut questions: Vec<Question>, seed: u64) -> Vec<Question> {
    let mut rng = StdRng::seed_from_u64(seed);
    questions.as_mut_slice().shuffle(&mut rng);
    questions
}

/// Draws a fresh seed for a new session.
#[must_use]
pub fn random_seed() -> u64 {
    rand::random()
}
