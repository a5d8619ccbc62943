//! Process-wide random number generator.
//!
//! The multi-root solver restarts from random points and
//! `randomize` draws parameter values inside their ranges; all of them
//! share this single generator. Reproducible runs (tests, debugging a
//! solver trajectory) must call [`seed`] first.

use std::sync::Mutex;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

static GLOBAL_RNG: Mutex<Option<SmallRng>> = Mutex::new(None);

/// Seed the shared generator.
///
/// Call once at program start when reproducibility matters; without it the
/// generator is seeded from entropy on first use.
pub fn seed(seed: u64) {
    let mut guard = GLOBAL_RNG.lock().expect("rng mutex poisoned");
    *guard = Some(SmallRng::seed_from_u64(seed));
}

/// Run `f` with exclusive access to the shared generator.
pub(crate) fn with_rng<T>(f: impl FnOnce(&mut SmallRng) -> T) -> T {
    let mut guard = GLOBAL_RNG.lock().expect("rng mutex poisoned");
    let rng = guard.get_or_insert_with(SmallRng::from_entropy);
    f(rng)
}

/// Uniform draw in [min, max], the building block of every randomize.
pub(crate) fn uniform(min: f64, max: f64) -> f64 {
    with_rng(|rng| rng.gen_range(min..=max))
}
