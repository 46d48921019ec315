//! Synthetic access traces with reference locality.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Weights for the first `window` pages, each half as likely as the last.
pub fn locality_weights(window: usize) -> Vec<f64> {
    (0..window).map(|page| 0.5f64.powi(page as i32)).collect()
}

/// Draw `access_count` logical addresses. Pages come from the geometric
/// locality distribution over `[0, window)`; offsets are uniform.
pub fn generate_trace<R: Rng>(
    rng: &mut R,
    access_count: usize,
    page_size: usize,
    window: usize,
) -> Vec<usize> {
    let pages = match WeightedIndex::new(locality_weights(window)) {
        Ok(dist) => dist,
        // Only an empty window gets here; every address lands on page 0.
        Err(_) => return (0..access_count).map(|_| rng.gen_range(0..page_size)).collect(),
    };

    (0..access_count)
        .map(|_| {
            let page = pages.sample(rng);
            let offset = rng.gen_range(0..page_size);
            page * page_size + offset
        })
        .collect()
}
