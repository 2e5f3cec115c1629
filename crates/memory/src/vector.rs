//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity plus the averaging the embedding strategy of
//! the router uses to compare one query against a labelled example set.

/// Cosine of the angle between `a` and `b`, in [-1, 1].
///
/// Degenerate input (empty, mismatched lengths, or a zero vector) scores 0.0
/// so that a broken embedding can never win a comparison.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    // Accumulate in f64: embedding dimensions run into the thousands
    let (dot, sq_a, sq_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (&x, &y)| {
        let (x, y) = (f64::from(x), f64::from(y));
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    let magnitude = (sq_a * sq_b).sqrt();
    if magnitude < 1e-10 {
        0.0
    } else {
        (dot / magnitude) as f32
    }
}

/// Mean cosine similarity between `query` and each of `examples`.
///
/// Returns `None` for an empty example set.
pub fn mean_similarity<V: AsRef<[f32]>>(query: &[f32], examples: &[V]) -> Option<f32> {
    if examples.is_empty() {
        return None;
    }
    let total: f32 = examples
        .iter()
        .map(|e| cosine_similarity(query, e.as_ref()))
        .sum();
    Some(total / examples.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn parallel_vectors_score_one_regardless_of_length() {
        assert!(close(cosine_similarity(&[0.2, 0.4, 0.4], &[1.0, 2.0, 2.0]), 1.0));
    }

    #[test]
    fn orthogonal_and_opposite() {
        assert!(close(cosine_similarity(&[0.0, 3.0], &[5.0, 0.0]), 0.0));
        assert!(close(cosine_similarity(&[1.0, -1.0], &[-2.0, 2.0]), -1.0));
    }

    #[test]
    fn forty_five_degrees() {
        let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 1.0]);
        assert!(close(sim, std::f32::consts::FRAC_1_SQRT_2));
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.3, 0.7]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn mean_over_examples() {
        let query = [1.0, 0.0];
        let examples = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(close(mean_similarity(&query, &examples).unwrap(), 0.5));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(mean_similarity(&[1.0], &empty).is_none());
    }

    #[test]
    fn mean_accepts_borrowed_slices() {
        let a = [0.0f32, 1.0];
        let examples: [&[f32]; 2] = [&a, &a];
        assert!(close(mean_similarity(&[0.0, 2.0], &examples).unwrap(), 1.0));
    }
}
