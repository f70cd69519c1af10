use std::cmp::Ordering;

use super::service::QueryMatch;

/// Cosine similarity; `0.0` for empty, mismatched or zero-norm inputs.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Sorts descending by score, ties by id ascending, then keeps `top_k`.
pub fn rank_matches(mut matches: Vec<QueryMatch>, top_k: usize) -> Vec<QueryMatch> {
    matches.sort_by(|left, right| {
        right
            .score
            .partial_cmp(&left.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.id.cmp(&right.id))
    });
    matches.truncate(top_k);
    matches
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductMetadata;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    fn hit(id: &str, score: f32) -> QueryMatch {
        QueryMatch {
            id: id.to_string(),
            score,
            metadata: ProductMetadata::default(),
        }
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_or_degenerate_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn ranking_breaks_ties_by_id() {
        let ranked = rank_matches(
            vec![hit("product_b", 0.5), hit("product_c", 0.9), hit("product_a", 0.5)],
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["product_c", "product_a", "product_b"]);
    }

    #[test]
    fn ranking_truncates_to_top_k() {
        let ranked = rank_matches(vec![hit("a", 0.1), hit("b", 0.2), hit("c", 0.3)], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "c");
    }
}
