//! Tests for seeded random selection

#[cfg(test)]
mod tests {
    use mosaictile::math::probability::RandomSelector;

    // Tests equal seeds produce equal choice sequences
    // Verified by seeding from entropy
    #[test]
    fn test_selector_is_deterministic() {
        let weights = [0.1, 0.5, 0.2, 0.2];
        let mut a = RandomSelector::new(7);
        let mut b = RandomSelector::new(7);

        let seq_a: Vec<usize> = (0..50).map(|_| a.weighted_choice(&weights)).collect();
        let seq_b: Vec<usize> = (0..50).map(|_| b.weighted_choice(&weights)).collect();
        assert_eq!(seq_a, seq_b);
    }

    // Tests zero and negative weights are never chosen while a positive one exists
    // Verified by subtracting non-positive weights from the running total
    #[test]
    fn test_weighted_choice_skips_non_positive() {
        let weights = [0.0, -3.0, 2.0, 0.0];
        let mut selector = RandomSelector::new(3);

        for _ in 0..200 {
            assert_eq!(selector.weighted_choice(&weights), 2);
        }
    }

    // Tests all-zero weights fall back to a uniform choice in range
    // Verified by returning weights.len() from the fallback
    #[test]
    fn test_weighted_choice_all_zero_is_uniform() {
        let weights = [0.0; 5];
        let mut selector = RandomSelector::new(11);

        let mut seen = [false; 5];
        for _ in 0..500 {
            let pick = selector.weighted_choice(&weights);
            assert!(pick < 5);
            seen[pick] = true;
        }
        assert!(seen.iter().all(|&s| s), "uniform fallback should reach every index");
    }

    // Tests weighted sampling returns distinct indices and caps at the population
    // Verified by not removing the chosen index
    #[test]
    fn test_weighted_sample_without_replacement() {
        let weights = [5.0, 1.0, 1.0];
        let mut selector = RandomSelector::new(19);

        let mut sample = selector.weighted_sample(&weights, 10);
        assert_eq!(sample.len(), 3);
        sample.sort_unstable();
        assert_eq!(sample, vec![0, 1, 2]);
        assert!(selector.weighted_sample(&weights, 0).is_empty());
    }

    // Tests heavier weights are drawn first more often
    // Verified by ignoring weights in weighted_sample
    #[test]
    fn test_weighted_sample_prefers_heavy_items() {
        let weights = [100.0, 1.0, 1.0, 1.0];
        let mut selector = RandomSelector::new(23);

        let first_heavy = (0..200)
            .filter(|_| selector.weighted_sample(&weights, 1) == vec![0])
            .count();
        assert!(first_heavy > 150, "heavy item drawn first only {first_heavy} times");
    }

    // Tests uniform draws stay in range and degenerate intervals return the low end
    // Verified by returning high for empty intervals
    #[test]
    fn test_uniform_and_index_bounds() {
        let mut selector = RandomSelector::new(5);

        for _ in 0..100 {
            let v = selector.uniform(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&v));
            assert!(selector.index(4) < 4);
        }
        assert!((selector.uniform(1.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert_eq!(selector.index(0), 0);
    }
}
