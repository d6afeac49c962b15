//! Tests for mutation proposals, application and greedy commits

#[cfg(test)]
mod tests {
    use mosaictile::algorithm::matcher::AppearanceMatcher;
    use mosaictile::algorithm::mutation::{
        Mutation, MutationKind, MutationOutcome, apply_mutation, mutate_leaf, propose_mutations,
    };
    use mosaictile::analysis::features::ImageFeatures;
    use mosaictile::math::geometry::{Point, Rect, RotationSet, Size};
    use mosaictile::math::probability::RandomSelector;
    use mosaictile::spatial::patch::{ImageGeometry, Patch};
    use mosaictile::spatial::tree::PatchTree;
    use ndarray::Array2;
    use std::collections::HashSet;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    // Source is dark on the left half and bright on the right; the target is bright
    fn half_bright_features() -> ImageFeatures {
        let source = Array2::from_shape_fn((10, 20), |(_, c)| if c < 10 { 0.0f32 } else { 1.0 });
        let target = Array2::from_elem((10, 10), 1.0f32);
        ImageFeatures::from_grey(&source, &target).expect("non-empty")
    }

    fn single_leaf_tree(source_x: f64) -> PatchTree {
        let geometry =
            ImageGeometry::new((20, 10), (10, 10), 1.0, RotationSet::identity()).expect("valid");
        let mut tree = PatchTree::new(geometry, 4, 4).expect("valid grid");
        let root = tree
            .add_root(Patch::new(
                Point::default(),
                Point::new(source_x, 0.0),
                Size::new(10.0, 10.0),
                0,
            ))
            .expect("empty tree");
        tree.register(root).expect("valid patch");
        tree
    }

    // Tests edge moves keep the opposite edge fixed in both spaces
    // Verified by growing the left edge from the right side
    #[test]
    fn test_extend_edges_upright() {
        let rotations = RotationSet::identity();
        let patch = Patch::new(Point::new(10.0, 10.0), Point::new(30.0, 40.0), Size::new(20.0, 10.0), 0);

        let right = apply_mutation(&patch, Mutation::new(MutationKind::ExtendRight, 5.0), &rotations)
            .expect("known rotation")
            .expect("not a no-op");
        assert_eq!(right.dimension, Size::new(25.0, 10.0));
        assert!(close(right.target_offset, patch.target_offset));
        assert!(close(right.source_offset, patch.source_offset));

        let left = apply_mutation(&patch, Mutation::new(MutationKind::ExtendLeft, 4.0), &rotations)
            .expect("known rotation")
            .expect("not a no-op");
        assert_eq!(left.dimension, Size::new(24.0, 10.0));
        assert!(close(left.target_offset, Point::new(6.0, 10.0)));
        assert!(close(left.source_offset, Point::new(26.0, 40.0)));

        let up = apply_mutation(&patch, Mutation::new(MutationKind::ExtendUp, -3.0), &rotations)
            .expect("known rotation")
            .expect("not a no-op");
        assert_eq!(up.dimension, Size::new(20.0, 7.0));
        assert!(close(up.target_offset, Point::new(10.0, 13.0)));
    }

    // Tests an edge move on a rotated patch grows the source along the rotated axis
    // Verified by growing the source footprint in the unrotated direction
    #[test]
    fn test_extend_right_follows_rotation() {
        let rotations = RotationSet::uniform(4).expect("four steps");
        let patch = Patch::new(Point::default(), Point::new(10.0, 10.0), Size::new(20.0, 10.0), 1);

        let grown = apply_mutation(&patch, Mutation::new(MutationKind::ExtendRight, 10.0), &rotations)
            .expect("known rotation")
            .expect("not a no-op");

        // The local x axis points down the source after a quarter turn
        assert!(close(grown.source_center(), Point::new(20.0, 20.0)));
        let bounds = grown.source_bounds(&rotations).expect("valid");
        assert!((bounds.min_y - 5.0).abs() < 1e-9 && (bounds.max_y - 35.0).abs() < 1e-9);
        assert!((bounds.min_x - 15.0).abs() < 1e-9 && (bounds.max_x - 25.0).abs() < 1e-9);
        assert!(close(grown.target_offset, patch.target_offset));
    }

    // Tests no-op and collapsing mutations yield no candidate
    // Verified by returning the sub-patch error for collapsed rectangles
    #[test]
    fn test_degenerate_mutations_are_skipped() {
        let identity = RotationSet::identity();
        let patch = Patch::new(Point::default(), Point::default(), Size::new(10.0, 10.0), 0);

        let zero = apply_mutation(&patch, Mutation::new(MutationKind::ShiftSourceX, 0.0), &identity);
        assert_eq!(zero.expect("known rotation"), None);
        let collapse = apply_mutation(&patch, Mutation::new(MutationKind::ExtendDown, -10.0), &identity);
        assert_eq!(collapse.expect("known rotation"), None);
        let spin = apply_mutation(&patch, Mutation::new(MutationKind::Rotate, 1.0), &identity);
        assert_eq!(spin.expect("known rotation"), None);
    }

    // Tests shifts only move the source and rotations wrap around the set
    // Verified by moving the target offset in shifted
    #[test]
    fn test_shift_and_rotate() {
        let rotations = RotationSet::uniform(4).expect("four steps");
        let patch = Patch::new(Point::new(1.0, 2.0), Point::new(3.0, 4.0), Size::new(10.0, 10.0), 0);

        let shifted = apply_mutation(&patch, Mutation::new(MutationKind::ShiftSourceY, -2.5), &rotations)
            .expect("known rotation")
            .expect("not a no-op");
        assert!(close(shifted.source_offset, Point::new(3.0, 1.5)));
        assert!(close(shifted.target_offset, patch.target_offset));

        let back = apply_mutation(&patch, Mutation::new(MutationKind::Rotate, -1.0), &rotations)
            .expect("known rotation")
            .expect("not a no-op");
        assert_eq!(back.rotation_index, 3);
        assert_eq!(back.source_offset, patch.source_offset);
    }

    // Tests proposals draw distinct kinds with amounts inside the step range
    // Verified by sampling kinds with replacement
    #[test]
    fn test_propose_mutations_distinct_and_bounded() {
        let mut selector = RandomSelector::new(7);

        let proposals = propose_mutations(&mut selector, 10, 5.0, 2);

        assert_eq!(proposals.len(), MutationKind::ALL.len());
        let kinds: HashSet<MutationKind> = proposals.iter().map(|m| m.kind).collect();
        assert_eq!(kinds.len(), proposals.len());
        for mutation in &proposals {
            if mutation.kind == MutationKind::Rotate {
                let steps = mutation.amount.abs();
                assert!(steps.fract() == 0.0 && (1.0..=2.0).contains(&steps));
            } else {
                assert!(mutation.amount != 0.0 && mutation.amount.abs() <= 5.0);
            }
        }

        let again = propose_mutations(&mut RandomSelector::new(7), 10, 5.0, 2);
        assert_eq!(again, proposals);
        assert_eq!(propose_mutations(&mut selector, 3, 5.0, 2).len(), 3);
    }

    // Tests the best legal candidate is committed and illegal ones are skipped
    // Verified by committing the first legal candidate instead of the best
    #[test]
    fn test_mutate_commits_best_legal_candidate() {
        let features = half_bright_features();
        let matcher = AppearanceMatcher::new(&features, vec![1.0, 0.0]).expect("valid");
        let mut tree = single_leaf_tree(0.0);
        let leaf = tree.leaves().first().copied().expect("root leaf");
        let mutations = [
            Mutation::new(MutationKind::ShiftSourceX, 5.0),
            Mutation::new(MutationKind::ShiftSourceX, 10.0),
            Mutation::new(MutationKind::ShiftSourceX, 15.0),
            Mutation::new(MutationKind::ExtendRight, 5.0),
        ];

        let outcome = mutate_leaf(&mut tree, leaf, &mutations, &matcher, 1.0).expect("live leaf");

        match outcome {
            MutationOutcome::Committed { kind, score } => {
                assert_eq!(kind, MutationKind::ShiftSourceX);
                assert!(score.abs() < 1e-12);
            }
            MutationOutcome::Unchanged => panic!("an improving shift was available"),
        }
        let patch = tree.patch(leaf).expect("leaf patch");
        assert!(close(patch.source_offset, Point::new(10.0, 0.0)));
        assert!(patch.matching.is_some_and(|m| m.abs() < 1e-12));
    }

    // Tests a worse candidate leaves the tree exactly as it was
    // Verified by committing whenever a legal candidate exists
    #[test]
    fn test_mutate_rejects_worse_candidate() {
        let features = half_bright_features();
        let matcher = AppearanceMatcher::new(&features, vec![1.0, 0.0]).expect("valid");
        let mut tree = single_leaf_tree(10.0);
        let leaf = tree.leaves().first().copied().expect("root leaf");
        let before = tree.clone();

        let outcome = mutate_leaf(
            &mut tree,
            leaf,
            &[Mutation::new(MutationKind::ShiftSourceX, -10.0)],
            &matcher,
            1.0,
        )
        .expect("live leaf");

        assert_eq!(outcome, MutationOutcome::Unchanged);
        assert_eq!(tree, before);
    }

    // Tests growing into a neighbouring leaf is rejected before scoring
    // Verified by ignoring every node in the placement check
    #[test]
    fn test_mutate_skips_overlapping_candidate() {
        let image = Array2::from_elem((20, 20), 0.5f32);
        let features = ImageFeatures::from_grey(&image, &image).expect("non-empty");
        let matcher = AppearanceMatcher::new(&features, vec![1.0, 1.0]).expect("valid");
        let geometry =
            ImageGeometry::new((20, 20), (20, 20), 1.0, RotationSet::identity()).expect("valid");
        let mut tree = PatchTree::new(geometry, 4, 4).expect("valid grid");
        let root = tree
            .add_root(Patch::new(Point::default(), Point::default(), Size::new(20.0, 10.0), 0))
            .expect("empty tree");
        let rotations = RotationSet::identity();
        let parent = *tree.patch(root).expect("root patch");
        let left = parent.sub_patch(&Rect::new(0.0, 0.0, 10.0, 10.0), &rotations).expect("valid");
        let right = parent.sub_patch(&Rect::new(10.0, 0.0, 20.0, 10.0), &rotations).expect("valid");
        let (l, r) = tree.add(root, left, right).expect("root is a leaf");
        tree.register(l).expect("valid");
        tree.register(r).expect("valid");
        let before = tree.clone();

        let outcome = mutate_leaf(
            &mut tree,
            l,
            &[Mutation::new(MutationKind::ExtendRight, 4.0)],
            &matcher,
            1.0,
        )
        .expect("live leaf");

        assert_eq!(outcome, MutationOutcome::Unchanged);
        assert_eq!(tree, before);
        assert!(mutate_leaf(&mut tree, root, &[], &matcher, 1.0).is_err());
    }
}
