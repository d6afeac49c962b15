//! Tests for energy-guided leaf selection and cutting

#[cfg(test)]
mod tests {
    use mosaictile::algorithm::matcher::AppearanceMatcher;
    use mosaictile::algorithm::split::{
        Cut, SplitOutcome, SplitParams, cut_children, leaf_energy, rank_cuts, select_leaves,
        split_leaf,
    };
    use mosaictile::analysis::features::ImageFeatures;
    use mosaictile::math::correlation::Axis;
    use mosaictile::math::geometry::{Point, Rect, RotationSet, Size};
    use mosaictile::math::probability::RandomSelector;
    use mosaictile::spatial::grid::Space;
    use mosaictile::spatial::patch::{ImageGeometry, Patch};
    use mosaictile::spatial::tree::{NodeId, PatchTree};
    use ndarray::Array2;

    const SIDE: usize = 100;

    fn features_with_energy(energy: Array2<f32>) -> ImageFeatures {
        let image = Array2::from_elem((SIDE, SIDE), 0.5f32);
        ImageFeatures::from_grey(&image, &image)
            .and_then(|f| f.with_energy(energy))
            .expect("matching shapes")
    }

    fn column_energy(column: usize) -> Array2<f32> {
        Array2::from_shape_fn((SIDE, SIDE), |(_, c)| if c == column { 1.0f32 } else { 0.0 })
    }

    fn tree_with_root(patch: Patch) -> (PatchTree, NodeId) {
        let geometry =
            ImageGeometry::new((SIDE, SIDE), (SIDE, SIDE), 1.0, RotationSet::identity())
                .expect("valid");
        let mut tree = PatchTree::new(geometry, 8, 8).expect("valid grid");
        let root = tree.add_root(patch).expect("empty tree");
        tree.register(root).expect("valid root");
        (tree, root)
    }

    fn full_patch() -> Patch {
        Patch::new(Point::default(), Point::default(), Size::new(100.0, 100.0), 0)
    }

    fn params(min_dimension: f64) -> SplitParams {
        SplitParams {
            min_dimension,
            sampling_exponent: 1.0,
            alternate_axis_fallback: true,
        }
    }

    // Tests cuts are ranked by correlation and offsets are relative to the patch
    // Verified by reporting the cut offset in image coordinates
    #[test]
    fn test_rank_cuts_orders_by_score() {
        let energy = Array2::from_shape_fn((SIDE, SIDE), |(r, c)| {
            if c == 50 {
                1.0f32
            } else if r == 60 {
                0.5
            } else {
                0.0
            }
        });
        let features = features_with_energy(energy);
        let patch = Patch::new(Point::new(20.0, 0.0), Point::new(20.0, 0.0), Size::new(80.0, 100.0), 0);
        let (tree, _) = tree_with_root(patch);

        let cuts = rank_cuts(&patch, &tree, &features, 10.0).expect("inside target");

        assert_eq!(cuts.len(), 2);
        let first = cuts.first().expect("vertical cut");
        assert_eq!(first.axis, Axis::Vertical);
        assert!((first.offset_mm - 30.0).abs() < 1e-9);
        let second = cuts.get(1).expect("horizontal cut");
        assert_eq!(second.axis, Axis::Horizontal);
        assert!((second.offset_mm - 60.0).abs() < 1e-9);
        assert!(first.score > second.score);
    }

    // Tests cut children tile the parent in both spaces
    // Verified by giving both children the parent's source offset
    #[test]
    fn test_cut_children_tile_parent() {
        let rotations = RotationSet::identity();
        let patch = Patch::new(Point::new(10.0, 0.0), Point::new(5.0, 5.0), Size::new(40.0, 20.0), 0);
        let cut = Cut {
            axis: Axis::Horizontal,
            offset_mm: 8.0,
            score: 0.0,
        };

        let (top, bottom) = cut_children(&patch, &cut, &rotations).expect("valid cut");

        assert_eq!(top.target_bounds(), Rect::new(10.0, 0.0, 50.0, 8.0));
        assert_eq!(bottom.target_bounds(), Rect::new(10.0, 8.0, 50.0, 20.0));
        let top_source = top.source_bounds(&rotations).expect("valid");
        let bottom_source = bottom.source_bounds(&rotations).expect("valid");
        assert!((top_source.max_y - bottom_source.min_y).abs() < 1e-9);
        assert!((bottom_source.min_y - 13.0).abs() < 1e-9);
    }

    // Tests a split replaces the parent's grid entries with two scored children
    // Verified by leaving the parent registered after the split
    #[test]
    fn test_split_leaf_follows_energy_edge() {
        let features = features_with_energy(column_energy(30));
        let matcher = AppearanceMatcher::new(&features, vec![1.0, 0.5]).expect("valid");
        let (mut tree, root) = tree_with_root(full_patch());

        let outcome = split_leaf(&mut tree, root, &features, &matcher, &params(10.0)).expect("live leaf");

        let SplitOutcome::Split {
            parent,
            children: (left, right),
            axis,
            offset_mm,
        } = outcome
        else {
            panic!("expected a split, got {outcome:?}");
        };
        assert_eq!(parent, root);
        assert_eq!(axis, Axis::Vertical);
        assert!((offset_mm - 30.0).abs() < 1e-9);
        assert_eq!(
            tree.patch(left).map(Patch::target_bounds),
            Some(Rect::new(0.0, 0.0, 30.0, 100.0))
        );
        assert_eq!(
            tree.patch(right).map(Patch::target_bounds),
            Some(Rect::new(30.0, 0.0, 100.0, 100.0))
        );
        assert!(!tree.is_leaf(root));
        for space in Space::BOTH {
            assert!(tree.index().cells_containing(root.index(), space).is_empty());
            assert!(!tree.index().cells_containing(left.index(), space).is_empty());
        }
        assert!(tree.patch(left).and_then(|p| p.matching).is_some());
        assert!(tree.patch(right).and_then(|p| p.matching).is_some());
    }

    // Tests a leaf too small for two legal children is abandoned untouched
    // Verified by clamping the margin instead of giving up
    #[test]
    fn test_split_leaf_abandons_small_leaf() {
        let features = features_with_energy(column_energy(30));
        let matcher = AppearanceMatcher::new(&features, vec![1.0, 0.5]).expect("valid");
        let (mut tree, root) = tree_with_root(full_patch());
        let before = tree.clone();

        let outcome = split_leaf(&mut tree, root, &features, &matcher, &params(60.0)).expect("live leaf");

        assert_eq!(outcome, SplitOutcome::Abandoned { leaf: root });
        assert_eq!(tree, before);
    }

    // Tests only live leaves can be split
    // Verified by dropping the leaf check in split_leaf
    #[test]
    fn test_split_leaf_rejects_retired_node() {
        let features = features_with_energy(column_energy(30));
        let matcher = AppearanceMatcher::new(&features, vec![1.0, 0.5]).expect("valid");
        let (mut tree, root) = tree_with_root(full_patch());
        split_leaf(&mut tree, root, &features, &matcher, &params(10.0)).expect("first split");

        assert!(split_leaf(&mut tree, root, &features, &matcher, &params(10.0)).is_err());
    }

    // Tests energy sums and sampling favour the leaf with the energy
    // Verified by sampling with uniform weights
    #[test]
    fn test_select_leaves_prefers_energy() {
        let features = features_with_energy(column_energy(80));
        let (mut tree, root) = tree_with_root(full_patch());
        let cut = Cut {
            axis: Axis::Vertical,
            offset_mm: 50.0,
            score: 0.0,
        };
        let (left, right) =
            cut_children(&full_patch(), &cut, &RotationSet::identity()).expect("valid cut");
        tree.unregister(root).expect("valid root");
        let (l, r) = tree.add(root, left, right).expect("root is a leaf");
        tree.register(l).expect("valid");
        tree.register(r).expect("valid");

        assert!(leaf_energy(&tree, l, &features).expect("inside").abs() < f64::EPSILON);
        assert!((leaf_energy(&tree, r, &features).expect("inside") - 100.0).abs() < 1e-9);

        for seed in 0..8 {
            let mut selector = RandomSelector::new(seed);
            let picked = select_leaves(&tree, &features, &mut selector, 1, 1.0).expect("readable");
            assert_eq!(picked, vec![r]);
        }
        let mut selector = RandomSelector::new(3);
        let both = select_leaves(&tree, &features, &mut selector, 5, 2.0).expect("readable");
        assert_eq!(both.len(), 2);
    }
}
