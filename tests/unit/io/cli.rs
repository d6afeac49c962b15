//! Tests for command-line parsing and the end-to-end layout run

#[cfg(test)]
mod tests {
    use clap::Parser;
    use image::{Rgba, RgbaImage};
    use mosaictile::algorithm::seeding::SeedStrategy;
    use mosaictile::io::cli::{Cli, LayoutRunner, default_output_path};
    use mosaictile::io::configuration::{
        DEFAULT_CELL_SIZE_MM, DEFAULT_MUTATION_ROUNDS, DEFAULT_ROTATION_STEPS, DEFAULT_SEED,
    };
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    // Tests CLI parsing with only the two required image arguments
    // Verified by changing default values to ensure defaults are used
    #[test]
    fn test_cli_parse_minimal_args() {
        let cli = Cli::parse_from(["program", "wood.png", "face.png"]);

        assert_eq!(cli.source, PathBuf::from("wood.png"));
        assert_eq!(cli.target, PathBuf::from("face.png"));
        assert_eq!(cli.seed, DEFAULT_SEED);
        assert_eq!(cli.cell_size, DEFAULT_CELL_SIZE_MM);
        assert_eq!(cli.mutation_rounds, DEFAULT_MUTATION_ROUNDS);
        assert_eq!(cli.rotations, DEFAULT_ROTATION_STEPS);
        assert_eq!(cli.strategy, SeedStrategy::SalienceGreedy);
        assert!(cli.output.is_none());
        assert!(!cli.quiet);
    }

    // Tests CLI parsing with all available arguments
    // Verified by renaming a long flag
    #[test]
    fn test_cli_parse_all_args() {
        let cli = Cli::parse_from([
            "program",
            "wood.png",
            "face.png",
            "--seed",
            "123",
            "--px-per-mm",
            "2.5",
            "--cell-size",
            "40",
            "--splits",
            "2",
            "--split-rounds",
            "3",
            "--mutation-rounds",
            "7",
            "--samples",
            "5",
            "--strategy",
            "jittered",
            "--rotations",
            "8",
            "--output",
            "out/result.png",
            "--quiet",
        ]);

        assert_eq!(cli.seed, 123);
        assert!((cli.px_per_mm - 2.5).abs() < f64::EPSILON);
        assert!((cli.cell_size - 40.0).abs() < f64::EPSILON);
        assert_eq!((cli.splits, cli.split_rounds), (2, 3));
        assert_eq!((cli.mutation_rounds, cli.samples), (7, 5));
        assert_eq!(cli.strategy, SeedStrategy::Jittered);
        assert_eq!(cli.rotations, 8);
        assert_eq!(cli.output_path(), PathBuf::from("out/result.png"));
        assert!(!cli.should_show_progress());
    }

    // Tests short flag parsing
    // Verified by changing short flag definitions
    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "program", "a.png", "b.png", "-s", "9", "-c", "25", "-m", "2", "-r", "1", "-q",
        ]);

        assert_eq!(cli.seed, 9);
        assert!((cli.cell_size - 25.0).abs() < f64::EPSILON);
        assert_eq!(cli.mutation_rounds, 2);
        assert_eq!(cli.rotations, 1);
        assert!(cli.quiet);
    }

    // Tests output filename generation with suffix
    // Verified by changing the suffix format
    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("images/face.png")),
            PathBuf::from("images/face_mosaic.png")
        );
        assert_eq!(
            default_output_path(Path::new("face")),
            PathBuf::from("face_mosaic.png")
        );
        let cli = Cli::parse_from(["program", "wood.png", "dir/face.jpg"]);
        assert_eq!(cli.output_path(), PathBuf::from("dir/face_mosaic.jpg"));
    }

    // Tests a full run writes the composite and reports a tiled layout
    // Verified by skipping the export step
    #[test]
    fn test_runner_writes_composite() {
        let dir = TempDir::new().expect("temp dir");
        let source_path = dir.path().join("source.png");
        let target_path = dir.path().join("target.png");
        RgbaImage::from_fn(120, 120, |x, y| Rgba([(x * 2) as u8, (y * 2) as u8, 128, 255]))
            .save(&source_path)
            .expect("save source");
        RgbaImage::from_fn(60, 60, |x, y| Rgba([((x + y) * 2) as u8, 64, 32, 255]))
            .save(&target_path)
            .expect("save target");
        let output = dir.path().join("out").join("layout.png");
        let cli = Cli::parse_from([
            "program".into(),
            source_path.into_os_string(),
            target_path.into_os_string(),
            "--cell-size".into(),
            "20".into(),
            "--split-rounds".into(),
            "1".into(),
            "--mutation-rounds".into(),
            "1".into(),
            "--output".into(),
            output.clone().into_os_string(),
            "--quiet".into(),
        ]);

        let mut runner = LayoutRunner::new(cli);
        let summary = runner.run().expect("layout run");

        assert!(output.exists());
        assert_eq!(summary.leaves, 9 + summary.splits);
        assert!(summary.mean_score.is_some());
        let written = image::open(&output).expect("decodable").to_rgba8();
        assert_eq!(written.dimensions(), (60, 60));
    }

    // Tests a missing input image surfaces as an error
    // Verified by substituting a blank image for unreadable inputs
    #[test]
    fn test_runner_missing_input() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("nope.png");
        let cli = Cli::parse_from([
            "program".into(),
            missing.clone().into_os_string(),
            missing.into_os_string(),
            "--quiet".into(),
        ]);

        assert!(LayoutRunner::new(cli).run().is_err());
    }
}
