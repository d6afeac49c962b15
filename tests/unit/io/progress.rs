//! Tests for stage progress bars

#[cfg(test)]
mod tests {
    use mosaictile::algorithm::regeneration::ProgressSink;
    use mosaictile::io::progress::ProgressManager;

    // Tests a stage bar tracks its position until finished
    // Verified by not advancing the bar in advance
    #[test]
    fn test_stage_position() {
        let mut pm = ProgressManager::hidden();
        assert!(pm.is_hidden());
        assert_eq!(pm.position(), None);

        pm.begin("split", 10);
        pm.advance(3);
        pm.advance(2);
        pm.set_message("halfway");
        assert_eq!(pm.position(), Some((5, 10)));

        pm.finish();
        assert_eq!(pm.position(), None);
    }

    // Tests beginning a stage replaces the previous one
    // Verified by keeping the first bar when a new stage begins
    #[test]
    fn test_begin_replaces_stage() {
        let mut pm = ProgressManager::hidden();

        pm.begin("split", 4);
        pm.advance(4);
        pm.begin("seed", 7);

        assert_eq!(pm.position(), Some((0, 7)));
        pm.finish();
        pm.finish();
        pm.clear();
    }

    // Tests calls without a running stage are ignored
    // Verified by panicking when no bar exists
    #[test]
    fn test_idle_calls_are_noops() {
        let mut pm = ProgressManager::default();

        pm.advance(1);
        pm.set_message("nothing");
        pm.finish();

        assert!(!pm.is_hidden());
        assert_eq!(pm.position(), None);
    }
}
