#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    /// Rust files under `root`, relative to it
    fn rust_files(root: &Path) -> io::Result<BTreeSet<PathBuf>> {
        let mut found = BTreeSet::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "rs") {
                    let relative = path.strip_prefix(root).map_err(io::Error::other)?;
                    found.insert(relative.to_path_buf());
                }
            }
        }
        Ok(found)
    }

    fn declares_modules_only(path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == "main.rs" || name == "lib.rs" || name == "mod.rs")
    }

    fn listing(paths: &[&PathBuf]) -> String {
        paths
            .iter()
            .map(|path| format!("  - {}", path.display()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_src_and_unit_tests_mirror_each_other() {
        let sources = rust_files(Path::new("src")).expect("readable src");
        let units = rust_files(Path::new("tests/unit")).expect("readable tests/unit");

        let untested: Vec<_> = sources
            .iter()
            .filter(|path| !declares_modules_only(path) && !units.contains(*path))
            .collect();
        assert!(
            untested.is_empty(),
            "src files without tests/unit counterparts:\n{}",
            listing(&untested)
        );

        let orphaned: Vec<_> = units
            .iter()
            .filter(|path| !declares_modules_only(path) && !sources.contains(*path))
            .collect();
        assert!(
            orphaned.is_empty(),
            "tests/unit files without src counterparts:\n{}",
            listing(&orphaned)
        );
    }

    #[test]
    fn test_every_test_file_has_tests() {
        let root = Path::new("tests");
        let mut empty = Vec::new();
        for path in rust_files(root).expect("readable tests") {
            if declares_modules_only(&path) {
                continue;
            }
            let content = fs::read_to_string(root.join(&path)).expect("readable test file");
            if !content.contains("#[test]") {
                empty.push(path);
            }
        }
        assert!(
            empty.is_empty(),
            "test files without #[test] functions:\n{}",
            listing(&empty.iter().collect::<Vec<_>>())
        );
    }

    // ndarray's `s!` expands to `#[allow(unsafe_code)]`, which the crate root forbids
    #[test]
    fn test_src_avoids_slice_macro_under_forbid() {
        let root = Path::new("src");
        let lib = fs::read_to_string(root.join("lib.rs")).expect("readable lib.rs");
        assert!(lib.contains("#![forbid(unsafe_code)]"));

        let offenders: Vec<_> = rust_files(root)
            .expect("readable src")
            .into_iter()
            .filter(|path| {
                fs::read_to_string(root.join(path))
                    .is_ok_and(|content| content.contains("s![") || content.contains(", s}"))
            })
            .collect();
        assert!(
            offenders.is_empty(),
            "src files using ndarray's s! macro:\n{}",
            listing(&offenders.iter().collect::<Vec<_>>())
        );
    }
}
