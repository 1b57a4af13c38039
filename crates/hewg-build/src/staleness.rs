//! Staleness analysis: which translation units must rebuild.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::{depfile_for, read_depfile, BuildError, Language};

/// Modification time of a file in whole seconds since the epoch, or `None`
/// when it cannot be read. Comparison is strict, so filesystems with
/// coarser timestamp granularity are tolerated.
pub fn modification_time(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()?
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// Return the subset of `sources` that must be rebuilt against the given
/// cache folder.
///
/// A source rebuilds when its depfile is absent or unreadable (never
/// compiled in this cache), when its object file is gone, or when any
/// listed dependency is newer than the object. Missing dependencies are
/// treated as unchanged.
pub fn mark_for_rebuild(
    cache_folder: &Path,
    lang: Language,
    source_root: &Path,
    sources: &[PathBuf],
) -> Result<Vec<PathBuf>, BuildError> {
    let mut rebuilds = Vec::new();

    for source in sources {
        let depfile_path = depfile_for(cache_folder, lang, source_root, source)?;

        let depfile = match read_depfile(&depfile_path) {
            Ok(depfile) => depfile,
            Err(_) => {
                rebuilds.push(source.clone());
                continue;
            }
        };

        let Some(object_time) = modification_time(&depfile.obj_path) else {
            rebuilds.push(source.clone());
            continue;
        };

        let newer_input = depfile
            .dependencies
            .iter()
            .any(|dep| matches!(modification_time(dep), Some(t) if t > object_time));

        if newer_input {
            rebuilds.push(source.clone());
        }
    }

    Ok(rebuilds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    /// A project skeleton with one cache profile folder.
    struct Fixture {
        dir: TempDir,
        cache: PathBuf,
        src_root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let cache = dir.path().join(".hcache/incremental/x86-linux-gnu");
            let src_root = dir.path().join("src");

            for sub in ["cxx_objects", "cxx_depends", "c_objects", "c_depends"] {
                fs::create_dir_all(cache.join(sub)).unwrap();
            }
            fs::create_dir_all(&src_root).unwrap();

            Self {
                dir,
                cache,
                src_root,
            }
        }

        fn source(&self, name: &str) -> PathBuf {
            let path = self.src_root.join(name);
            fs::write(&path, "int x;\n").unwrap();
            path
        }

        fn header(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, "#pragma once\n").unwrap();
            path
        }

        /// Pretend `source` was compiled: create its object and a depfile
        /// listing `deps`.
        fn compiled(&self, source: &Path, deps: &[&Path]) -> PathBuf {
            let rel = source.strip_prefix(&self.src_root).unwrap();
            let object = self.cache.join("cxx_objects").join(rel).with_extension("o");
            fs::write(&object, b"obj").unwrap();

            let depfile = self.cache.join("cxx_depends").join(rel).with_extension("d");
            let mut listed = vec![source.display().to_string()];
            listed.extend(deps.iter().map(|d| d.display().to_string()));
            fs::write(
                &depfile,
                format!("{}: {}\n", object.display(), listed.join(" ")),
            )
            .unwrap();

            object
        }

        fn mark(&self, sources: &[PathBuf]) -> Vec<PathBuf> {
            mark_for_rebuild(&self.cache, Language::Cxx, &self.src_root, sources).unwrap()
        }
    }

    fn backdate(path: &Path, seconds: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(seconds))
            .unwrap();
    }

    #[test]
    fn sources_without_depfiles_are_stale() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        let b = fx.source("b.cc");

        assert_eq!(fx.mark(&[a.clone(), b.clone()]), vec![a, b]);
    }

    #[test]
    fn fresh_objects_are_clean() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        let header = fx.header("a.hh");
        fx.compiled(&a, &[&header]);

        assert!(fx.mark(&[a]).is_empty());
    }

    #[test]
    fn missing_object_is_stale() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        let object = fx.compiled(&a, &[]);
        fs::remove_file(object).unwrap();

        assert_eq!(fx.mark(&[a.clone()]), vec![a]);
    }

    #[test]
    fn newer_dependency_is_stale() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        let header = fx.header("a.hh");
        let object = fx.compiled(&a, &[&header]);

        backdate(&object, 10);
        assert_eq!(fx.mark(&[a.clone()]), vec![a]);
    }

    #[test]
    fn touched_header_rebuilds_every_listing_tu() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        let b = fx.source("b.cc");
        let shared_header = fx.header("shared.hh");

        let obj_a = fx.compiled(&a, &[&shared_header]);
        let obj_b = fx.compiled(&b, &[&shared_header]);

        backdate(&obj_a, 10);
        backdate(&obj_b, 10);
        backdate(&a, 10);
        backdate(&b, 10);

        // only the header moved forward; both TUs list it
        assert_eq!(fx.mark(&[a.clone(), b.clone()]), vec![a, b]);
    }

    #[test]
    fn missing_dependencies_are_ignored() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        let ghost = fx.dir.path().join("deleted.hh");
        fx.compiled(&a, &[&ghost]);

        assert!(fx.mark(&[a]).is_empty());
    }

    #[test]
    fn corrupt_depfile_is_stale() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");
        fx.compiled(&a, &[]);

        fs::write(fx.cache.join("cxx_depends/a.d"), "no colon here\n").unwrap();
        assert_eq!(fx.mark(&[a.clone()]), vec![a]);
    }

    #[test]
    fn modification_time_is_whole_seconds() {
        let fx = Fixture::new();
        let a = fx.source("a.cc");

        let time = modification_time(&a).unwrap();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(now.abs_diff(time) < 5);

        assert_eq!(modification_time(&fx.dir.path().join("missing")), None);
    }
}
