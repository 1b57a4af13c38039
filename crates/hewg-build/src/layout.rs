//! Fingerprint layout: where a translation unit's cached artifacts live.
//!
//! Every computed path is verified to lie strictly under the root that owns
//! it; an escape is a programmer bug and fails hard.

use std::fs;
use std::path::{Component, Path, PathBuf};

use hewg_config::Environment;
use hewg_package::TargetTriplet;

use crate::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CSource,
    CHeader,
    CxxSource,
    CxxHeader,
}

/// Map a filename to its filetype by extension. Unknown extensions fail.
pub fn file_type_of(path: &Path) -> Result<FileType, BuildError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("c") => Ok(FileType::CSource),
        Some("h") => Ok(FileType::CHeader),
        Some("cc") | Some("cpp") => Ok(FileType::CxxSource),
        Some("hh") | Some("hpp") => Ok(FileType::CxxHeader),
        _ => Err(BuildError::UnknownFileType(path.to_path_buf())),
    }
}

/// The two compiled languages, with their cache subdirectories and source
/// roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cxx,
}

impl Language {
    pub fn tag(self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cxx => "CXX",
        }
    }

    pub fn objects_subdir(self) -> &'static str {
        match self {
            Language::C => "c_objects",
            Language::Cxx => "cxx_objects",
        }
    }

    pub fn depends_subdir(self) -> &'static str {
        match self {
            Language::C => "c_depends",
            Language::Cxx => "cxx_depends",
        }
    }

    pub fn source_root(self, env: &Environment) -> PathBuf {
        match self {
            Language::C => env.c_source_root(),
            Language::Cxx => env.cxx_source_root(),
        }
    }

    pub fn source_type(self) -> FileType {
        match self {
            Language::C => FileType::CSource,
            Language::Cxx => FileType::CxxSource,
        }
    }
}

/// The cache key of one build profile: `<target>[-pic][-rel]`.
pub fn profile_key(target: &TargetTriplet, release: bool, pic: bool) -> String {
    format!(
        "{target}{}{}",
        if pic { "-pic" } else { "" },
        if release { "-rel" } else { "" }
    )
}

/// Create (if needed) and return the per-profile cache folder with its four
/// language subdirectories.
pub fn cache_folder(
    env: &Environment,
    target: &TargetTriplet,
    release: bool,
    pic: bool,
) -> Result<PathBuf, BuildError> {
    let folder = env
        .incremental_root()
        .join(profile_key(target, release, pic));

    ensure_under(&env.cache_root(), &folder)?;

    for subdir in ["cxx_objects", "c_objects", "cxx_depends", "c_depends"] {
        fs::create_dir_all(folder.join(subdir))?;
    }

    Ok(folder)
}

/// The object file a source compiles to inside a cache folder.
pub fn object_file_for(
    cache_folder: &Path,
    lang: Language,
    source_root: &Path,
    source: &Path,
) -> Result<PathBuf, BuildError> {
    artifact_for(cache_folder, lang.objects_subdir(), "o", source_root, source)
}

/// The depfile the compiler emits for a source inside a cache folder.
pub fn depfile_for(
    cache_folder: &Path,
    lang: Language,
    source_root: &Path,
    source: &Path,
) -> Result<PathBuf, BuildError> {
    artifact_for(cache_folder, lang.depends_subdir(), "d", source_root, source)
}

fn artifact_for(
    cache_folder: &Path,
    subdir: &str,
    extension: &str,
    source_root: &Path,
    source: &Path,
) -> Result<PathBuf, BuildError> {
    let relative = relative_within(source_root, source)?;
    let artifact = cache_folder
        .join(subdir)
        .join(relative)
        .with_extension(extension);

    ensure_under(cache_folder, &artifact)?;
    Ok(artifact)
}

pub fn static_library_name(project: &str, pie: bool) -> String {
    format!("lib{project}{}.a", if pie { "-PIE" } else { "" })
}

pub fn shared_library_name(project: &str) -> String {
    format!("lib{project}.so")
}

/// Lexically normalize a path, resolving `.` and `..` components.
fn normalize(path: &Path) -> Result<PathBuf, BuildError> {
    let mut parts: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match parts.last() {
                    Some(Component::Normal(_)) => {
                        parts.pop();
                    }
                    // popping past the start of the path is an escape
                    _ => {
                        return Err(BuildError::PathEscape {
                            path: path.to_path_buf(),
                            root: PathBuf::from("/"),
                        });
                    }
                }
            }
            other => parts.push(other),
        }
    }

    Ok(parts.iter().collect())
}

/// The suffix of `path` under `root`, failing when the normalized path does
/// not lie strictly beneath the root.
fn relative_within(root: &Path, path: &Path) -> Result<PathBuf, BuildError> {
    let escape = || BuildError::PathEscape {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let normalized = normalize(path)?;
    let relative = normalized.strip_prefix(root).map_err(|_| escape())?;

    if relative.as_os_str().is_empty() {
        return Err(escape());
    }
    Ok(relative.to_path_buf())
}

fn ensure_under(root: &Path, path: &Path) -> Result<(), BuildError> {
    relative_within(root, path).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env() -> Environment {
        Environment::new(
            PathBuf::from("/work/demo"),
            None,
            Path::new("/home/crow"),
            4,
            false,
            false,
            false,
        )
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(file_type_of(Path::new("a.c")).unwrap(), FileType::CSource);
        assert_eq!(file_type_of(Path::new("a.h")).unwrap(), FileType::CHeader);
        assert_eq!(file_type_of(Path::new("a.cc")).unwrap(), FileType::CxxSource);
        assert_eq!(file_type_of(Path::new("a.cpp")).unwrap(), FileType::CxxSource);
        assert_eq!(file_type_of(Path::new("a.hh")).unwrap(), FileType::CxxHeader);
        assert_eq!(file_type_of(Path::new("a.hpp")).unwrap(), FileType::CxxHeader);

        assert!(file_type_of(Path::new("a.rs")).is_err());
        assert!(file_type_of(Path::new("Makefile")).is_err());
    }

    #[test]
    fn profile_keys() {
        let target = TargetTriplet::host();
        assert_eq!(profile_key(&target, false, false), "x86-linux-gnu");
        assert_eq!(profile_key(&target, false, true), "x86-linux-gnu-pic");
        assert_eq!(profile_key(&target, true, false), "x86-linux-gnu-rel");
        assert_eq!(profile_key(&target, true, true), "x86-linux-gnu-pic-rel");
    }

    #[test]
    fn object_and_depfile_paths() {
        let env = env();
        let cache = Path::new("/work/demo/.hcache/incremental/x86-linux-gnu");
        let root = env.cxx_source_root();

        let object = object_file_for(
            cache,
            Language::Cxx,
            &root,
            Path::new("/work/demo/src/util/util.cc"),
        )
        .unwrap();
        assert_eq!(
            object,
            Path::new("/work/demo/.hcache/incremental/x86-linux-gnu/cxx_objects/util/util.o")
        );

        let depfile = depfile_for(
            cache,
            Language::Cxx,
            &root,
            Path::new("/work/demo/src/util/util.cc"),
        )
        .unwrap();
        assert_eq!(
            depfile,
            Path::new("/work/demo/.hcache/incremental/x86-linux-gnu/cxx_depends/util/util.d")
        );
    }

    #[test]
    fn c_sources_use_their_own_subdirs() {
        let env = env();
        let cache = Path::new("/work/demo/.hcache/incremental/x86-linux-gnu");

        let object = object_file_for(
            cache,
            Language::C,
            &env.c_source_root(),
            Path::new("/work/demo/csrc/impl.c"),
        )
        .unwrap();
        assert_eq!(
            object,
            Path::new("/work/demo/.hcache/incremental/x86-linux-gnu/c_objects/impl.o")
        );
    }

    #[test]
    fn sources_outside_the_root_are_rejected() {
        let env = env();
        let cache = Path::new("/work/demo/.hcache/incremental/x86-linux-gnu");

        for source in [
            "/work/demo/csrc/impl.c",
            "/elsewhere/a.cc",
            "/work/demo/src/../escape.cc",
        ] {
            assert!(
                object_file_for(cache, Language::Cxx, &env.cxx_source_root(), Path::new(source))
                    .is_err(),
                "should reject <{source}>"
            );
        }
    }

    #[test]
    fn dotdot_inside_the_root_is_normalized() {
        let env = env();
        let cache = Path::new("/work/demo/.hcache/incremental/x86-linux-gnu");

        let object = object_file_for(
            cache,
            Language::Cxx,
            &env.cxx_source_root(),
            Path::new("/work/demo/src/util/../main.cc"),
        )
        .unwrap();
        assert_eq!(
            object,
            Path::new("/work/demo/.hcache/incremental/x86-linux-gnu/cxx_objects/main.o")
        );
    }

    #[test]
    fn artifact_names() {
        assert_eq!(static_library_name("demo", false), "libdemo.a");
        assert_eq!(static_library_name("demo", true), "libdemo-PIE.a");
        assert_eq!(shared_library_name("demo"), "libdemo.so");
    }

    #[test]
    fn cache_folder_creates_language_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new(
            dir.path().to_path_buf(),
            None,
            Path::new("/home/crow"),
            4,
            false,
            false,
            false,
        );

        let folder = cache_folder(&env, &TargetTriplet::host(), true, false).unwrap();
        assert!(folder.ends_with(".hcache/incremental/x86-linux-gnu-rel"));
        for subdir in ["cxx_objects", "c_objects", "cxx_depends", "c_depends"] {
            assert!(folder.join(subdir).is_dir());
        }
    }
}
