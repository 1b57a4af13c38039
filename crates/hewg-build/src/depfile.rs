//! Make-style depfile parsing.
//!
//! Compilers emit `target: dep1 dep2 \` rules with line continuations; the
//! parser does not need to be very robust beyond that, since every path it
//! yields is checked against the filesystem afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use crate::BuildError;

/// A parsed dependency rule for one translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depfile {
    /// The rule target: the object file.
    pub obj_path: PathBuf,
    /// The first dependency: the source file itself.
    pub src_path: PathBuf,
    /// Every listed dependency, the source file included.
    pub dependencies: Vec<PathBuf>,
}

/// Read and parse the depfile at `path`.
pub fn read_depfile(path: &Path) -> Result<Depfile, BuildError> {
    let text = fs::read_to_string(path)?;
    parse_depfile(path, &text)
}

/// Parse depfile text; `path` is only used for error context.
pub fn parse_depfile(path: &Path, text: &str) -> Result<Depfile, BuildError> {
    let malformed = |reason: &str| BuildError::MalformedDepfile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let (target, deps) = text
        .split_once(':')
        .ok_or_else(|| malformed("no colon after the rule target"))?;

    let target = target.trim();
    if target.is_empty() {
        return Err(malformed("empty rule target"));
    }

    let dependencies: Vec<PathBuf> = tokenize(deps).into_iter().map(PathBuf::from).collect();

    let Some(first) = dependencies.first() else {
        return Err(malformed(
            "empty dependency list, object file does not depend on its source",
        ));
    };

    Ok(Depfile {
        obj_path: PathBuf::from(target),
        src_path: first.clone(),
        dependencies,
    })
}

/// Split on whitespace, treating `\` line continuations as separators and
/// `\ ` as an escaped space inside a token.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    let mut flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.peek() == Some(&' ') {
                    current.push(' ');
                    chars.next();
                } else {
                    flush(&mut current, &mut tokens);
                }
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);

    tokens
}
