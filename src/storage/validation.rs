//! Path validation
//!
//! Resolves client-supplied relative paths against the server root and
//! guarantees the result never escapes it. A [`ResolvedPath`] can only be
//! built here, so holding one means confinement was checked after
//! canonicalization (symlinks, `.` and `..` resolved).

use log::{debug, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PathError;

/// Characters never allowed in a folder or file name.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// The confinement boundary, canonicalized once at startup.
#[derive(Debug, Clone)]
pub struct Root {
    path: PathBuf,
}

/// A path proven to be the root or one of its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

/// A single validated path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName(String);

impl Root {
    /// Opens the root directory, creating it if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let path = path.canonicalize()?;
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "server root is not a directory",
            ));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves an existing path (the root itself for an empty input).
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let segments = split_relative(relative)?;
        self.resolve_segments(&segments)
    }

    /// Resolves an existing directory.
    pub fn resolve_dir(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let resolved = self.resolve(relative)?;
        if !resolved.absolute.is_dir() {
            return Err(PathError::NotADirectory(resolved.relative));
        }
        Ok(resolved)
    }

    /// Resolves a path that may not exist yet.
    ///
    /// The deepest existing ancestor is canonicalized and confined, then the
    /// missing remainder is re-appended. A dangling symlink on the way is
    /// refused since creating through it would land wherever it points.
    pub fn resolve_lenient(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let segments = split_relative(relative)?;

        for existing in (0..=segments.len()).rev() {
            let candidate = join_segments(&self.path, &segments[..existing]);
            match candidate.canonicalize() {
                Ok(canonical) => {
                    let mut absolute = self.confine(canonical, relative)?;
                    if existing < segments.len() && !absolute.is_dir() {
                        return Err(PathError::NotADirectory(segments[..existing].join("/")));
                    }
                    for segment in &segments[existing..] {
                        absolute.push(segment);
                    }
                    return Ok(ResolvedPath {
                        absolute,
                        relative: segments.join("/"),
                    });
                }
                Err(_) if fs::symlink_metadata(&candidate).is_ok() => {
                    warn!("Refusing to resolve through dangling link: {relative:?}");
                    return Err(PathError::Confinement(relative.to_string()));
                }
                Err(_) => continue,
            }
        }

        // The root itself always canonicalizes, so the loop returns above.
        Err(PathError::NotFound(relative.to_string()))
    }

    /// Resolves an existing entry without following its final component.
    ///
    /// Used by rename and delete so that a symlink entry is acted on itself,
    /// never its target. The root itself is not an entry.
    pub fn resolve_entry(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let segments = split_relative(relative)?;
        let Some((name, parent_segments)) = segments.split_last() else {
            return Err(PathError::InvalidName("Path cannot be empty".into()));
        };

        let parent = self.resolve_segments(parent_segments)?;
        if !parent.absolute.is_dir() {
            return Err(PathError::NotADirectory(parent.relative));
        }

        let absolute = parent.absolute.join(name);
        let relative = segments.join("/");
        match fs::symlink_metadata(&absolute) {
            Ok(_) => Ok(ResolvedPath { absolute, relative }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PathError::NotFound(relative)),
            Err(e) => Err(PathError::Io(e)),
        }
    }

    fn resolve_segments(&self, segments: &[&str]) -> Result<ResolvedPath, PathError> {
        let relative = segments.join("/");
        let joined = join_segments(&self.path, segments);

        let canonical = match joined.canonicalize() {
            Ok(canonical) => canonical,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                return Err(PathError::NotFound(relative));
            }
            Err(e) => return Err(PathError::Io(e)),
        };

        let absolute = self.confine(canonical, &relative)?;
        debug!("Resolved {:?} to {}", relative, absolute.display());
        Ok(ResolvedPath { absolute, relative })
    }

    /// Component-wise prefix check, so `/srv/files2` never passes for `/srv/files`.
    fn confine(&self, canonical: PathBuf, relative: &str) -> Result<PathBuf, PathError> {
        if canonical.starts_with(&self.path) {
            Ok(canonical)
        } else {
            warn!(
                "Path escape attempt: {:?} resolved to {} outside {}",
                relative,
                canonical.display(),
                self.path.display()
            );
            Err(PathError::Confinement(relative.to_string()))
        }
    }
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Normalized relative form, `/`-separated, empty for the root.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Last component of the relative path, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.relative.rsplit('/').next()
        }
    }

    /// Child of this directory. A validated name is a single component, so
    /// the result stays inside the root.
    pub fn child(&self, name: &EntryName) -> ResolvedPath {
        ResolvedPath {
            absolute: self.absolute.join(name.as_str()),
            relative: join_relative(&self.relative, name.as_str()),
        }
    }

    /// Sibling of this entry (same parent directory).
    pub fn sibling(&self, name: &EntryName) -> ResolvedPath {
        let absolute = match self.absolute.parent() {
            Some(parent) => parent.join(name.as_str()),
            None => PathBuf::from(name.as_str()),
        };
        let parent_relative = match self.relative.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => "",
        };
        ResolvedPath {
            absolute,
            relative: join_relative(parent_relative, name.as_str()),
        }
    }
}

impl EntryName {
    /// Validates a folder or file name supplied by a client.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(PathError::InvalidName("Name cannot be empty".into()));
        }
        if name == "." || name == ".." {
            return Err(PathError::InvalidName(name.to_string()));
        }
        if name
            .chars()
            .any(|c| FORBIDDEN_NAME_CHARS.contains(&c) || c.is_control())
        {
            return Err(PathError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a client path into its segments.
///
/// Empty and `.` segments are dropped; any `..` segment is rejected outright.
/// This is a first-pass filter only, canonicalization decides confinement.
pub fn split_relative(relative: &str) -> Result<Vec<&str>, PathError> {
    let mut segments = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                warn!("Path traversal attempt: {relative:?}");
                return Err(PathError::Confinement(relative.to_string()));
            }
            s if s.contains('\0') => {
                return Err(PathError::InvalidName(relative.replace('\0', "")));
            }
            s => segments.push(s),
        }
    }
    Ok(segments)
}

/// Joins two relative paths with a `/`.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn join_segments(base: &Path, segments: &[&str]) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Root) {
        let tmp = TempDir::new().unwrap();
        let root = Root::open(tmp.path().join("files")).unwrap();
        fs::create_dir_all(root.path().join("docs/reports")).unwrap();
        fs::write(root.path().join("docs/readme.txt"), b"hello").unwrap();
        (tmp, root)
    }

    #[test]
    fn empty_path_is_root() {
        let (_tmp, root) = setup();
        for input in ["", "/", ".", "./", "//"] {
            let resolved = root.resolve(input).unwrap();
            assert!(resolved.is_root());
            assert_eq!(resolved.as_path(), root.path());
        }
    }

    #[test]
    fn nested_path_is_normalized() {
        let (_tmp, root) = setup();
        let resolved = root.resolve("/docs//./reports/").unwrap();
        assert_eq!(resolved.relative(), "docs/reports");
        assert_eq!(resolved.name(), Some("reports"));
        assert!(resolved.as_path().starts_with(root.path()));
    }

    #[test]
    fn parent_segments_are_rejected() {
        let (_tmp, root) = setup();
        for input in ["..", "../etc", "docs/../../etc", "docs/..", "..\\etc", "docs/../docs"] {
            assert!(
                matches!(root.resolve(input), Err(PathError::Confinement(_))),
                "{input} should be rejected"
            );
            assert!(matches!(
                root.resolve_lenient(input),
                Err(PathError::Confinement(_))
            ));
            assert!(matches!(
                root.resolve_entry(input),
                Err(PathError::Confinement(_))
            ));
        }
    }

    #[test]
    fn missing_path_is_not_found() {
        let (_tmp, root) = setup();
        assert!(matches!(
            root.resolve("docs/missing"),
            Err(PathError::NotFound(p)) if p == "docs/missing"
        ));
        assert!(matches!(
            root.resolve("docs/readme.txt/inner"),
            Err(PathError::NotFound(_))
        ));
    }

    #[test]
    fn resolve_dir_rejects_files() {
        let (_tmp, root) = setup();
        assert!(matches!(
            root.resolve_dir("docs/readme.txt"),
            Err(PathError::NotADirectory(_))
        ));
    }

    #[test]
    fn lenient_resolution_appends_missing_remainder() {
        let (_tmp, root) = setup();
        let resolved = root.resolve_lenient("docs/new/deeper").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("docs/new/deeper"));
        assert_eq!(resolved.relative(), "docs/new/deeper");
    }

    #[test]
    fn lenient_resolution_under_a_file_fails() {
        let (_tmp, root) = setup();
        assert!(matches!(
            root.resolve_lenient("docs/readme.txt/sub"),
            Err(PathError::NotADirectory(_))
        ));
    }

    #[test]
    fn entry_resolution_requires_a_name() {
        let (_tmp, root) = setup();
        assert!(matches!(root.resolve_entry(""), Err(PathError::InvalidName(_))));
        assert!(matches!(root.resolve_entry("/"), Err(PathError::InvalidName(_))));
        assert!(matches!(
            root.resolve_entry("docs/nope"),
            Err(PathError::NotFound(_))
        ));
        let entry = root.resolve_entry("docs/readme.txt").unwrap();
        assert_eq!(entry.as_path(), root.path().join("docs/readme.txt"));
    }

    #[test]
    fn names_with_forbidden_characters_are_rejected() {
        for bad in ["", "   ", ".", "..", "a/b", "a\\b", "a:b", "a*b", "a?b", "a\"b", "a<b", "a>b", "a|b", "a\nb"] {
            assert!(EntryName::parse(bad).is_err(), "{bad:?} should be invalid");
        }
        assert_eq!(EntryName::parse("  My Photos ").unwrap().as_str(), "My Photos");
        assert!(EntryName::parse("report.v2.txt").is_ok());
        assert!(EntryName::parse("..hidden").is_ok());
    }

    #[test]
    fn child_and_sibling_keep_relative_paths() {
        let (_tmp, root) = setup();
        let docs = root.resolve("docs").unwrap();
        let name = EntryName::parse("notes").unwrap();
        assert_eq!(docs.child(&name).relative(), "docs/notes");
        assert_eq!(docs.sibling(&name).relative(), "notes");
        assert_eq!(docs.sibling(&name).as_path(), root.path().join("notes"));
    }

    #[cfg(unix)]
    mod symlinks {
        use super::*;
        use std::os::unix::fs::symlink;

        #[test]
        fn symlink_escape_is_confinement_error() {
            let (tmp, root) = setup();
            let outside = tmp.path().join("outside");
            fs::create_dir_all(&outside).unwrap();
            fs::write(outside.join("secret.txt"), b"secret").unwrap();
            symlink(&outside, root.path().join("escape")).unwrap();

            assert!(matches!(root.resolve("escape"), Err(PathError::Confinement(_))));
            assert!(matches!(
                root.resolve("escape/secret.txt"),
                Err(PathError::Confinement(_))
            ));
            assert!(matches!(
                root.resolve_lenient("escape/new"),
                Err(PathError::Confinement(_))
            ));
        }

        #[test]
        fn sibling_with_shared_prefix_is_outside() {
            let (tmp, root) = setup();
            let sibling = tmp.path().join("files2");
            fs::create_dir_all(&sibling).unwrap();
            symlink(&sibling, root.path().join("prefix")).unwrap();

            assert!(matches!(root.resolve("prefix"), Err(PathError::Confinement(_))));
        }

        #[test]
        fn symlink_inside_root_is_allowed() {
            let (_tmp, root) = setup();
            symlink(root.path().join("docs"), root.path().join("shortcut")).unwrap();
            let resolved = root.resolve("shortcut/readme.txt").unwrap();
            assert_eq!(
                resolved.as_path(),
                root.path().join("docs/readme.txt").as_path()
            );
            assert_eq!(resolved.relative(), "shortcut/readme.txt");
        }

        #[test]
        fn dangling_symlink_blocks_lenient_resolution() {
            let (tmp, root) = setup();
            symlink(tmp.path().join("nowhere"), root.path().join("dangling")).unwrap();
            assert!(matches!(
                root.resolve_lenient("dangling/sub"),
                Err(PathError::Confinement(_))
            ));
        }

        #[test]
        fn entry_resolution_does_not_follow_final_link() {
            let (tmp, root) = setup();
            let outside = tmp.path().join("outside.txt");
            fs::write(&outside, b"x").unwrap();
            symlink(&outside, root.path().join("link.txt")).unwrap();

            let entry = root.resolve_entry("link.txt").unwrap();
            assert_eq!(entry.as_path(), root.path().join("link.txt"));
            assert!(matches!(root.resolve("link.txt"), Err(PathError::Confinement(_))));
        }
    }
}
