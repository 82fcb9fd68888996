//! Document paths.

use std::fmt;

use crate::error::{Result, SyncError};

/// Characters a path segment may not contain.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// A normalised, validated path into the document tree. The empty path is
/// the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    /// Parse `a/b/c`. Leading, trailing and repeated slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for seg in raw.split('/').filter(|s| !s.is_empty()) {
            if seg.contains(FORBIDDEN) || seg.chars().any(char::is_control) {
                return Err(SyncError::InvalidPath(raw.to_string()));
            }
            segments.push(seg.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, key: &str) -> Result<Self> {
        let mut joined = self.segments.join("/");
        joined.push('/');
        joined.push_str(key);
        Self::parse(&joined)
    }

    /// `true` when `self` equals `other` or lies above it.
    pub fn contains(&self, other: &DocPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// For a strict descendant, the key of the direct child of `self` on
    /// the way to it.
    pub fn child_towards<'a>(&self, descendant: &'a DocPath) -> Option<&'a str> {
        if descendant.segments.len() > self.segments.len() && self.contains(descendant) {
            Some(descendant.segments[self.segments.len()].as_str())
        } else {
            None
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
