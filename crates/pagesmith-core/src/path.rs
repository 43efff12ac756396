#![forbid(unsafe_code)]

//! Root-relative locations in the parameter tree.
//!
//! Tab forms address fields with plain string arrays such as
//! `["content", "problems", "items", "0", "title"]`. A segment written in
//! canonical decimal form (`"0"`, `"12"`, but not `"01"` or `"+1"`) is an
//! array index; every other segment is an object key. The path-update engine
//! relies on this split to decide which container a missing slot becomes.

use std::borrow::Cow;
use std::fmt;

/// One step of a [`ParamPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl Segment {
    /// Classify a raw segment.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if is_canonical_index(raw)
            && let Ok(index) = raw.parse::<usize>()
        {
            return Self::Index(index);
        }
        Self::Key(raw.to_string())
    }

    /// A segment that is always an object key, even when it looks numeric.
    ///
    /// Used for maps keyed by ids (`content.productPages.<id>`).
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// The text of this segment when used as an object key.
    #[must_use]
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Self::Key(key) => Cow::Borrowed(key),
            Self::Index(index) => Cow::Owned(index.to_string()),
        }
    }

    #[must_use]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

fn is_canonical_index(raw: &str) -> bool {
    !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'))
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Errors building a [`ParamPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path has no segments and names no leaf.
    Empty,
    /// A dotted path contained an empty component (`"a..b"`).
    EmptySegment { position: usize },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("parameter path is empty"),
            Self::EmptySegment { position } => {
                write!(f, "parameter path has an empty segment at position {position}")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A non-empty, root-relative path; the last segment names the leaf.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamPath {
    segments: Vec<Segment>,
}

impl ParamPath {
    /// Build a path from raw string segments, classifying each one.
    pub fn new<I, S>(raw: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = raw
            .into_iter()
            .map(|s| Segment::parse(s.as_ref()))
            .collect();
        Self::from_segments(segments)
    }

    /// Build a path from already-typed segments.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { segments })
    }

    /// A one-segment path.
    #[must_use]
    pub fn single(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }

    /// Parse `"content.problems.items.2.title"`.
    pub fn parse_dotted(dotted: &str) -> Result<Self, PathError> {
        if dotted.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for (position, part) in dotted.split('.').enumerate() {
            if part.is_empty() {
                return Err(PathError::EmptySegment { position });
            }
            segments.push(Segment::parse(part));
        }
        Self::from_segments(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments (always at least one).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The segment naming the written leaf.
    #[must_use]
    pub fn leaf(&self) -> &Segment {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    /// This path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// This path with the segment at `position` read as an object key.
    #[must_use]
    pub fn with_key_at(&self, position: usize) -> Self {
        let mut segments = self.segments.clone();
        if let Some(segment) = segments.get_mut(position) {
            let key = segment.as_key().into_owned();
            *segment = Segment::Key(key);
        }
        Self { segments }
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
