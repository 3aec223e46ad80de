//! Path codec - wire strings, ordered segments and symbolic resolution
//!
//! Every address into the mirrored tree is a [`Path`]: a namespace plus an
//! ordered list of segments. The wire form joins them with `/` and starts with
//! the namespace token (`DEVICE`, `REMOTE` or `LOCAL`).

mod resolve;

pub use resolve::{literal, resolve, PresetMode, ResolveContext};

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin of a path. Never changes once a path is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Namespace {
    /// State mirrored from the device
    Device,
    /// Selection and locks broadcast by the device's remote-control layer
    Remote,
    /// Client-only state
    Local,
}

impl Namespace {
    /// All namespaces, in wire order
    pub fn all() -> &'static [Namespace] {
        &[Namespace::Device, Namespace::Remote, Namespace::Local]
    }

    /// Parse a wire token
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "DEVICE" => Some(Namespace::Device),
            "REMOTE" => Some(Namespace::Remote),
            "LOCAL" => Some(Namespace::Local),
            _ => None,
        }
    }

    /// Wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Device => "DEVICE",
            Namespace::Remote => "REMOTE",
            Namespace::Local => "LOCAL",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Placeholder segment resolved from session context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Preset currently on program for the screen (`$pgm`)
    Program,
    /// Preset currently on preview for the screen (`$pvw`)
    Preview,
    /// Preset the operator is working on, following the preset mode (`$sel`)
    Selected,
}

impl Symbol {
    /// Parse a segment, `None` when it is not symbolic at all
    pub fn parse(segment: &str) -> Option<Result<Self, ()>> {
        if !segment.starts_with('$') {
            return None;
        }
        Some(match segment {
            "$pgm" => Ok(Symbol::Program),
            "$pvw" => Ok(Symbol::Preview),
            "$sel" => Ok(Symbol::Selected),
            _ => Err(()),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Program => "$pgm",
            Symbol::Preview => "$pvw",
            Symbol::Selected => "$sel",
        }
    }
}

/// Address into the mirrored state tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    namespace: Namespace,
    segments: Vec<String>,
}

impl Path {
    /// Build a path from a namespace and raw segments
    ///
    /// Segments containing `/` are split, empty segments dropped.
    pub fn new<I, S>(namespace: Namespace, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self {
            namespace,
            segments: Vec::new(),
        };
        for segment in segments {
            path.push(segment.as_ref());
        }
        path
    }

    /// Root of a namespace
    pub fn root(namespace: Namespace) -> Self {
        Self {
            namespace,
            segments: Vec::new(),
        }
    }

    /// Parse a wire string
    ///
    /// A leading namespace token selects the namespace; paths without one are
    /// device paths.
    pub fn parse(wire: &str) -> Result<Self, PathError> {
        let mut parts = wire.split('/').filter(|s| !s.is_empty()).peekable();
        let first = parts.peek().ok_or(PathError::Empty)?;

        let namespace = match Namespace::from_token(first) {
            Some(ns) => {
                parts.next();
                ns
            }
            None => Namespace::Device,
        };

        Ok(Self {
            namespace,
            segments: parts.map(str::to_string).collect(),
        })
    }

    /// Normalized concatenation of a prefix and a `/`-separated suffix
    pub fn concat(prefix: &Path, suffix: impl AsRef<str>) -> Self {
        let mut path = prefix.clone();
        path.push(suffix.as_ref());
        path
    }

    /// Append one or more segments (split on `/`)
    pub fn push(&mut self, suffix: &str) {
        self.segments.extend(
            suffix
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }

    /// Copy of this path with `suffix` appended
    pub fn join(&self, suffix: impl AsRef<str>) -> Self {
        Self::concat(self, suffix)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of the parent node (the root stays the root)
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            namespace: self.namespace,
            segments,
        }
    }

    /// Whether any segment still needs session context
    pub fn is_symbolic(&self) -> bool {
        self.segments.iter().any(|s| s.starts_with('$'))
    }

    /// Wire form: `NAMESPACE/seg/seg`
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_with_namespace() {
        let path = Path::parse("REMOTE/live/screens/screenAuxSelection").unwrap();
        assert_eq!(path.namespace(), Namespace::Remote);
        assert_eq!(path.segments(), &["live", "screens", "screenAuxSelection"]);
    }

    #[test]
    fn test_parse_defaults_to_device() {
        let path = Path::parse("screenList/items/2/control/pp/label").unwrap();
        assert_eq!(path.namespace(), Namespace::Device);
        assert_eq!(path.to_wire(), "DEVICE/screenList/items/2/control/pp/label");
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        let path = Path::parse("/LOCAL//screenLocks/S1/").unwrap();
        assert_eq!(path.to_wire(), "LOCAL/screenLocks/S1");
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert_eq!(Path::parse(""), Err(PathError::Empty));
        assert_eq!(Path::parse("///"), Err(PathError::Empty));
    }

    #[test]
    fn test_namespace_only() {
        let path = Path::parse("LOCAL").unwrap();
        assert!(path.is_empty());
        assert_eq!(path, Path::root(Namespace::Local));
    }

    #[test]
    fn test_concat_normalizes() {
        let prefix = Path::new(Namespace::Device, ["device", "screenList/items"]);
        let path = Path::concat(&prefix, "/S1//control/pp/label");
        assert_eq!(path.to_wire(), "DEVICE/device/screenList/items/S1/control/pp/label");
        // prefix untouched
        assert_eq!(prefix.len(), 3);
    }

    #[test]
    fn test_parent() {
        let path = Path::parse("DEVICE/a/b/c").unwrap();
        assert_eq!(path.parent().to_wire(), "DEVICE/a/b");
        assert_eq!(Path::root(Namespace::Device).parent().to_wire(), "DEVICE");
    }

    #[test]
    fn test_symbol_parse() {
        assert_eq!(Symbol::parse("$pgm"), Some(Ok(Symbol::Program)));
        assert_eq!(Symbol::parse("$sel"), Some(Ok(Symbol::Selected)));
        assert_eq!(Symbol::parse("$nope"), Some(Err(())));
        assert_eq!(Symbol::parse("pgm"), None);
    }

    proptest! {
        #[test]
        fn wire_form_parses_back(
            ns in prop::sample::select(Namespace::all().to_vec()),
            segments in prop::collection::vec("[A-Za-z0-9_]{1,8}", 0..6),
        ) {
            let path = Path::new(ns, &segments);
            prop_assert_eq!(Path::parse(&path.to_wire()).unwrap(), path);
        }
    }
}
