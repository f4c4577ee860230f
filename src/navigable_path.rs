//! NavigablePath: structural address of a position in the domain graph
//!
//! A path is a root name followed by a chain of attribute names, e.g.
//! `Order.customer.id`. Paths are immutable and share their parents, so
//! appending to a path is cheap and many children can hang off one parent.
//!
//! Equality and hashing look only at the segment sequence. Two paths built
//! through different code routes compare equal as long as they spell the
//! same segments, and no physical SQL state (aliases, table groups) is ever
//! part of a path.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Segment used for the element side of a collection
pub const ELEMENT_SEGMENT: &str = "{element}";

/// Segment used for the index (map key / list index) side of a collection
pub const INDEX_SEGMENT: &str = "{index}";

/// Segment used for the key-side view of a foreign key
pub const FOREIGN_KEY_SEGMENT: &str = "{fk}";

#[derive(Debug)]
struct PathNode {
    parent: Option<NavigablePath>,
    local_name: String,
    depth: usize,
}

/// Structural dotted-path identity of a position in the domain graph.
#[derive(Clone)]
pub struct NavigablePath {
    node: Arc<PathNode>,
}

impl NavigablePath {
    /// Create a root path (e.g. the entity name of a query root)
    pub fn root(name: impl Into<String>) -> Self {
        NavigablePath {
            node: Arc::new(PathNode {
                parent: None,
                local_name: name.into(),
                depth: 0,
            }),
        }
    }

    /// Create a child path one segment below this one.
    pub fn append(&self, segment: impl Into<String>) -> Self {
        NavigablePath {
            node: Arc::new(PathNode {
                parent: Some(self.clone()),
                local_name: segment.into(),
                depth: self.node.depth + 1,
            }),
        }
    }

    /// Append a dotted property chain (`details.code`) one segment at a time.
    pub fn append_dotted(&self, dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(self.clone(), |path, segment| path.append(segment))
    }

    pub fn parent(&self) -> Option<&NavigablePath> {
        self.node.parent.as_ref()
    }

    pub fn local_name(&self) -> &str {
        &self.node.local_name
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    /// Number of segments below the root
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    /// Name of the root segment
    pub fn root_name(&self) -> &str {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.local_name()
    }

    /// Segments from the root down to this path.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(self.node.depth + 1);
        let mut current = Some(self);
        while let Some(path) = current {
            segments.push(path.local_name());
            current = path.parent();
        }
        segments.reverse();
        segments
    }

    /// Dotted rendering of the whole path (`Order.customer.id`)
    pub fn full_path(&self) -> String {
        self.segments().join(".")
    }

    /// Whether `other` lives strictly below this path.
    pub fn is_parent_of(&self, other: &NavigablePath) -> bool {
        let mut current = other.parent();
        while let Some(candidate) = current {
            if candidate.depth() < self.depth() {
                return false;
            }
            if candidate == self {
                return true;
            }
            current = candidate.parent();
        }
        false
    }

    /// Path relative to `ancestor` (`customer.id` for `Order.customer.id`
    /// relative to `Order`), or None if `ancestor` is not above this path.
    pub fn relative_to(&self, ancestor: &NavigablePath) -> Option<String> {
        if !ancestor.is_parent_of(self) {
            return None;
        }
        let segments = self.segments();
        Some(segments[ancestor.depth() + 1..].join("."))
    }
}

impl PartialEq for NavigablePath {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        if self.node.depth != other.node.depth {
            return false;
        }
        let mut left = Some(self);
        let mut right = Some(other);
        while let (Some(l), Some(r)) = (left, right) {
            if Arc::ptr_eq(&l.node, &r.node) {
                return true;
            }
            if l.local_name() != r.local_name() {
                return false;
            }
            left = l.parent();
            right = r.parent();
        }
        left.is_none() && right.is_none()
    }
}

impl Eq for NavigablePath {}

impl Hash for NavigablePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.depth.hash(state);
        for segment in self.segments() {
            segment.hash(state);
        }
    }
}

impl fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

impl fmt::Debug for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavigablePath({})", self.full_path())
    }
}

impl Serialize for NavigablePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full_path())
    }
}
