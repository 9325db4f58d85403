//! Path notation for addressing work items.
//!
//! A path is a `/`-separated list of segments. Each segment is `Type`,
//! `Type[index]` (zero-based ordinal among the children of that type),
//! `.` or `..`. A leading `/` makes the path absolute, starting from the
//! tree root; otherwise it starts from a given item. `Type` alone means
//! `Type[0]`.

use crate::error::WorkItemError;
use crate::item_type::WorkItemType;
use crate::tree::{WorkItemId, WorkTree};
use std::fmt;
use std::str::FromStr;

/// One step of a [`WorkPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `.` stays on the current item.
    Current,
    /// `..` moves to the parent.
    Parent,
    /// `Type` or `Type[index]` moves to a child.
    Child {
        workitem_type: WorkItemType,
        index: Option<usize>,
    },
}

impl PathSegment {
    /// Child segment with an explicit index.
    pub fn child(workitem_type: WorkItemType, index: usize) -> Self {
        PathSegment::Child {
            workitem_type,
            index: Some(index),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Current => write!(f, "."),
            PathSegment::Parent => write!(f, ".."),
            PathSegment::Child {
                workitem_type,
                index: Some(index),
            } => write!(f, "{}[{}]", workitem_type, index),
            PathSegment::Child {
                workitem_type,
                index: None,
            } => write!(f, "{}", workitem_type),
        }
    }
}

/// A parsed work item path.
///
/// # Examples
///
/// ```
/// use eda_core::WorkPath;
///
/// let path: WorkPath = "/LineItem[1]/Note".parse()?;
/// assert!(path.is_absolute());
/// assert_eq!(path.segments().len(), 2);
/// assert_eq!(path.to_string(), "/LineItem[1]/Note");
///
/// assert!("LineItem[one]".parse::<WorkPath>().is_err());
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkPath {
    absolute: bool,
    segments: Vec<PathSegment>,
}

impl WorkPath {
    /// The absolute path of the root, `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// The empty relative path; resolves to the starting item.
    pub fn here() -> Self {
        Self::default()
    }

    /// Parses a path.
    pub fn parse(path: &str) -> Result<Self, WorkItemError> {
        let (absolute, rest) = match path.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, path),
        };
        if rest.is_empty() {
            return Ok(Self {
                absolute,
                segments: Vec::new(),
            });
        }
        let segments = rest
            .split('/')
            .map(|raw| parse_segment(path, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { absolute, segments })
    }

    /// Appends a segment, builder style.
    pub fn join(mut self, segment: PathSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn parse_segment(path: &str, raw: &str) -> Result<PathSegment, WorkItemError> {
    match raw {
        "" => return Err(parse_error(path, "empty segment")),
        "." => return Ok(PathSegment::Current),
        ".." => return Ok(PathSegment::Parent),
        _ => {}
    }

    let (name, index) = match raw.find('[') {
        None if raw.contains(']') => {
            return Err(parse_error(path, format!("unmatched ']' in '{}'", raw)));
        }
        None => (raw, None),
        Some(open) => {
            let Some(inner) = raw[open + 1..].strip_suffix(']') else {
                return Err(parse_error(
                    path,
                    format!("'{}' must end with ']' after its index", raw),
                ));
            };
            if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
                return Err(parse_error(
                    path,
                    format!("index '{}' is not a non-negative integer", inner),
                ));
            }
            let index = inner
                .parse::<usize>()
                .map_err(|e| parse_error(path, format!("index '{}': {}", inner, e)))?;
            (&raw[..open], Some(index))
        }
    };
    if name.is_empty() {
        return Err(parse_error(path, format!("'{}' has no type name", raw)));
    }
    Ok(PathSegment::Child {
        workitem_type: WorkItemType::new(name)?,
        index,
    })
}

fn parse_error(path: &str, details: impl Into<String>) -> WorkItemError {
    WorkItemError::PathParse {
        path: path.to_string(),
        details: details.into(),
    }
}

impl FromStr for WorkPath {
    type Err = WorkItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WorkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "/")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl WorkTree {
    /// Resolves a path string from `from` (or from the root if absolute).
    pub fn resolve(&self, from: WorkItemId, path: &str) -> Result<WorkItemId, WorkItemError> {
        self.resolve_path(from, &WorkPath::parse(path)?)
    }

    /// Resolves a parsed path from `from` (or from the root if absolute).
    ///
    /// An unknown type or an index past the last child of that type fails
    /// with `PathNotFound`.
    pub fn resolve_path(
        &self,
        from: WorkItemId,
        path: &WorkPath,
    ) -> Result<WorkItemId, WorkItemError> {
        self.item(from)?;
        let mut current = if path.absolute { self.root() } else { from };
        for segment in &path.segments {
            current = match segment {
                PathSegment::Current => current,
                PathSegment::Parent => self.item(current)?.parent().ok_or_else(|| {
                    WorkItemError::PathNotFound {
                        path: path.to_string(),
                        details: "'..' goes above the root".to_string(),
                    }
                })?,
                PathSegment::Child {
                    workitem_type,
                    index,
                } => self
                    .get_child(current, workitem_type.as_str(), index.unwrap_or(0))
                    .map_err(|err| match err {
                        WorkItemError::ChildNotFound { .. }
                        | WorkItemError::IndexOutOfRange { .. } => WorkItemError::PathNotFound {
                            path: path.to_string(),
                            details: err.to_string(),
                        },
                        other => other,
                    })?,
            };
        }
        Ok(current)
    }

    /// Absolute path of an item, with an explicit index on every segment.
    pub fn absolute_path(&self, id: WorkItemId) -> Result<WorkPath, WorkItemError> {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.item(current)?.parent() {
            let ordinal = self
                .ordinal_of(current)?
                .ok_or(WorkItemError::ItemNotFound(current))?;
            let workitem_type = self.item(current)?.workitem_type().clone();
            segments.push(PathSegment::child(workitem_type, ordinal));
            current = parent;
        }
        segments.reverse();
        Ok(WorkPath {
            absolute: true,
            segments,
        })
    }
}
