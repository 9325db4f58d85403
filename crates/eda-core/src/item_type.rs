//! Work item type names.

use crate::error::WorkItemError;
use std::fmt;

/// Characters that would make a type name ambiguous inside a path.
const RESERVED: [char; 3] = ['/', '[', ']'];

/// Validated work item type name.
///
/// A type name is non-empty, contains no whitespace and none of the
/// characters the path notation reserves (`/`, `[`, `]`). The names `.`
/// and `..` are taken by path segments as well.
///
/// # Examples
///
/// ```
/// use eda_core::WorkItemType;
///
/// let order = WorkItemType::new("Order")?;
/// assert_eq!(order.as_str(), "Order");
///
/// assert!(WorkItemType::new("Line Item").is_err());
/// # Ok::<(), eda_core::WorkItemError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItemType(String);

impl WorkItemType {
    /// Creates a new WorkItemType, rejecting names that are not valid.
    pub fn new(name: impl Into<String>) -> Result<Self, WorkItemError> {
        let name = name.into();
        if let Some(reason) = invalid_reason(&name) {
            return Err(WorkItemError::InvalidType { name, reason });
        }
        Ok(Self(name))
    }

    /// Derives a type name from a Rust type (last path segment).
    ///
    /// Generic arguments and anything else a type name may not contain are
    /// cut off, so this never fails.
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let base = full_name.split('<').next().unwrap_or(full_name);
        let short_name = base.rsplit("::").next().unwrap_or(base);
        let cleaned: String = short_name
            .chars()
            .filter(|c| !c.is_whitespace() && !RESERVED.contains(c) && *c != '&')
            .collect();
        if cleaned.is_empty() {
            Self("WorkItem".to_string())
        } else {
            Self(cleaned)
        }
    }

    /// Returns the type name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("type name must not be empty")
    } else if name.chars().any(char::is_whitespace) {
        Some("type name must not contain whitespace")
    } else if name.contains(RESERVED) {
        Some("type name must not contain '/', '[' or ']'")
    } else if name == "." || name == ".." {
        Some("type name must not be '.' or '..'")
    } else {
        None
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for WorkItemType {
    type Error = WorkItemError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for WorkItemType {
    type Error = WorkItemError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl std::str::FromStr for WorkItemType {
    type Err = WorkItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for WorkItemType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for WorkItemType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for WorkItemType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkItemType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A Rust type that stands for a work item type.
///
/// The default name is derived from the implementing type. Use
/// [`define_workitem!`](crate::define_workitem) to declare one in a line.
pub trait WorkItemKind {
    /// Returns the work item type this Rust type stands for.
    fn workitem_type() -> WorkItemType {
        WorkItemType::from_type_name::<Self>()
    }
}

/// Declares a unit struct that names a work item type.
///
/// The struct gets a `NAME` constant and a [`WorkItemKind`] impl.
///
/// # Example
///
/// ```rust
/// use eda_core::{define_workitem, WorkItemKind};
///
/// define_workitem!(Order);
/// assert_eq!(Order::NAME, "Order");
/// assert_eq!(Order::workitem_type().as_str(), "Order");
/// ```
#[macro_export]
macro_rules! define_workitem {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl $name {
            /// Work item type name as a compile-time constant
            #[allow(dead_code)]
            pub const NAME: &'static str = stringify!($name);
        }

        impl $crate::WorkItemKind for $name {}
    };
}
