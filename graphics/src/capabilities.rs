//! Graphics context capabilities.
//!
//! A [`CapabilitySet`] is an immutable snapshot of the API version and the
//! extensions exposed by the active graphics context. It is taken once when
//! a [`StreamerFactory`](crate::stream::StreamerFactory) is created and never
//! re-queried afterwards.

use std::collections::BTreeSet;
use std::fmt;

/// A `major.minor` graphics API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    /// Major version number.
    pub major: u32,
    /// Minor version number.
    pub minor: u32,
}

impl ApiVersion {
    /// Create a new version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Snapshot of what the active graphics context supports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    version: ApiVersion,
    extensions: BTreeSet<String>,
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl CapabilitySet {
    /// Create a capability set from a version and a list of extension names.
    pub fn new<I, S>(version: ApiVersion, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the context version.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Iterate over the supported extension names in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Check if an extension is supported.
    pub fn supports_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    /// Check whether the context satisfies a requirement.
    ///
    /// A requirement holds when the context version is at least
    /// `major.minor`, or when the optional extension is exposed.
    pub fn has_capabilities(&self, major: u32, minor: u32, extension: Option<&str>) -> bool {
        self.version >= ApiVersion::new(major, minor)
            || extension.is_some_and(|name| self.supports_extension(name))
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version {} with {} extensions",
            self.version,
            self.extensions.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(ApiVersion::new(4, 4) > ApiVersion::new(3, 3));
        assert!(ApiVersion::new(3, 10) > ApiVersion::new(3, 2));
        assert_eq!(ApiVersion::new(2, 1).to_string(), "2.1");
    }

    #[test]
    fn test_has_capabilities_by_version() {
        let caps = CapabilitySet::new(ApiVersion::new(3, 3), Vec::<String>::new());
        assert!(caps.has_capabilities(3, 0, None));
        assert!(caps.has_capabilities(3, 3, Some("GL_ARB_buffer_storage")));
        assert!(!caps.has_capabilities(4, 4, Some("GL_ARB_buffer_storage")));
    }

    #[test]
    fn test_has_capabilities_by_extension() {
        let caps = CapabilitySet::new(ApiVersion::new(2, 1), ["GL_ARB_vertex_array_object"]);
        assert!(caps.has_capabilities(3, 0, Some("GL_ARB_vertex_array_object")));
        assert!(!caps.has_capabilities(3, 0, None));
    }

    #[test]
    fn test_extensions_sorted() {
        let caps = CapabilitySet::new(ApiVersion::new(1, 5), ["b", "a", "c"]);
        let names: Vec<_> = caps.extensions().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
