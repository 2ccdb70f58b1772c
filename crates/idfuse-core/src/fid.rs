use std::fmt;

/// Fully-qualified identifier: `<source_id>@<local_id>`.
///
/// The source id is the substring before the first `@`. A FID without an
/// `@` separator yields an empty source id, which matches any candidate
/// during merging; callers are warned about such FIDs at merge time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fid(String);

impl Fid {
    pub fn new(source_id: &str, local_id: &str) -> Self {
        Fid(format!("{}@{}", source_id, local_id))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Fid(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring before the first `@`, or empty when malformed.
    pub fn source_id(&self) -> &str {
        match self.0.find('@') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    /// Substring after the first `@`, or the whole string when malformed.
    pub fn local_id(&self) -> &str {
        match self.0.find('@') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    pub fn is_malformed(&self) -> bool {
        !self.0.contains('@')
    }

    /// Substring containment check used by the merge pass to decide whether
    /// two FIDs originate from the same source. An empty source id is
    /// contained in everything.
    pub fn contains_source(&self, source_id: &str) -> bool {
        self.0.contains(source_id)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fid {
    fn from(raw: &str) -> Self {
        Fid(raw.to_string())
    }
}
