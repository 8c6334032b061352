use std::borrow::Borrow;
use std::fmt;

use compact_str::{CompactString, ToCompactString};
use resinkeep_sdk::objects::Resource;
use smallvec::SmallVec;

/// A non-empty, ordered tuple of segments naming a notification scope.
///
/// `(container)` addresses every container, `(container, 7)` one of them.
/// A subscriber of a topic also receives everything published below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(SmallVec<[CompactString; 2]>);

impl Topic {
    /// Returns `None` for an empty segment list.
    pub fn new<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        let segments: SmallVec<[CompactString; 2]> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    pub fn resource(resource: Resource) -> Self {
        Self(smallvec::smallvec![CompactString::const_new(resource.as_str())])
    }

    pub fn entity(resource: Resource, id: i64) -> Self {
        Self(smallvec::smallvec![
            CompactString::const_new(resource.as_str()),
            id.to_compact_string(),
        ])
    }

    pub fn segments(&self) -> &[CompactString] {
        &self.0
    }

    /// Every prefix of this topic, shortest first, ending with the topic
    /// itself.
    pub fn prefixes(&self) -> impl Iterator<Item = &[CompactString]> {
        (1..=self.0.len()).map(|len| &self.0[..len])
    }
}

impl Borrow<[CompactString]> for Topic {
    fn borrow(&self) -> &[CompactString] {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}
