pub mod container;
pub mod material_type;
pub mod query;
pub mod vendor;
pub mod ws;

pub use container::{
    ContainerParameters, ContainerResponse, ContainerUpdateParameters, ContainerUseParameters,
};
pub use material_type::{MaterialTypeParameters, MaterialTypeResponse, MaterialTypeUpdateParameters};
pub use query::{ContainerQuery, MaterialTypeQuery, VendorQuery};
pub use vendor::{VendorParameters, VendorResponse, VendorUpdateParameters};
pub use ws::{ChangeEvent, EventKind, EventPayload, LivenessStatus, WsCloseCode};

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the response header carrying the total number of matches of a
/// search, independent of `limit` / `offset`.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Plain message body, used for errors and delete acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The three kinds of tracked entities.
///
/// The snake_case name doubles as the first topic segment and as the
/// `resource` field of change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Vendor,
    MaterialType,
    Container,
}

impl Resource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Resource::Vendor => "vendor",
            Resource::MaterialType => "material_type",
            Resource::Container => "container",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deserializes a present key into `Some(value)`, so that together with
/// `#[serde(default)]` an absent key stays `None` while an explicit `null`
/// becomes `Some(None)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// RFC 3339 (de)serialization for patch fields of type
/// `Option<Option<OffsetDateTime>>`.
pub(crate) mod rfc3339_patch {
    use serde::{Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S>(value: &Option<Option<OffsetDateTime>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => time::serde::rfc3339::option::serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        time::serde::rfc3339::option::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "present")]
        comment: Option<Option<String>>,
    }

    #[test]
    fn test_absent_null_and_present_are_distinguished() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.comment, None);

        let null: Patch = serde_json::from_str(r#"{"comment":null}"#).unwrap();
        assert_eq!(null.comment, Some(None));

        let set: Patch = serde_json::from_str(r#"{"comment":"hi"}"#).unwrap();
        assert_eq!(set.comment, Some(Some("hi".to_string())));
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(Resource::MaterialType.as_str(), "material_type");
        assert_eq!(
            serde_json::to_string(&Resource::Container).unwrap(),
            r#""container""#
        );
    }
}
