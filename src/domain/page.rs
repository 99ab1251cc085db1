//! Tracked pages as owned by the storage service

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque page identifier assigned by the storage service
///
/// The service may emit it as a JSON string or an integer; it is always
/// carried (and sent back) as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Signed(id) => Self(id.to_string()),
            RawId::Unsigned(id) => Self(id.to_string()),
        })
    }
}

/// A page whose origin is tracked for field metrics
///
/// Decoded from either `_id` or `id`; when a document carries both, `_id` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPage")]
pub struct Page {
    pub id: PageId,
    pub url: String,
}

/// Page document as listed by the storage service
#[derive(Deserialize)]
struct RawPage {
    #[serde(rename = "_id", default)]
    document_id: Option<PageId>,
    #[serde(default)]
    id: Option<PageId>,
    url: String,
}

impl TryFrom<RawPage> for Page {
    type Error = String;

    fn try_from(raw: RawPage) -> Result<Self, Self::Error> {
        let id = raw
            .document_id
            .or(raw.id)
            .ok_or_else(|| format!("page {} has neither _id nor id", raw.url))?;
        Ok(Self { id, url: raw.url })
    }
}

impl Page {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: PageId::new(id),
            url: url.into(),
        }
    }
}
