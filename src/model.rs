use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use url::Url;
use uuid::Uuid;

/// Internal metadata record for a resource requested from a peer connector.
///
/// Created once per successful description exchange; a later exchange for the
/// same external resource overwrites it wholesale. Never partially written —
/// translation either fully succeeds or the caller fails before any
/// persistence call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source order is preserved.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Keyed by representation id; the map key guarantees uniqueness.
    #[serde(default)]
    pub representations: BTreeMap<Uuid, Representation>,
    /// Serialized form of the first contract offer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One concrete encoded variant of an offered resource's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representation {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub byte_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub source: BackendSource,
}

/// Where the artifact bytes physically live. Newly negotiated resources
/// always start as a local placeholder until data is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSource {
    Local,
}

impl Default for BackendSource {
    fn default() -> Self {
        Self::Local
    }
}

/// Query parameters and headers forwarded to the provider's backend when
/// fetching artifact data. Transient; shaped into the artifact request and
/// never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInput {
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl QueryInput {
    /// Rejects any entry whose key or value is blank after trimming, in
    /// either map. Checked before any network call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (key, value) in &self.headers {
            if key.trim().is_empty() || value.trim().is_empty() {
                return Err(ValidationError::InvalidQueryInput(format!(
                    "header key or value must not be blank or empty (key: {key:?}, value: {value:?})"
                )));
            }
        }
        for (key, value) in &self.params {
            if key.trim().is_empty() || value.trim().is_empty() {
                return Err(ValidationError::InvalidQueryInput(
                    "param key or value must not be blank or empty".into(),
                ));
            }
        }
        Ok(())
    }
}
