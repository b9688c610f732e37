//! Wire-side model of a peer's resource description.
//!
//! Only the fields the translator reads are modelled; unknown fields are
//! ignored. These types are read-only: the connector never serializes a
//! resource description, it only receives them.

pub mod translate;

pub use translate::MetadataTranslator;

use serde::Deserialize;
use url::Url;

/// A language-tagged literal. Peers send either a plain string or a
/// `{"@value": ..., "@language": ...}` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "LiteralRepr")]
pub struct TypedLiteral {
    pub value: String,
    pub language: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LiteralRepr {
    Plain(String),
    Typed {
        #[serde(rename = "@value")]
        value: String,
        #[serde(rename = "@language", default)]
        language: Option<String>,
    },
}

impl From<LiteralRepr> for TypedLiteral {
    fn from(repr: LiteralRepr) -> Self {
        match repr {
            LiteralRepr::Plain(value) => Self {
                value,
                language: None,
            },
            LiteralRepr::Typed { value, language } => Self { value, language },
        }
    }
}

/// One resource as offered by a peer connector.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDescription {
    #[serde(rename = "@type")]
    pub type_tag: String,
    #[serde(rename = "@id")]
    pub id: Url,
    #[serde(rename = "ids:title", default)]
    pub title: Vec<TypedLiteral>,
    #[serde(rename = "ids:description", default)]
    pub description: Vec<TypedLiteral>,
    #[serde(rename = "ids:keyword", default)]
    pub keyword: Vec<TypedLiteral>,
    #[serde(rename = "ids:representation", default)]
    pub representation: Vec<RepresentationDescription>,
    /// Kept raw; the engine stores the serialized offer, it never evaluates
    /// policy semantics.
    #[serde(rename = "ids:contractOffer", default)]
    pub contract_offer: Vec<serde_json::Value>,
    #[serde(rename = "ids:publisher", default)]
    pub publisher: Option<Url>,
    #[serde(rename = "ids:standardLicense", default)]
    pub standard_license: Option<Url>,
    #[serde(rename = "ids:version", default)]
    pub version: Option<String>,
}

impl ResourceDescription {
    /// Whether the `@type` tag names a resource (and not, say, a connector
    /// self-description that happens to satisfy the field shapes).
    pub fn is_resource(&self) -> bool {
        matches!(self.type_tag.as_str(), "ids:Resource" | "ids:OfferedResource")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepresentationDescription {
    #[serde(rename = "@id")]
    pub id: Url,
    #[serde(rename = "ids:mediaType", default)]
    pub media_type: Option<MediaType>,
    #[serde(rename = "ids:instance", default)]
    pub instance: Vec<ArtifactInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaType {
    #[serde(rename = "ids:filenameExtension", default)]
    pub filename_extension: Option<String>,
}

/// A concrete artifact under a representation.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactInstance {
    #[serde(rename = "ids:byteSize", default)]
    pub byte_size: Option<u64>,
    #[serde(rename = "ids:fileName", default)]
    pub file_name: Option<String>,
}

/// A peer connector's self-description, used as the fallback lookup source
/// when the payload is not a single resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorDescription {
    #[serde(rename = "ids:resourceCatalog", default)]
    pub resource_catalog: Vec<ResourceCatalog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceCatalog {
    #[serde(rename = "ids:offeredResource", default)]
    pub offered_resource: Vec<ResourceDescription>,
}
