use super::{ConnectorDescription, ResourceDescription};
use crate::error::TranslationError;
use crate::model::{BackendSource, Representation, ResourceMetadata};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Maps a received resource description to the internal metadata model.
///
/// Deterministic and side-effect-free: repeated translation of the same
/// description yields a field-identical record.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataTranslator;

impl MetadataTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Resolves the resource description carried in a response payload.
    ///
    /// Two-step pipeline: first try the payload as a single resource; only on
    /// that failure parse it as a connector self-description and scan the
    /// first catalog's offered resources for `resource_id`. First match wins.
    pub fn resolve_resource(
        &self,
        payload: &str,
        resource_id: &Url,
    ) -> Result<ResourceDescription, TranslationError> {
        match Self::try_direct(payload) {
            Ok(resource) => Ok(resource),
            Err(_) => self.find_in_catalog(payload, resource_id),
        }
    }

    fn try_direct(payload: &str) -> Result<ResourceDescription, String> {
        let resource: ResourceDescription =
            serde_json::from_str(payload).map_err(|e| e.to_string())?;
        if resource.is_resource() {
            Ok(resource)
        } else {
            Err(format!("payload is a {}, not a resource", resource.type_tag))
        }
    }

    /// Linear scan of the first resource catalog of a connector
    /// self-description, matching by resource id identity.
    pub fn find_in_catalog(
        &self,
        payload: &str,
        resource_id: &Url,
    ) -> Result<ResourceDescription, TranslationError> {
        let unresolvable = || TranslationError::UnresolvableResource {
            resource_id: resource_id.clone(),
        };

        let connector: ConnectorDescription =
            serde_json::from_str(payload).map_err(|_| unresolvable())?;
        let catalog = connector.resource_catalog.first().ok_or_else(unresolvable)?;
        catalog
            .offered_resource
            .iter()
            .find(|resource| resource.id == *resource_id)
            .cloned()
            .ok_or_else(unresolvable)
    }

    /// Builds the durable metadata record. Either fully succeeds or fails
    /// before any persistence call is attempted.
    pub fn translate(
        &self,
        resource: &ResourceDescription,
    ) -> Result<ResourceMetadata, TranslationError> {
        let mut representations = BTreeMap::new();
        for description in &resource.representation {
            // All artifact fields come from the first instance only; a
            // representation without instances is valid and empty.
            let (byte_size, file_name, media_type) = match description.instance.first() {
                Some(instance) => (
                    instance.byte_size.unwrap_or(0),
                    instance.file_name.clone(),
                    description
                        .media_type
                        .as_ref()
                        .and_then(|m| m.filename_extension.clone()),
                ),
                None => (0, None, None),
            };

            let representation = Representation {
                id: uuid_from_uri(&description.id),
                media_type,
                byte_size,
                file_name,
                source: BackendSource::Local,
            };
            representations.insert(representation.id, representation);
        }

        let policy = match resource.contract_offer.first() {
            Some(offer) => Some(serde_json::to_string(offer).map_err(|e| {
                TranslationError::MetadataDeserialization(format!(
                    "contract offer could not be serialized: {e}"
                ))
            })?),
            None => None,
        };

        Ok(ResourceMetadata {
            title: resource.title.first().map(|t| t.value.clone()),
            description: resource.description.first().map(|t| t.value.clone()),
            keywords: resource.keyword.iter().map(|k| k.value.clone()).collect(),
            representations,
            policy,
            owner: resource.publisher.clone(),
            license: resource.standard_license.clone(),
            version: resource.version.clone(),
        })
    }
}

/// Derives a stable UUID from a resource or representation URI.
///
/// A trailing UUID segment (path or urn) is used directly; any other URI maps
/// to a UUIDv5 of its full text, so the result is total and deterministic.
pub fn uuid_from_uri(uri: &Url) -> Uuid {
    let text = uri.as_str();
    let tail = text
        .rsplit(|c| c == '/' || c == ':' || c == '#')
        .next()
        .unwrap_or(text);
    tail.parse()
        .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_URL, text.as_bytes()))
}
