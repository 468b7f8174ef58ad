//! Blob, tag-object, and ref DTOs (the plumbing object surface).

use base64::Engine as _;
use serde::Serialize;

use crate::git::store::{Blob, ObjectKind, Ref, Tag};
use crate::models::commit::SignatureDto;
use crate::models::links::ApiUrls;

/// `{sha, type, url}` triple for a ref or tag target.
#[derive(Debug, Clone, Serialize)]
pub struct TypedObjectLink {
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: String,
}

impl TypedObjectLink {
    pub fn new(urls: &ApiUrls<'_>, kind: ObjectKind, sha: &str) -> Self {
        Self {
            sha: sha.to_string(),
            kind: kind.as_str(),
            url: urls.object(kind, sha),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlobDto {
    pub url: String,
    pub sha: String,
    pub size: u64,
    /// `utf-8` with the text inline, or `base64` for everything else.
    pub encoding: &'static str,
    pub data: String,
}

impl BlobDto {
    pub fn new(urls: &ApiUrls<'_>, blob: &Blob) -> Self {
        let (encoding, data) = match std::str::from_utf8(&blob.content) {
            Ok(text) => ("utf-8", text.to_string()),
            Err(_) => (
                "base64",
                base64::engine::general_purpose::STANDARD.encode(&blob.content),
            ),
        };
        Self {
            url: urls.blob(blob.id.as_str()),
            sha: blob.id.to_string(),
            size: blob.size(),
            encoding,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagDto {
    pub url: String,
    pub sha: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagger: Option<SignatureDto>,
    pub message: String,
    pub object: TypedObjectLink,
}

impl TagDto {
    pub fn new(urls: &ApiUrls<'_>, tag: &Tag) -> Self {
        Self {
            url: urls.tag(tag.id.as_str()),
            sha: tag.id.to_string(),
            tag: tag.name.clone(),
            tagger: tag.tagger.as_ref().map(SignatureDto::new),
            message: tag.message.clone(),
            object: TypedObjectLink::new(urls, tag.target_kind, tag.target.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefDto {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub url: String,
    pub object: TypedObjectLink,
}

impl RefDto {
    pub fn new(urls: &ApiUrls<'_>, reference: &Ref, target_kind: ObjectKind) -> Self {
        Self {
            ref_name: reference.name.clone(),
            url: urls.reference(&reference.name),
            object: TypedObjectLink::new(urls, target_kind, reference.target.as_str()),
        }
    }
}
