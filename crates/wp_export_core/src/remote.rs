//! Payload shapes returned by the WordPress REST API.
//!
//! Only the fields the exporter reads are modelled; everything else in the
//! response is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCategory {
    pub id: u64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemotePost {
    pub id: u64,
    pub slug: String,
    pub title: Rendered,
    pub status: String,
    pub author: u64,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
    #[serde(default)]
    pub featured_media: u64,
    pub content: Rendered,
    pub date: String,
    pub modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteMedia {
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTag {
    pub id: u64,
    pub name: String,
}
