use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::richtext::RichText;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

impl Slug {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(rename = "_ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<ImageAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl ImageRef {
    pub fn from_reference(reference: impl Into<String>) -> Self {
        Self {
            asset: Some(ImageAsset {
                reference: reference.into(),
            }),
            alt: None,
        }
    }

    pub fn asset_ref(&self) -> Option<&str> {
        self.asset.as_ref().map(|asset| asset.reference.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<RichText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub title: String,
    pub slug: Slug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: Slug,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: Slug,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(rename = "mainImage", default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub categories: Vec<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RichText>,
}

impl Post {
    pub fn in_any_category(&self, slugs: &[String]) -> bool {
        self.categories
            .iter()
            .any(|category| slugs.iter().any(|slug| *slug == category.slug.current))
    }
}

/// One window of a filtered post listing plus the size of the whole result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: usize,
}

// GROQ projections yield `null` for dereferenced arrays that are absent.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
