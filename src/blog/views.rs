use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    cms::{CategoryRef, ImageUrlBuilder, Post},
    richtext::{RichTextRenderer, TocEntry, table_of_contents},
};

const CARD_IMAGE_WIDTH: u32 = 600;
const CARD_IMAGE_HEIGHT: u32 = 400;
const HERO_IMAGE_WIDTH: u32 = 1200;
const AVATAR_SIZE: u32 = 96;

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn format_short_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLink {
    pub title: String,
    pub slug: String,
    pub url: String,
}

impl From<&CategoryRef> for CategoryLink {
    fn from(category: &CategoryRef) -> Self {
        Self {
            title: category.title.clone(),
            slug: category.slug.current.clone(),
            url: format!("/category/{}", urlencoding::encode(&category.slug.current)),
        }
    }
}

/// A post as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub excerpt: Option<String>,
    pub date: Option<String>,
    pub date_formatted: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub author_name: Option<String>,
    pub categories: Vec<CategoryLink>,
}

impl PostCard {
    pub fn from_post(post: &Post, images: &ImageUrlBuilder) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            slug: post.slug.current.clone(),
            url: format!("/posts/{}", urlencoding::encode(&post.slug.current)),
            excerpt: post.excerpt.clone().filter(|excerpt| !excerpt.trim().is_empty()),
            date: post.published_at.map(|date| date.to_rfc3339()),
            date_formatted: post.published_at.as_ref().map(format_date),
            image_url: post.main_image.as_ref().and_then(|image| {
                images.url(image, Some(CARD_IMAGE_WIDTH), Some(CARD_IMAGE_HEIGHT))
            }),
            image_alt: post
                .main_image
                .as_ref()
                .and_then(|image| image.alt.clone())
                .unwrap_or_else(|| post.title.clone()),
            author_name: post.author.as_ref().map(|author| author.name.clone()),
            categories: post.categories.iter().map(CategoryLink::from).collect(),
        }
    }

    pub fn from_posts(posts: &[Post], images: &ImageUrlBuilder) -> Vec<Self> {
        posts.iter().map(|post| Self::from_post(post, images)).collect()
    }
}

/// A full post page: card fields plus rendered body and table of contents.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub card: PostCard,
    pub hero_image_url: Option<String>,
    pub author_image_url: Option<String>,
    pub author_bio_html: Option<String>,
    pub body_html: String,
    pub toc: Vec<TocEntry>,
    pub has_toc: bool,
}

impl PostDetail {
    pub fn from_post(post: &Post, images: &ImageUrlBuilder) -> Self {
        let renderer = RichTextRenderer::new(images);
        let body = post.body.as_deref().unwrap_or_default();
        let toc = table_of_contents(body);

        Self {
            card: PostCard::from_post(post, images),
            hero_image_url: post
                .main_image
                .as_ref()
                .and_then(|image| images.url(image, Some(HERO_IMAGE_WIDTH), None)),
            author_image_url: post
                .author
                .as_ref()
                .and_then(|author| author.image.as_ref())
                .and_then(|image| images.url(image, Some(AVATAR_SIZE), Some(AVATAR_SIZE))),
            author_bio_html: post
                .author
                .as_ref()
                .and_then(|author| author.bio.as_deref())
                .filter(|bio| !bio.is_empty())
                .map(|bio| renderer.render(bio)),
            body_html: renderer.render(body),
            has_toc: !toc.is_empty(),
            toc,
        }
    }
}
