#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use inkpress::{
    AppState, Config, create_router,
    admin::{AdminAuth, CookieMode},
    cms::{Category, CategoryRef, ImageRef, Post, Slug, memory::MemorySource},
    featured::store::render_ids,
    richtext::{Block, Node, Span},
};
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;

pub const PASSWORD: &str = "test-password";

pub struct TestBlog {
    pub server: TestServer,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestBlog {
    pub fn selected_file(&self) -> PathBuf {
        self.dir.path().join("data/selected-posts.ts")
    }

    pub fn session_cookie(&self) -> String {
        let cookie = self.state.admin.session_cookie().unwrap();
        cookie.split(';').next().unwrap().to_string()
    }
}

fn category(slug: &str, title: &str) -> Category {
    Category {
        id: format!("category-{}", slug),
        title: title.to_string(),
        slug: Slug::new(slug),
        description: Some(format!("Posts about {}", title)),
    }
}

fn category_ref(slug: &str, title: &str) -> CategoryRef {
    CategoryRef {
        title: title.to_string(),
        slug: Slug::new(slug),
    }
}

/// Fifteen posts: `post-1` is the newest. Odd posts are about security,
/// even posts about tooling, and posts 11-15 were published in 2023.
pub fn sample_posts() -> Vec<Post> {
    (1..=15)
        .map(|n: u32| {
            let published_at = if n > 10 {
                Utc.with_ymd_and_hms(2023, 6, 30 - n, 9, 0, 0).unwrap()
            } else {
                Utc.with_ymd_and_hms(2024, 12, 31 - n, 9, 0, 0).unwrap()
            };
            let (slug, title) = if n % 2 == 1 {
                ("security", "Security")
            } else {
                ("tooling", "Tooling")
            };
            Post {
                id: format!("post-{}", n),
                title: format!("Post number {}", n),
                slug: Slug::new(format!("post-{}", n)),
                published_at: Some(published_at),
                excerpt: Some(format!("Excerpt {}", n)),
                main_image: Some(ImageRef::from_reference(format!("image-hash{}-800x600-jpg", n))),
                author: None,
                categories: vec![category_ref(slug, title)],
                body: Some(vec![
                    Node::Block(Block {
                        style: "h2".to_string(),
                        children: vec![Span::text("Overview")],
                        ..Block::default()
                    }),
                    Node::Block(Block {
                        children: vec![Span::text(format!("Body of post {}", n))],
                        ..Block::default()
                    }),
                ]),
            }
        })
        .collect()
}

pub fn sample_categories() -> Vec<Category> {
    vec![category("tooling", "Tooling"), category("security", "Security")]
}

pub fn all_ids() -> Vec<String> {
    (1..=15).map(|n| format!("post-{}", n)).collect()
}

/// Server over the shipped templates, with `selected` visible posts.
pub fn setup(selected: &[String]) -> TestBlog {
    let dir = TempDir::new().unwrap();
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let mut config = Config::default();
    config.app.name = "Test Blog".to_string();
    config.templates.directory = root.join("templates");
    config.static_files.directory = root.join("static");
    config.cms.project_id = "proj".to_string();
    config.featured.path = dir.path().join("data/selected-posts.ts");

    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(&config.featured.path, render_ids(selected)).unwrap();

    let content = Arc::new(MemorySource::new(sample_posts(), sample_categories()));
    let mut state = AppState::new(config, content);
    state.admin = AdminAuth::new(PASSWORD, CookieMode::Plain, false, 7);

    let server = TestServer::new(create_router(state.clone()).into_make_service()).unwrap();
    TestBlog { server, state, dir }
}
