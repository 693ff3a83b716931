use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::FeaturedError;

static ARRAY_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"selectedPostIds\b[^=]*=\s*\[([^\]]*)\]").expect("valid array regex")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("valid string regex"));

/// Reads the id list out of the selected-posts source file.
///
/// Blank files hold no ids. Anything else must contain the
/// `selectedPostIds = [...]` literal.
pub fn parse_ids(content: &str) -> Result<Vec<String>, FeaturedError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let body = ARRAY_LITERAL
        .captures(content)
        .and_then(|captures| captures.get(1))
        .ok_or(FeaturedError::Malformed)?
        .as_str();

    let mut ids: Vec<String> = Vec::new();
    for captures in QUOTED.captures_iter(body) {
        let id = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    Ok(ids)
}

pub fn render_ids(ids: &[String]) -> String {
    let mut content = String::from(
        "// Selected post IDs - posts that will be visible on the blog\n\
         export const selectedPostIds: string[] = [\n",
    );
    for id in ids {
        content.push_str(&format!("  \"{}\",\n", id));
    }
    content.push_str("]\n");
    content
}

/// Ids must survive a write and re-read unchanged, so surrounding
/// whitespace is rejected along with characters that would break the literal.
pub fn validate_id(id: &str) -> Result<(), FeaturedError> {
    if id.trim().is_empty()
        || id.trim() != id
        || id.contains(['"', '\'', '\\', '\n', '\r', ']'])
    {
        return Err(FeaturedError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Adds (appending) or removes `id`. Returns whether the list changed.
pub fn apply_toggle(ids: &mut Vec<String>, id: &str, featured: bool) -> bool {
    let position = ids.iter().position(|existing| existing == id);
    match (featured, position) {
        (true, None) => {
            ids.push(id.to_string());
            true
        }
        (false, Some(index)) => {
            ids.remove(index);
            true
        }
        _ => false,
    }
}

/// The selected-post id list persisted as a source file.
pub struct FeaturedStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

pub type SharedFeaturedStore = Arc<FeaturedStore>;

impl FeaturedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<String>, FeaturedError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_ids(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No selected posts file at {:?}", self.path);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, id: &str) -> Result<bool, FeaturedError> {
        Ok(self.load().await?.iter().any(|existing| existing == id))
    }

    /// Rewrites the whole file through a temporary sibling and a rename.
    pub async fn save(&self, ids: &[String]) -> Result<(), FeaturedError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, render_ids(ids)).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Read-modify-write of one id. Concurrent calls within this process
    /// are serialized; other writers to the same file are not.
    pub async fn set_featured(&self, id: &str, featured: bool) -> Result<Vec<String>, FeaturedError> {
        validate_id(id)?;

        let _guard = self.write_lock.lock().await;
        let mut ids = self.load().await?;

        if apply_toggle(&mut ids, id, featured) {
            self.save(&ids).await?;
            info!(
                "Post {} {} selected posts ({} total)",
                id,
                if featured { "added to" } else { "removed from" },
                ids.len()
            );
        } else {
            debug!("Post {} already {}", id, if featured { "selected" } else { "hidden" });
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"// Selected post IDs - posts that will be visible on the blog
export const selectedPostIds: string[] = [
  "0b1c2d",
  'drafts.abc',
  "f00",
]
"#;

    #[test]
    fn test_parse_source_file() {
        assert_eq!(parse_ids(SAMPLE).unwrap(), vec!["0b1c2d", "drafts.abc", "f00"]);
    }

    #[test]
    fn test_parse_inline_and_empty_arrays() {
        assert_eq!(
            parse_ids(r#"export const selectedPostIds: string[] = ["a", "b", "a"]"#).unwrap(),
            vec!["a", "b"]
        );
        assert!(parse_ids("export const selectedPostIds: string[] = []\n").unwrap().is_empty());
        assert!(parse_ids("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_unrelated_content() {
        assert!(matches!(parse_ids("const other = 1"), Err(FeaturedError::Malformed)));
    }

    #[test]
    fn test_render_round_trip() {
        let ids = vec!["x1".to_string(), "y2".to_string()];
        let rendered = render_ids(&ids);
        assert_eq!(
            rendered,
            "// Selected post IDs - posts that will be visible on the blog\nexport const selectedPostIds: string[] = [\n  \"x1\",\n  \"y2\",\n]\n"
        );
        assert_eq!(parse_ids(&rendered).unwrap(), ids);
        assert!(parse_ids(&render_ids(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_apply_toggle() {
        let mut ids = vec!["a".to_string()];
        assert!(apply_toggle(&mut ids, "b", true));
        assert!(!apply_toggle(&mut ids, "b", true));
        assert_eq!(ids, vec!["a", "b"]);
        assert!(apply_toggle(&mut ids, "a", false));
        assert!(!apply_toggle(&mut ids, "missing", false));
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("abc-123").is_ok());
        for bad in ["", "  ", " abc ", "abc\t", "a\"b", "a\nb", "a\\b", "x]"] {
            assert!(validate_id(bad).is_err(), "{:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FeaturedStore::new(temp_dir.path().join("data/selected-posts.ts"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_on_then_off_restores_set() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data/selected-posts.ts");
        let store = FeaturedStore::new(&path);
        store
            .save(&["keep-1".to_string(), "keep-2".to_string()])
            .await
            .unwrap();
        let original = store.load().await.unwrap();

        let after_on = store.set_featured("new-post", true).await.unwrap();
        assert_eq!(after_on, vec!["keep-1", "keep-2", "new-post"]);
        assert!(store.contains("new-post").await.unwrap());

        let after_off = store.set_featured("new-post", false).await.unwrap();
        assert_eq!(after_off, original);
        assert_eq!(store.load().await.unwrap(), original);
        assert!(!path.with_extension("ts.tmp").exists());
    }

    #[tokio::test]
    async fn test_concurrent_toggles_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FeaturedStore::new(temp_dir.path().join("selected.ts")));

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set_featured(&format!("post-{}", i), true).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_invalid_id_is_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("selected.ts");
        let store = FeaturedStore::new(&path);

        assert!(matches!(
            store.set_featured("bad\"id", true).await,
            Err(FeaturedError::InvalidId(_))
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_padded_id_is_rejected_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("selected.ts");
        let store = FeaturedStore::new(&path);
        store.save(&["keep".to_string()]).await.unwrap();

        assert!(matches!(
            store.set_featured(" abc ", true).await,
            Err(FeaturedError::InvalidId(_))
        ));
        assert_eq!(store.load().await.unwrap(), vec!["keep"]);

        store.set_featured("abc", true).await.unwrap();
        let after_off = store.set_featured("abc", false).await.unwrap();
        assert_eq!(after_off, vec!["keep"]);
        assert_eq!(store.load().await.unwrap(), vec!["keep"]);
    }
}
