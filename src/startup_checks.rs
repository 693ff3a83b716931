use crate::{CmsProviderConfig, Config, admin::AdminAuth};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create data directory {0}: {1}")]
    DataDirectoryCreationFailed(String, std::io::Error),

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,

    #[error("Templates directory does not exist")]
    TemplateDirectoryMissing,

    #[error("Content export file does not exist: {0}")]
    ContentFileMissing(String),

    #[error("CMS project id is not configured")]
    ProjectIdMissing,

    #[error("Selected posts file is unreadable: {0}")]
    SelectedPostsUnreadable(String),
}

impl StartupCheckError {
    /// Whether the server cannot do useful work with this problem.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::ContentFileMissing(_)
                | StartupCheckError::ProjectIdMissing
                | StartupCheckError::DataDirectoryCreationFailed(..)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    match &config.cms.provider {
        CmsProviderConfig::Sanity(_) => {
            if config.cms.project_id.trim().is_empty() {
                error!("cms.project_id is empty");
                errors.push(StartupCheckError::ProjectIdMissing);
            } else {
                info!(
                    "CMS project {} dataset {}",
                    config.cms.project_id, config.cms.dataset
                );
            }
        }
        CmsProviderConfig::File(file_config) => {
            if file_config.path.is_file() {
                info!("Content export file exists: {:?}", file_config.path);
            } else {
                error!("Content export file does not exist: {:?}", file_config.path);
                errors.push(StartupCheckError::ContentFileMissing(
                    file_config.path.display().to_string(),
                ));
            }
        }
    }

    // The selected-posts file may be absent, but its directory must be writable.
    if let Some(data_dir) = config.featured.path.parent()
        && !data_dir.as_os_str().is_empty()
        && !data_dir.exists()
    {
        info!("Data directory does not exist, creating: {:?}", data_dir);
        if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
            error!("Failed to create data directory: {}", e);
            errors.push(StartupCheckError::DataDirectoryCreationFailed(
                data_dir.display().to_string(),
                e,
            ));
        }
    }

    let store = crate::featured::FeaturedStore::new(config.featured.path.clone());
    match store.load().await {
        Ok(ids) => info!("{} posts selected for display", ids.len()),
        Err(e) => {
            error!("Selected posts file {:?} is unreadable: {}", store.path(), e);
            errors.push(StartupCheckError::SelectedPostsUnreadable(e.to_string()));
        }
    }

    let static_dir = Path::new(&config.static_files.directory);
    if !static_dir.exists() {
        warn!("Static files directory does not exist: {:?}", static_dir);
        errors.push(StartupCheckError::StaticDirectoryMissing);
    } else {
        info!("Static files directory exists: {:?}", static_dir);
    }

    let templates_dir = Path::new(&config.templates.directory);
    if !templates_dir.exists() {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        warn!("This may cause issues with page rendering");
        errors.push(StartupCheckError::TemplateDirectoryMissing);
    } else {
        info!("Templates directory exists: {:?}", templates_dir);
    }

    if AdminAuth::from_config(&config.admin).is_default_password() {
        warn!("Admin password is the built-in default; set ADMIN_PASSWORD or admin.password");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileSourceConfig;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.templates.directory = dir.join("templates");
        config.static_files.directory = dir.join("static");
        config.featured.path = dir.join("data/selected-posts.ts");
        config.cms.provider = CmsProviderConfig::File(FileSourceConfig {
            path: dir.join("content.json"),
        });
        config
    }

    #[tokio::test]
    async fn test_checks_pass_and_create_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("templates")).unwrap();
        std::fs::create_dir(temp_dir.path().join("static")).unwrap();
        std::fs::write(temp_dir.path().join("content.json"), "{}").unwrap();

        let config = config_in(temp_dir.path());
        assert!(perform_startup_checks(&config).await.is_ok());
        assert!(temp_dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn test_missing_content_file_is_critical() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert!(errors.iter().any(|e| e.is_critical()));
        assert!(errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::StaticDirectoryMissing)));
        assert!(!StartupCheckError::StaticDirectoryMissing.is_critical());
    }
}
