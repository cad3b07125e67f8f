use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, warn};

use crate::error::{Error, Result};

pub const PULL_FILE_EXTENSIONS: &[&str] = &["log", "json", "mp4"];
pub const PUSH_FILE_EXTENSIONS: &[&str] = &["json", "txt", "mp4", "log"];

/// The only subdirectories that exist under the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSubdir {
    Videos,
    VacancyDescriptions,
    SourcingCriteria,
    Negotiations,
    Resumes,
}

impl DataSubdir {
    pub const ALL: [DataSubdir; 5] = [
        DataSubdir::Videos,
        DataSubdir::VacancyDescriptions,
        DataSubdir::SourcingCriteria,
        DataSubdir::Negotiations,
        DataSubdir::Resumes,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            DataSubdir::Videos => "videos",
            DataSubdir::VacancyDescriptions => "vacancy_descriptions",
            DataSubdir::SourcingCriteria => "sourcing_criteria",
            DataSubdir::Negotiations => "negotiations",
            DataSubdir::Resumes => "resumes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|subdir| subdir.dir_name() == name)
    }
}

#[derive(Debug, Clone)]
pub struct UserDataDirs {
    root: PathBuf,
}

impl UserDataDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root and every subdirectory. Safe to call repeatedly.
    pub async fn ensure_layout(&self) -> Result<()> {
        for subdir in DataSubdir::ALL {
            self.subdirectory(subdir).await?;
        }
        Ok(())
    }

    pub async fn subdirectory(&self, subdir: DataSubdir) -> Result<PathBuf> {
        let path = self.root.join(subdir.dir_name());
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Resolves an allow-listed subdirectory by name, creating it on first use.
    /// Any other name yields `None` without touching the filesystem.
    pub async fn get_subdirectory(&self, name: &str) -> Option<PathBuf> {
        let Some(subdir) = DataSubdir::from_name(name) else {
            warn!(name, "Requested data subdirectory is not allowed");
            return None;
        };
        match self.subdirectory(subdir).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(name, error = %e, "Failed to create data subdirectory");
                None
            }
        }
    }

    /// `<root>/<subdir>/<record_id>.<extension>`. The identifier must be a
    /// single plain path segment.
    pub async fn record_file_path(
        &self,
        subdir: DataSubdir,
        record_id: &str,
        extension: &str,
    ) -> Result<PathBuf> {
        if !is_safe_segment(record_id) || !is_safe_segment(extension) {
            return Err(Error::BadRequest(format!(
                "Invalid record file name: {}.{}",
                record_id, extension
            )));
        }
        let dir = self.subdirectory(subdir).await?;
        Ok(dir.join(format!("{}.{}", record_id, extension)))
    }

    /// Maps an admin-supplied relative path onto the data root. Absolute
    /// paths and `..` are refused, and the extension must be allow-listed.
    pub fn resolve_admin_file(&self, relative: &str, allowed_extensions: &[&str]) -> Result<PathBuf> {
        let relative_path = Path::new(relative.trim());
        if relative_path.as_os_str().is_empty() {
            return Err(Error::BadRequest("File path is empty".to_string()));
        }
        if !relative_path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(Error::BadRequest(format!(
                "Invalid file relative path '{}'. Only paths inside the data directory are allowed",
                relative
            )));
        }

        let extension = relative_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !allowed_extensions.contains(&extension.as_str()) {
            return Err(Error::BadRequest(format!(
                "Invalid file extension.\nValid: {}",
                format_extensions(allowed_extensions)
            )));
        }

        let resolved = self.root.join(relative_path);
        debug!(relative, resolved = %resolved.display(), "Resolved admin file path");
        Ok(resolved)
    }

    pub fn display_relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

pub fn has_allowed_extension(file_name: &str, allowed_extensions: &[&str]) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed_extensions.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn format_extensions(extensions: &[&str]) -> String {
    extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
