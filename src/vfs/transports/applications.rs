/*!
 * Applications Transport
 * Installed packages presented as read-only pseudo files
 */

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::core::limits::{APPLICATIONS_ROOT, APPLICATION_MIME};
use crate::packages::{PackageMetadata, PackageRegistry, PackageType};
use crate::vfs::mount::{MountOptions, Mountpoint};
use crate::vfs::paths;
use crate::vfs::traits::Transport;
use crate::vfs::types::*;

/// Lists launchable packages as `applications:///<id>`
pub struct ApplicationsTransport {
    packages: Arc<PackageRegistry>,
}

impl ApplicationsTransport {
    pub fn new(packages: Arc<PackageRegistry>) -> Self {
        Self { packages }
    }

    /// The mount this transport always lives behind: read-only, special, searchable
    pub fn mountpoint(packages: Arc<PackageRegistry>) -> Mountpoint {
        Mountpoint::new("applications", Arc::new(Self::new(packages)))
            .with_root(APPLICATIONS_ROOT)
            .with_options(MountOptions {
                read_only: true,
                special: true,
                searchable: true,
                description: Some("Applications".into()),
                ..MountOptions::default()
            })
    }

    fn listed(&self) -> Vec<PackageMetadata> {
        self.packages
            .packages(true)
            .into_iter()
            .filter(|p| p.package_type != PackageType::Extension)
            .collect()
    }
}

/// Pseudo file for a package
pub fn application_entry(package: &PackageMetadata) -> FileMetadata {
    let mut entry = FileMetadata::new(
        format!("{}{}", APPLICATIONS_ROOT, package.id),
        FileType::Application,
    )
    .with_mime(APPLICATION_MIME);
    entry
        .extra
        .insert("title".into(), Value::String(package.name.clone()));
    if let Some(description) = &package.description {
        entry
            .extra
            .insert("description".into(), Value::String(description.clone()));
    }
    entry
}

#[async_trait]
impl Transport for ApplicationsTransport {
    fn name(&self) -> &str {
        "applications"
    }

    /// Sorted by id, so repeated listings are identical
    async fn scandir(&self, _dir: &FileMetadata) -> VfsResult<Vec<FileMetadata>> {
        // packages() is ordered by id
        Ok(self.listed().iter().map(application_entry).collect())
    }

    async fn exists(&self, file: &FileMetadata) -> VfsResult<bool> {
        let id = paths::basename(&file.path);
        Ok(self.listed().iter().any(|p| p.id == id))
    }

    async fn fileinfo(&self, file: &FileMetadata) -> VfsResult<FileMetadata> {
        let id = paths::basename(&file.path);
        self.listed()
            .iter()
            .find(|p| p.id == id)
            .map(application_entry)
            .ok_or_else(|| VfsError::NotFound(file.path.clone()))
    }

    /// Case-insensitive match on id, name and description
    async fn find(&self, _dir: &FileMetadata, query: &FindQuery) -> VfsResult<Vec<FileMetadata>> {
        let needle = query.query.to_lowercase();
        let matches = |p: &PackageMetadata| {
            p.id.to_lowercase().contains(&needle)
                || p.name.to_lowercase().contains(&needle)
                || p
                    .description
                    .as_deref()
                    .map_or(false, |d| d.to_lowercase().contains(&needle))
        };

        let found = self
            .listed()
            .iter()
            .filter(|p| matches(p))
            .map(application_entry)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(found)
    }
}
