use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// The container registries the gateway can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Ghcr,
    GitlabRegistry,
    DockerHub,
}

impl RegistryKind {
    /// Fixed processing order for grouping and deletion.
    pub const ALL: [RegistryKind; 3] = [
        RegistryKind::Ghcr,
        RegistryKind::GitlabRegistry,
        RegistryKind::DockerHub,
    ];
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistryKind::Ghcr => "GHCR",
            RegistryKind::GitlabRegistry => "GitLab",
            RegistryKind::DockerHub => "Docker Hub",
        };
        f.write_str(name)
    }
}

/// One image/package as reported by a single registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryImage {
    pub id: Option<String>,
    pub name: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One deletable unit within a registry's image (a version or tag).
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRecord {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub digest: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    /// Qualified name of the owning image; delete endpoints need the full
    /// path, not the group's base name.
    pub package_name: String,
}

impl VersionRecord {
    /// Checkbox label: joined tags when present, otherwise a shortened
    /// digest (or the id), plus the creation date.
    pub fn label(&self) -> String {
        let date = match &self.created_at {
            Some(created) => created.format("%Y-%m-%d").to_string(),
            None => "unknown date".to_string(),
        };
        if self.tags.is_empty() {
            let ident = match &self.digest {
                Some(digest) => truncate(digest, 12),
                None => self.id.as_str(),
            };
            format!("{} ({})", ident, date)
        } else {
            format!("{} ({})", self.tags.join(", "), date)
        }
    }

    /// Short identifier for deletion log lines.
    pub fn describe(&self) -> String {
        if self.tags.is_empty() {
            format!("{}@{}", self.package_name, self.id)
        } else {
            format!("{} ({})", self.package_name, self.tags.join(", "))
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() > max {
        &s[..max]
    } else {
        s
    }
}

/// Per-registry slots of an image group. Each registry kind contributes at
/// most one image per group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryMap {
    pub ghcr: Option<RegistryImage>,
    pub gitlab: Option<RegistryImage>,
    pub docker_hub: Option<RegistryImage>,
}

impl RegistryMap {
    pub fn get(&self, kind: RegistryKind) -> Option<&RegistryImage> {
        match kind {
            RegistryKind::Ghcr => self.ghcr.as_ref(),
            RegistryKind::GitlabRegistry => self.gitlab.as_ref(),
            RegistryKind::DockerHub => self.docker_hub.as_ref(),
        }
    }

    pub fn set(&mut self, kind: RegistryKind, image: RegistryImage) {
        let slot = match kind {
            RegistryKind::Ghcr => &mut self.ghcr,
            RegistryKind::GitlabRegistry => &mut self.gitlab,
            RegistryKind::DockerHub => &mut self.docker_hub,
        };
        *slot = Some(image);
    }

    /// Registry kinds present, in fixed processing order.
    pub fn kinds(&self) -> Vec<RegistryKind> {
        RegistryKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }
}

/// Same-named images unified across registries.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGroup {
    pub base_name: String,
    pub registries: RegistryMap,
    /// Tag-count aggregate from grouping time. Display hint only; the
    /// deletable versions are re-fetched per group later and may differ.
    pub total_versions: usize,
}

impl ImageGroup {
    pub fn label(&self) -> String {
        let registries: Vec<String> = self
            .registries
            .kinds()
            .into_iter()
            .map(|kind| kind.to_string())
            .collect();
        format!(
            "{} ({}) - {} total versions",
            self.base_name,
            registries.join(", "),
            self.total_versions
        )
    }
}

/// Listing snapshot per registry, input to grouping.
#[derive(Debug, Default)]
pub struct PerRegistryImages {
    pub ghcr: Vec<RegistryImage>,
    pub gitlab: Vec<RegistryImage>,
    pub docker_hub: Vec<RegistryImage>,
}

/// The operator's per-group version choice across registries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedVersionSelection {
    pub base_name: String,
    pub ghcr: Vec<VersionRecord>,
    pub gitlab: Vec<VersionRecord>,
    pub docker_hub: Vec<VersionRecord>,
}

impl GroupedVersionSelection {
    pub fn new(base_name: String) -> Self {
        Self {
            base_name,
            ..Default::default()
        }
    }

    pub fn records(&self, kind: RegistryKind) -> &[VersionRecord] {
        match kind {
            RegistryKind::Ghcr => &self.ghcr,
            RegistryKind::GitlabRegistry => &self.gitlab,
            RegistryKind::DockerHub => &self.docker_hub,
        }
    }

    pub fn set_records(&mut self, kind: RegistryKind, records: Vec<VersionRecord>) {
        match kind {
            RegistryKind::Ghcr => self.ghcr = records,
            RegistryKind::GitlabRegistry => self.gitlab = records,
            RegistryKind::DockerHub => self.docker_hub = records,
        }
    }

    pub fn total(&self) -> usize {
        self.ghcr.len() + self.gitlab.len() + self.docker_hub.len()
    }
}

/// Outcome counters for one deletion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteStats {
    pub deleted: usize,
    pub failed: usize,
}

impl DeleteStats {
    pub fn merge(&mut self, other: DeleteStats) {
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

/// GET /repos/<owner>/<repo>/releases item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GithubRelease {
    pub id: u64,
    pub tag_name: String,
    pub name: Option<String>,
}

impl GithubRelease {
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.tag_name,
            self.name.as_deref().unwrap_or("No title")
        )
    }
}

/// GET /repos/<owner>/<repo>/tags item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GithubTag {
    pub name: String,
}

/// GET /projects/<id>/releases item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitlabRelease {
    pub tag_name: String,
    pub name: Option<String>,
}

impl GitlabRelease {
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.tag_name,
            self.name.as_deref().unwrap_or("No title")
        )
    }
}

/// GET /projects/<id>/repository/tags item
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitlabTag {
    pub name: String,
}

/// GET /users/<owner>/packages?package_type=container item (GHCR)
#[derive(Debug, Deserialize)]
pub struct GhcrPackage {
    pub id: u64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// GET /users/<owner>/packages/container/<name>/versions item (GHCR)
#[derive(Debug, Deserialize)]
pub struct GhcrVersion {
    pub id: u64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub metadata: Option<GhcrVersionMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct GhcrVersionMetadata {
    pub container: Option<GhcrContainerMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct GhcrContainerMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GhcrVersion {
    pub fn container_tags(&self) -> Vec<String> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.container.as_ref())
            .map(|container| container.tags.clone())
            .unwrap_or_default()
    }
}

/// GET /projects/<id>/registry/repositories item (GitLab)
#[derive(Debug, Deserialize)]
pub struct GitlabRepository {
    pub id: u64,
    pub name: String,
    pub path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl GitlabRepository {
    /// The API reports the short name and the full path separately; the
    /// path is the qualified name when present.
    pub fn qualified_name(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// GET /projects/<id>/registry/repositories/<id>/tags item (GitLab)
#[derive(Debug, Deserialize)]
pub struct GitlabRegistryTag {
    pub name: String,
    pub digest: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub total_size: Option<u64>,
}

/// POST /users/login response (Docker Hub)
#[derive(Debug, Deserialize)]
pub struct DockerHubLogin {
    pub token: String,
}

/// GET /repositories/<user>/ page (Docker Hub)
#[derive(Debug, Deserialize)]
pub struct DockerHubRepoPage {
    pub results: Vec<DockerHubRepo>,
}

#[derive(Debug, Deserialize)]
pub struct DockerHubRepo {
    pub name: String,
    pub namespace: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// GET /repositories/<user>/<repo>/tags page (Docker Hub)
#[derive(Debug, Deserialize)]
pub struct DockerHubTagPage {
    pub results: Vec<DockerHubTag>,
}

#[derive(Debug, Deserialize)]
pub struct DockerHubTag {
    pub id: Option<u64>,
    pub name: String,
    pub digest: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub full_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(tags: &[&str], digest: Option<&str>) -> VersionRecord {
        VersionRecord {
            id: "42".to_string(),
            name: "v".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            digest: digest.map(|d| d.to_string()),
            created_at: None,
            size: None,
            package_name: "org/app".to_string(),
        }
    }

    #[test]
    fn test_label_joins_tags_with_date() {
        let mut version = record(&["1.0", "latest"], None);
        version.created_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert_eq!(version.label(), "1.0, latest (2024-05-01)");
    }

    #[test]
    fn test_label_falls_back_to_truncated_digest() {
        let version = record(&[], Some("sha256:0123456789abcdef"));
        assert_eq!(version.label(), "sha256:01234 (unknown date)");
    }

    #[test]
    fn test_label_uses_id_when_no_digest() {
        let version = record(&[], None);
        assert_eq!(version.label(), "42 (unknown date)");
    }

    #[test]
    fn test_group_label_lists_registries_and_total() {
        let image = RegistryImage {
            id: None,
            name: "a/x".to_string(),
            tags: vec!["1".to_string()],
            created_at: None,
        };
        let mut registries = RegistryMap::default();
        registries.set(RegistryKind::Ghcr, image.clone());
        registries.set(RegistryKind::GitlabRegistry, image);
        let group = ImageGroup {
            base_name: "x".to_string(),
            registries,
            total_versions: 3,
        };
        assert_eq!(group.label(), "x (GHCR, GitLab) - 3 total versions");
    }

    #[test]
    fn test_selection_total_sums_registries() {
        let mut selection = GroupedVersionSelection::new("x".to_string());
        selection.set_records(RegistryKind::Ghcr, vec![record(&["1"], None)]);
        selection.set_records(
            RegistryKind::DockerHub,
            vec![record(&["2"], None), record(&["3"], None)],
        );
        assert_eq!(selection.total(), 3);
        assert!(selection.records(RegistryKind::GitlabRegistry).is_empty());
    }

    #[test]
    fn test_registry_map_kinds_in_fixed_order() {
        let image = RegistryImage {
            id: None,
            name: "x".to_string(),
            tags: vec![],
            created_at: None,
        };
        let mut registries = RegistryMap::default();
        registries.set(RegistryKind::DockerHub, image.clone());
        registries.set(RegistryKind::Ghcr, image);
        assert_eq!(
            registries.kinds(),
            vec![RegistryKind::Ghcr, RegistryKind::DockerHub]
        );
    }
}
