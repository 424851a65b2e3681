use std::future::Future;

use anyhow::{Context, Result};
use colored::Colorize;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde_json::json;

use crate::config::{Config, PlatformSelection};
use crate::error::AppError;
use crate::github::APP_USER_AGENT;
use crate::models::{
    DeleteStats, DockerHubLogin, DockerHubRepoPage, DockerHubTagPage, GhcrPackage, GhcrVersion,
    GitlabRegistryTag, GitlabRepository, PerRegistryImages, RegistryImage, RegistryKind,
    VersionRecord,
};

const GHCR_ACCEPT: &str = "application/vnd.github.package-deletes-preview+json";

/// Uniform fetch/delete dispatch over the configured registries.
pub struct ContainerGateway {
    ghcr: Option<GhcrClient>,
    gitlab: Option<GitlabRegistryClient>,
    docker_hub: Option<DockerHubClient>,
}

impl ContainerGateway {
    pub fn from_config(
        config: &Config,
        platforms: &PlatformSelection,
        verbose: bool,
    ) -> Result<Self, AppError> {
        let ghcr = if platforms.ghcr {
            let token = config
                .docker
                .ghcr_token
                .clone()
                .ok_or(AppError::MissingCredential("GHCR token"))?;
            let owner = config
                .docker
                .ghcr_owner
                .clone()
                .ok_or(AppError::MissingCredential("GHCR owner"))?;
            Some(GhcrClient::new(token, owner, verbose))
        } else {
            None
        };

        let gitlab = if platforms.gitlab_registry {
            let token = config
                .docker
                .gitlab_token
                .clone()
                .ok_or(AppError::MissingCredential("GitLab token"))?;
            let project = config
                .docker
                .gitlab_project
                .clone()
                .ok_or(AppError::MissingCredential("GitLab project"))?;
            Some(GitlabRegistryClient::new(token, project, verbose))
        } else {
            None
        };

        let docker_hub = if platforms.docker_hub {
            let username = config
                .docker
                .docker_hub_username
                .clone()
                .ok_or(AppError::MissingCredential("Docker Hub username"))?;
            let password = config
                .docker
                .docker_hub_token
                .clone()
                .ok_or(AppError::MissingCredential("Docker Hub token"))?;
            Some(DockerHubClient::new(username, password, verbose))
        } else {
            None
        };

        Ok(Self {
            ghcr,
            gitlab,
            docker_hub,
        })
    }

    /// Listing snapshot across the configured registries. Each registry is
    /// fail-soft: a fetch error is logged and yields an empty list. GHCR
    /// and GitLab are independent reads and run concurrently; Docker Hub
    /// logs in first and runs on its own.
    pub async fn list_all_images(&self) -> PerRegistryImages {
        let ghcr_fut = async {
            match &self.ghcr {
                Some(client) => match client.list_images().await {
                    Ok(images) => images,
                    Err(e) => {
                        eprintln!("[ERROR] Failed to fetch GHCR images: {:#}", e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            }
        };

        let gitlab_fut = async {
            match &self.gitlab {
                Some(client) => match client.list_images().await {
                    Ok(images) => images,
                    Err(e) => {
                        eprintln!("[ERROR] Failed to fetch GitLab Registry images: {:#}", e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            }
        };

        let (ghcr, gitlab) = tokio::join!(ghcr_fut, gitlab_fut);

        let docker_hub = match &self.docker_hub {
            Some(client) => match client.list_images().await {
                Ok(images) => images,
                Err(e) => {
                    eprintln!("[ERROR] Failed to fetch Docker Hub images: {:#}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        PerRegistryImages {
            ghcr,
            gitlab,
            docker_hub,
        }
    }

    pub async fn list_versions(
        &self,
        kind: RegistryKind,
        image: &RegistryImage,
    ) -> Result<Vec<VersionRecord>> {
        match kind {
            RegistryKind::Ghcr => {
                self.ghcr
                    .as_ref()
                    .context("GHCR is not configured")?
                    .list_versions(image)
                    .await
            }
            RegistryKind::GitlabRegistry => {
                self.gitlab
                    .as_ref()
                    .context("GitLab Registry is not configured")?
                    .list_versions(image)
                    .await
            }
            RegistryKind::DockerHub => {
                self.docker_hub
                    .as_ref()
                    .context("Docker Hub is not configured")?
                    .list_versions(image)
                    .await
            }
        }
    }

    /// Delete a batch of versions on one registry with per-item failure
    /// isolation.
    pub async fn delete_versions(
        &self,
        kind: RegistryKind,
        versions: &[VersionRecord],
    ) -> DeleteStats {
        if versions.is_empty() {
            return DeleteStats::default();
        }
        match kind {
            RegistryKind::Ghcr => match &self.ghcr {
                Some(client) => client.delete_versions(versions).await,
                None => unconfigured(kind, versions.len()),
            },
            RegistryKind::GitlabRegistry => match &self.gitlab {
                Some(client) => client.delete_versions(versions).await,
                None => unconfigured(kind, versions.len()),
            },
            RegistryKind::DockerHub => match &self.docker_hub {
                Some(client) => client.delete_versions(versions).await,
                None => unconfigured(kind, versions.len()),
            },
        }
    }
}

fn unconfigured(kind: RegistryKind, count: usize) -> DeleteStats {
    eprintln!(
        "[ERROR] {} is not configured; skipping {} deletions",
        kind, count
    );
    DeleteStats {
        deleted: 0,
        failed: count,
    }
}

/// Run `delete` for every version, logging each outcome; a failed item
/// never stops the remaining ones.
pub(crate) async fn delete_each<'a, F, Fut>(
    versions: &'a [VersionRecord],
    kind: RegistryKind,
    mut delete: F,
) -> DeleteStats
where
    F: FnMut(&'a VersionRecord) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut stats = DeleteStats::default();
    for version in versions {
        match delete(version).await {
            Ok(()) => {
                println!(
                    "{} {} version: {}",
                    "Deleted".green(),
                    kind,
                    version.describe()
                );
                stats.deleted += 1;
            }
            Err(e) => {
                eprintln!(
                    "[ERROR] Failed to delete {} version {}: {:#}",
                    kind,
                    version.describe(),
                    e
                );
                stats.failed += 1;
            }
        }
    }
    stats
}

/// GHCR speaks the GitHub packages API.
pub struct GhcrClient {
    client: Client,
    base_url: String,
    token: String,
    owner: String,
    verbose: bool,
}

impl GhcrClient {
    pub fn new(token: String, owner: String, verbose: bool) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.github.com".to_string(),
            token,
            owner,
            verbose,
        }
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GHCR_ACCEPT)
            .header(USER_AGENT, APP_USER_AGENT)
    }

    fn package_versions_url(&self, package: &str) -> String {
        format!(
            "{}/users/{}/packages/container/{}/versions",
            self.base_url,
            self.owner,
            urlencoding::encode(package)
        )
    }

    /// GET /users/<owner>/packages, one nested version fetch per package.
    /// The packages listing itself reports no tags.
    pub async fn list_images(&self) -> Result<Vec<RegistryImage>> {
        let url = format!(
            "{}/users/{}/packages?package_type=container&per_page=100",
            self.base_url, self.owner
        );
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("Failed to fetch GHCR packages")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET packages for {} returned status {}", self.owner, status);
        }

        let packages: Vec<GhcrPackage> = resp
            .json()
            .await
            .context("Failed to parse GHCR packages JSON")?;

        let mut images = Vec::with_capacity(packages.len());
        for pkg in packages {
            let tags = match self.fetch_versions(&pkg.name).await {
                Ok(versions) => versions
                    .into_iter()
                    .flat_map(|version| version.container_tags())
                    .collect(),
                Err(e) => {
                    eprintln!("[ERROR] Failed to fetch versions for {}: {:#}", pkg.name, e);
                    Vec::new()
                }
            };
            images.push(RegistryImage {
                id: Some(pkg.id.to_string()),
                name: pkg.name,
                tags,
                created_at: pkg.created_at,
            });
        }

        Ok(images)
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<GhcrVersion>> {
        let url = self.package_versions_url(package);
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Failed to fetch versions for {}", package))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET versions for {} returned status {}", package, status);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse versions JSON for {}", package))
    }

    pub async fn list_versions(&self, image: &RegistryImage) -> Result<Vec<VersionRecord>> {
        let versions = self.fetch_versions(&image.name).await?;
        Ok(versions
            .into_iter()
            .map(|version| {
                let tags = version.container_tags();
                VersionRecord {
                    id: version.id.to_string(),
                    name: version.name.clone(),
                    tags,
                    // GHCR reports the manifest digest as the version name.
                    digest: Some(version.name),
                    created_at: version.created_at,
                    size: None,
                    package_name: image.name.clone(),
                }
            })
            .collect())
    }

    pub async fn delete_versions(&self, versions: &[VersionRecord]) -> DeleteStats {
        delete_each(versions, RegistryKind::Ghcr, |version| {
            self.delete_version(version)
        })
        .await
    }

    /// DELETE /users/<owner>/packages/container/<name>/versions/<id>
    async fn delete_version(&self, version: &VersionRecord) -> Result<()> {
        let url = format!(
            "{}/{}",
            self.package_versions_url(&version.package_name),
            version.id
        );
        if self.verbose {
            eprintln!("[DEBUG] DELETE {}", url);
        }
        let resp = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .with_context(|| format!("Failed to delete version {}", version.id))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "DELETE version {} of {} returned status {}",
                version.id,
                version.package_name,
                status
            );
        }

        Ok(())
    }
}

pub struct GitlabRegistryClient {
    client: Client,
    base_url: String,
    token: String,
    project: String,
    verbose: bool,
}

impl GitlabRegistryClient {
    pub fn new(token: String, project: String, verbose: bool) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://gitlab.com/api/v4".to_string(),
            token,
            project,
            verbose,
        }
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("PRIVATE-TOKEN", &self.token)
    }

    fn project_path(&self) -> String {
        urlencoding::encode(&self.project).into_owned()
    }

    /// GET /projects/<id>/registry/repositories
    async fn fetch_repositories(&self) -> Result<Vec<GitlabRepository>> {
        let url = format!(
            "{}/projects/{}/registry/repositories",
            self.base_url,
            self.project_path()
        );
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("Failed to fetch GitLab registry repositories")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "GET registry repositories for {} returned status {}",
                self.project,
                status
            );
        }

        resp.json()
            .await
            .context("Failed to parse GitLab registry repositories JSON")
    }

    pub async fn list_images(&self) -> Result<Vec<RegistryImage>> {
        let repos = self.fetch_repositories().await?;
        Ok(repos
            .into_iter()
            .map(|repo| RegistryImage {
                id: Some(repo.id.to_string()),
                name: repo.qualified_name().to_string(),
                tags: Vec::new(),
                created_at: repo.created_at,
            })
            .collect())
    }

    /// GET /projects/<id>/registry/repositories/<repo_id>/tags
    pub async fn list_versions(&self, image: &RegistryImage) -> Result<Vec<VersionRecord>> {
        let repo_id = image
            .id
            .as_deref()
            .context("GitLab registry repository id missing")?;
        let url = format!(
            "{}/projects/{}/registry/repositories/{}/tags",
            self.base_url,
            self.project_path(),
            repo_id
        );
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Failed to fetch tags for {}", image.name))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET tags for {} returned status {}", image.name, status);
        }

        let tags: Vec<GitlabRegistryTag> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse tags JSON for {}", image.name))?;

        Ok(tags
            .into_iter()
            .map(|tag| VersionRecord {
                id: tag.name.clone(),
                name: tag.name.clone(),
                tags: vec![tag.name],
                digest: tag.digest,
                created_at: tag.created_at,
                size: tag.total_size,
                package_name: image.name.clone(),
            })
            .collect())
    }

    pub async fn delete_versions(&self, versions: &[VersionRecord]) -> DeleteStats {
        delete_each(versions, RegistryKind::GitlabRegistry, |version| {
            self.delete_version(version)
        })
        .await
    }

    /// DELETE /projects/<id>/registry/repositories/<repo_id>/tags/<name>.
    /// The tags endpoint keys on the numeric repository id, so the
    /// qualified name is mapped back to it first.
    async fn delete_version(&self, version: &VersionRecord) -> Result<()> {
        let repos = self.fetch_repositories().await?;
        let repo = repos
            .iter()
            .find(|repo| repo.qualified_name() == version.package_name)
            .with_context(|| {
                format!(
                    "No GitLab registry repository named {}",
                    version.package_name
                )
            })?;

        let url = format!(
            "{}/projects/{}/registry/repositories/{}/tags/{}",
            self.base_url,
            self.project_path(),
            repo.id,
            urlencoding::encode(&version.name)
        );
        if self.verbose {
            eprintln!("[DEBUG] DELETE {}", url);
        }
        let resp = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to delete tag {}:{}",
                    version.package_name, version.name
                )
            })?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "DELETE tag {}:{} returned status {}",
                version.package_name,
                version.name,
                status
            );
        }

        Ok(())
    }
}

/// Short-lived bearer credential for one Docker Hub call chain. Every
/// batch that touches Docker Hub logs in afresh; nothing is mutated on the
/// long-lived client.
pub struct DockerHubSession {
    token: String,
}

pub struct DockerHubClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    verbose: bool,
}

impl DockerHubClient {
    pub fn new(username: String, password: String, verbose: bool) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://hub.docker.com/v2".to_string(),
            username,
            password,
            verbose,
        }
    }

    fn authed(&self, req: RequestBuilder, session: &DockerHubSession) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Bearer {}", session.token))
    }

    fn tag_delete_url(&self, package: &str, tag: &str) -> String {
        // Docker Hub's delete-tag path ends with a slash.
        format!(
            "{}/repositories/{}/{}/tags/{}/",
            self.base_url, self.username, package, tag
        )
    }

    /// POST /users/login
    async fn login(&self) -> Result<DockerHubSession> {
        let url = format!("{}/users/login", self.base_url);
        if self.verbose {
            eprintln!("[DEBUG] POST {}", url);
        }
        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .context("Failed to log in to Docker Hub")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Docker Hub login returned status {}", status);
        }

        let login: DockerHubLogin = resp
            .json()
            .await
            .context("Failed to parse Docker Hub login JSON")?;

        Ok(DockerHubSession { token: login.token })
    }

    /// GET /repositories/<user>/
    pub async fn list_images(&self) -> Result<Vec<RegistryImage>> {
        let session = self.login().await?;
        let url = format!("{}/repositories/{}/", self.base_url, self.username);
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url), &session)
            .send()
            .await
            .context("Failed to fetch Docker Hub repositories")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "GET repositories for {} returned status {}",
                self.username,
                status
            );
        }

        let page: DockerHubRepoPage = resp
            .json()
            .await
            .context("Failed to parse Docker Hub repositories JSON")?;

        Ok(page
            .results
            .into_iter()
            .map(|repo| RegistryImage {
                id: Some(format!("{}/{}", repo.namespace, repo.name)),
                name: repo.name,
                tags: Vec::new(),
                created_at: repo.last_updated,
            })
            .collect())
    }

    /// GET /repositories/<user>/<repo>/tags
    pub async fn list_versions(&self, image: &RegistryImage) -> Result<Vec<VersionRecord>> {
        let session = self.login().await?;
        let url = format!(
            "{}/repositories/{}/{}/tags?page_size=100",
            self.base_url, self.username, image.name
        );
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url), &session)
            .send()
            .await
            .with_context(|| format!("Failed to fetch tags for {}", image.name))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET tags for {} returned status {}", image.name, status);
        }

        let page: DockerHubTagPage = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse tags JSON for {}", image.name))?;

        Ok(page
            .results
            .into_iter()
            .map(|tag| {
                let id = tag
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| tag.name.clone());
                VersionRecord {
                    id,
                    name: tag.name.clone(),
                    tags: vec![tag.name],
                    digest: tag.digest,
                    created_at: tag.last_updated,
                    size: tag.full_size,
                    package_name: image.name.clone(),
                }
            })
            .collect())
    }

    /// One fresh session covers the whole batch.
    pub async fn delete_versions(&self, versions: &[VersionRecord]) -> DeleteStats {
        let session = match self.login().await {
            Ok(session) => session,
            Err(e) => {
                eprintln!("[ERROR] Docker Hub authentication failed: {:#}", e);
                return DeleteStats {
                    deleted: 0,
                    failed: versions.len(),
                };
            }
        };

        delete_each(versions, RegistryKind::DockerHub, |version| {
            self.delete_version(&session, version)
        })
        .await
    }

    /// DELETE /repositories/<user>/<repo>/tags/<name>/
    async fn delete_version(
        &self,
        session: &DockerHubSession,
        version: &VersionRecord,
    ) -> Result<()> {
        let url = self.tag_delete_url(&version.package_name, &version.name);
        if self.verbose {
            eprintln!("[DEBUG] DELETE {}", url);
        }
        let resp = self
            .authed(self.client.delete(&url), session)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to delete tag {}:{}",
                    version.package_name, version.name
                )
            })?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "DELETE tag {}:{} returned status {}",
                version.package_name,
                version.name,
                status
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn record(id: &str) -> VersionRecord {
        VersionRecord {
            id: id.to_string(),
            name: id.to_string(),
            tags: vec![id.to_string()],
            digest: None,
            created_at: None,
            size: None,
            package_name: "app".to_string(),
        }
    }

    #[test]
    fn test_ghcr_versions_url_encodes_package() {
        let client = GhcrClient::new("t".to_string(), "user".to_string(), false);
        assert_eq!(
            client.package_versions_url("my-app"),
            "https://api.github.com/users/user/packages/container/my-app/versions"
        );
        assert_eq!(
            client.package_versions_url("group/app"),
            "https://api.github.com/users/user/packages/container/group%2Fapp/versions"
        );
    }

    #[test]
    fn test_gitlab_project_path_encodes_separator() {
        let client =
            GitlabRegistryClient::new("t".to_string(), "user/project".to_string(), false);
        assert_eq!(client.project_path(), "user%2Fproject");
    }

    #[test]
    fn test_docker_hub_delete_url_has_trailing_slash() {
        let client = DockerHubClient::new("user".to_string(), "pw".to_string(), false);
        assert_eq!(
            client.tag_delete_url("app", "1.0"),
            "https://hub.docker.com/v2/repositories/user/app/tags/1.0/"
        );
    }

    #[tokio::test]
    async fn test_delete_each_continues_past_failures() {
        let versions = vec![record("a"), record("b"), record("c")];
        let attempted = RefCell::new(Vec::new());

        let stats = delete_each(&versions, RegistryKind::Ghcr, |version| {
            attempted.borrow_mut().push(version.id.clone());
            let fail = version.id == "b";
            async move {
                if fail {
                    anyhow::bail!("boom")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(stats.deleted, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(attempted.borrow().as_slice(), ["a", "b", "c"]);
    }
}
