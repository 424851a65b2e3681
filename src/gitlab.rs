use anyhow::{Context, Result};
use colored::Colorize;
use reqwest::{Client, RequestBuilder};

use crate::config::ForgeConfig;
use crate::models::{DeleteStats, GitlabRelease, GitlabTag};

pub struct GitlabClient {
    client: Client,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
    verbose: bool,
}

impl GitlabClient {
    pub fn new(config: &ForgeConfig, verbose: bool) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://gitlab.com/api/v4".to_string(),
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            verbose,
        }
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("PRIVATE-TOKEN", &self.token)
    }

    /// `owner/repo` URL-encoded into a single path segment, the way the
    /// GitLab API addresses projects.
    fn project_path(&self) -> String {
        urlencoding::encode(&format!("{}/{}", self.owner, self.repo)).into_owned()
    }

    /// GET /projects/<id>/releases
    pub async fn list_releases(&self) -> Result<Vec<GitlabRelease>> {
        let url = format!("{}/projects/{}/releases", self.base_url, self.project_path());
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("Failed to fetch GitLab releases")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "GET releases for {}/{} returned status {}",
                self.owner,
                self.repo,
                status
            );
        }

        resp.json()
            .await
            .context("Failed to parse GitLab releases JSON")
    }

    /// GET /projects/<id>/repository/tags
    pub async fn list_tags(&self) -> Result<Vec<GitlabTag>> {
        let url = format!(
            "{}/projects/{}/repository/tags",
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
            .context("Failed to fetch GitLab tags")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "GET tags for {}/{} returned status {}",
                self.owner,
                self.repo,
                status
            );
        }

        resp.json().await.context("Failed to parse GitLab tags JSON")
    }

    /// DELETE /projects/<id>/releases/<tag_name>
    async fn delete_release(&self, release: &GitlabRelease) -> Result<()> {
        let url = format!(
            "{}/projects/{}/releases/{}",
            self.base_url,
            self.project_path(),
            urlencoding::encode(&release.tag_name)
        );
        if self.verbose {
            eprintln!("[DEBUG] DELETE {}", url);
        }
        let resp = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .with_context(|| format!("Failed to delete release {}", release.tag_name))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "DELETE release {} returned status {}",
                release.tag_name,
                status
            );
        }

        Ok(())
    }

    /// DELETE /projects/<id>/repository/tags/<name>
    async fn delete_tag(&self, tag: &GitlabTag) -> Result<()> {
        let url = format!(
            "{}/projects/{}/repository/tags/{}",
            self.base_url,
            self.project_path(),
            urlencoding::encode(&tag.name)
        );
        if self.verbose {
            eprintln!("[DEBUG] DELETE {}", url);
        }
        let resp = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .with_context(|| format!("Failed to delete tag {}", tag.name))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("DELETE tag {} returned status {}", tag.name, status);
        }

        Ok(())
    }

    /// Delete the selected releases and tags, one by one. A failed item is
    /// logged and the rest are still attempted.
    pub async fn delete_items(
        &self,
        releases: &[GitlabRelease],
        tags: &[GitlabTag],
    ) -> DeleteStats {
        let mut stats = DeleteStats::default();

        for release in releases {
            match self.delete_release(release).await {
                Ok(()) => {
                    println!("{} GitLab release: {}", "Deleted".green(), release.tag_name);
                    stats.deleted += 1;
                }
                Err(e) => {
                    eprintln!(
                        "[ERROR] Failed to delete GitLab release {}: {:#}",
                        release.tag_name, e
                    );
                    stats.failed += 1;
                }
            }
        }

        for tag in tags {
            match self.delete_tag(tag).await {
                Ok(()) => {
                    println!("{} GitLab tag: {}", "Deleted".green(), tag.name);
                    stats.deleted += 1;
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to delete GitLab tag {}: {:#}", tag.name, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_path_encodes_separator() {
        let client = GitlabClient::new(
            &ForgeConfig {
                token: "t".to_string(),
                owner: "user".to_string(),
                repo: "proj".to_string(),
            },
            false,
        );
        assert_eq!(client.project_path(), "user%2Fproj");
    }
}
