use anyhow::{Context, Result};
use colored::Colorize;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};

use crate::config::ForgeConfig;
use crate::models::{DeleteStats, GithubRelease, GithubTag};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

// The GitHub API rejects requests without a User-Agent.
pub(crate) const APP_USER_AGENT: &str = "repotidy";

pub struct GithubClient {
    client: Client,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
    verbose: bool,
}

impl GithubClient {
    pub fn new(config: &ForgeConfig, verbose: bool) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.github.com".to_string(),
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            verbose,
        }
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, APP_USER_AGENT)
    }

    /// GET /repos/<owner>/<repo>/releases
    pub async fn list_releases(&self) -> Result<Vec<GithubRelease>> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            self.base_url, self.owner, self.repo
        );
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("Failed to fetch GitHub releases")?;

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
            .context("Failed to parse GitHub releases JSON")
    }

    /// GET /repos/<owner>/<repo>/tags
    pub async fn list_tags(&self) -> Result<Vec<GithubTag>> {
        let url = format!("{}/repos/{}/{}/tags", self.base_url, self.owner, self.repo);
        if self.verbose {
            eprintln!("[DEBUG] GET {}", url);
        }
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("Failed to fetch GitHub tags")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!(
                "GET tags for {}/{} returned status {}",
                self.owner,
                self.repo,
                status
            );
        }

        resp.json().await.context("Failed to parse GitHub tags JSON")
    }

    /// DELETE /repos/<owner>/<repo>/releases/<id>
    async fn delete_release(&self, release: &GithubRelease) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}",
            self.base_url, self.owner, self.repo, release.id
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

    /// DELETE /repos/<owner>/<repo>/git/refs/tags/<name>
    async fn delete_tag(&self, tag: &GithubTag) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/git/refs/tags/{}",
            self.base_url, self.owner, self.repo, tag.name
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
        releases: &[GithubRelease],
        tags: &[GithubTag],
    ) -> DeleteStats {
        let mut stats = DeleteStats::default();

        for release in releases {
            match self.delete_release(release).await {
                Ok(()) => {
                    println!("{} GitHub release: {}", "Deleted".green(), release.tag_name);
                    stats.deleted += 1;
                }
                Err(e) => {
                    eprintln!(
                        "[ERROR] Failed to delete GitHub release {}: {:#}",
                        release.tag_name, e
                    );
                    stats.failed += 1;
                }
            }
        }

        for tag in tags {
            match self.delete_tag(tag).await {
                Ok(()) => {
                    println!("{} GitHub tag: {}", "Deleted".green(), tag.name);
                    stats.deleted += 1;
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to delete GitHub tag {}: {:#}", tag.name, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}
