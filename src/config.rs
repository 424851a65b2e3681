use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use inquire::{Password, Text};

/// Which platforms the current run touches; drives credential collection
/// and gateway construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformSelection {
    pub github: bool,
    pub gitlab: bool,
    pub ghcr: bool,
    pub gitlab_registry: bool,
    pub docker_hub: bool,
}

impl PlatformSelection {
    pub fn any(&self) -> bool {
        self.github || self.gitlab || self.any_registry()
    }

    pub fn any_registry(&self) -> bool {
        self.ghcr || self.gitlab_registry || self.docker_hub
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForgeConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Default)]
pub struct DockerConfig {
    pub ghcr_token: Option<String>,
    pub ghcr_owner: Option<String>,
    pub gitlab_token: Option<String>,
    pub gitlab_project: Option<String>,
    pub docker_hub_token: Option<String>,
    pub docker_hub_username: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub github: ForgeConfig,
    pub gitlab: ForgeConfig,
    pub docker: DockerConfig,
}

/// Resolve configuration for the selected platforms: environment first,
/// interactive prompts for whatever is missing, newly entered values
/// appended to `.env`.
pub fn get_config(platforms: &PlatformSelection) -> Result<Config> {
    let env = EnvConfig::load();
    let mut answers: Vec<(&'static str, String)> = Vec::new();

    let mut github = ForgeConfig::default();
    let mut gitlab = ForgeConfig::default();
    let mut docker = DockerConfig::default();

    // GitHub credentials double as GHCR credentials.
    if platforms.github || platforms.ghcr {
        github.token = resolve(
            env.gh_token.clone(),
            "GH_TOKEN",
            "Enter GitHub Personal Access Token:",
            true,
            &mut answers,
        )?;
        github.owner = resolve(
            env.gh_owner.clone(),
            "GH_OWNER",
            "Enter GitHub username/organization:",
            false,
            &mut answers,
        )?;
        if platforms.github {
            github.repo = resolve(
                env.gh_repo.clone(),
                "GH_REPO",
                "Enter GitHub repository name:",
                false,
                &mut answers,
            )?;
        }
    }

    if platforms.gitlab || platforms.gitlab_registry {
        gitlab.token = resolve(
            env.gitlab_token.clone(),
            "GITLAB_TOKEN",
            "Enter GitLab Personal Access Token:",
            true,
            &mut answers,
        )?;
        gitlab.owner = resolve(
            env.gl_owner.clone(),
            "GL_OWNER",
            "Enter GitLab username/organization:",
            false,
            &mut answers,
        )?;
        if platforms.gitlab {
            gitlab.repo = resolve(
                env.gl_repo.clone(),
                "GL_REPO",
                "Enter GitLab repository name:",
                false,
                &mut answers,
            )?;
        }
        if platforms.gitlab_registry {
            docker.gitlab_project = Some(resolve(
                env.gl_project.clone(),
                "GL_PROJECT",
                "Enter GitLab project ID or path (e.g. username/project):",
                false,
                &mut answers,
            )?);
            docker.gitlab_token = Some(gitlab.token.clone());
        }
    }

    if platforms.docker_hub {
        docker.docker_hub_token = Some(resolve(
            env.docker_hub_token.clone(),
            "DOCKERHUB_TOKEN",
            "Enter Docker Hub password or access token:",
            true,
            &mut answers,
        )?);
        docker.docker_hub_username = Some(resolve(
            env.docker_hub_username.clone(),
            "DOCKER_HUB_USERNAME",
            "Enter Docker Hub username:",
            false,
            &mut answers,
        )?);
    }

    if platforms.ghcr {
        docker.ghcr_token = Some(env.ghcr_token.unwrap_or_else(|| github.token.clone()));
        docker.ghcr_owner = Some(env.ghcr_owner.unwrap_or_else(|| github.owner.clone()));
    }

    if !answers.is_empty() {
        println!("\nSaving credentials to .env...");
        save_to_env(&answers)?;
        println!("Saved. You won't need to enter them again.\n");
    }

    Ok(Config {
        github,
        gitlab,
        docker,
    })
}

struct EnvConfig {
    gh_token: Option<String>,
    gh_owner: Option<String>,
    gh_repo: Option<String>,
    gitlab_token: Option<String>,
    gl_owner: Option<String>,
    gl_repo: Option<String>,
    gl_project: Option<String>,
    ghcr_token: Option<String>,
    ghcr_owner: Option<String>,
    docker_hub_token: Option<String>,
    docker_hub_username: Option<String>,
}

impl EnvConfig {
    fn load() -> Self {
        // Owner and repo fall back to the other forge's values when only
        // one side is configured.
        Self {
            gh_token: env_var("GH_TOKEN"),
            gh_owner: env_var("GH_OWNER").or_else(|| env_var("GL_OWNER")),
            gh_repo: env_var("GH_REPO").or_else(|| env_var("GL_REPO")),
            gitlab_token: env_var("GITLAB_TOKEN"),
            gl_owner: env_var("GL_OWNER").or_else(|| env_var("GH_OWNER")),
            gl_repo: env_var("GL_REPO").or_else(|| env_var("GH_REPO")),
            gl_project: env_var("GL_PROJECT"),
            ghcr_token: env_var("GHCR_TOKEN"),
            ghcr_owner: env_var("GHCR_OWNER"),
            docker_hub_token: env_var("DOCKERHUB_TOKEN"),
            docker_hub_username: env_var("DOCKER_HUB_USERNAME"),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve(
    existing: Option<String>,
    key: &'static str,
    message: &str,
    secret: bool,
    answers: &mut Vec<(&'static str, String)>,
) -> Result<String> {
    if let Some(value) = existing {
        return Ok(value);
    }
    let value = if secret {
        prompt_secret(message)?
    } else {
        prompt_text(message)?
    };
    answers.push((key, value.clone()));
    Ok(value)
}

fn prompt_text(message: &str) -> Result<String> {
    loop {
        let input = Text::new(message).prompt()?;
        let trimmed = input.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
        eprintln!("[WARN] A value is required");
    }
}

fn prompt_secret(message: &str) -> Result<String> {
    loop {
        let input = Password::new(message).prompt()?;
        let trimmed = input.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
        eprintln!("[WARN] A value is required");
    }
}

/// Append credentials to `.env`, only for keys not already present.
fn save_to_env(answers: &[(&'static str, String)]) -> Result<()> {
    let path = Path::new(".env");
    let existing = if path.exists() {
        fs::read_to_string(path).context("Failed to read .env")?
    } else {
        String::new()
    };
    let merged = merge_env_lines(&existing, answers);
    fs::write(path, merged).context("Failed to write .env")?;
    Ok(())
}

fn merge_env_lines(existing: &str, additions: &[(&'static str, String)]) -> String {
    let mut content = existing.to_string();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for (key, value) in additions {
        let prefix = format!("{}=", key);
        let present = existing
            .lines()
            .any(|line| line.trim_start().starts_with(&prefix));
        if !present {
            content.push_str(&format!("{}={}\n", key, value));
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_appends_missing_keys() {
        let merged = merge_env_lines("", &[("GH_TOKEN", "abc".to_string())]);
        assert_eq!(merged, "GH_TOKEN=abc\n");
    }

    #[test]
    fn test_merge_keeps_existing_keys() {
        let merged = merge_env_lines(
            "GH_TOKEN=old\n",
            &[
                ("GH_TOKEN", "new".to_string()),
                ("GH_OWNER", "me".to_string()),
            ],
        );
        assert_eq!(merged, "GH_TOKEN=old\nGH_OWNER=me\n");
    }

    #[test]
    fn test_merge_terminates_unfinished_last_line() {
        let merged = merge_env_lines("GH_TOKEN=old", &[("GH_OWNER", "me".to_string())]);
        assert_eq!(merged, "GH_TOKEN=old\nGH_OWNER=me\n");
    }
}
