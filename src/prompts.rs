use std::fmt;

use anyhow::Result;
use inquire::{Confirm, MultiSelect, Select};

use crate::config::PlatformSelection;

pub const PAGE_SIZE: usize = 15;

pub const BACK_OPTION: &str = "Go back";

/// What an empty checkbox submission means at a given call site.
///
/// Release/tag pickers treat "select nothing" as "select everything";
/// per-version pickers must honor the empty choice because the action is
/// destructive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    SelectAll,
    KeepNone,
}

/// One checkbox row tied back to its source index.
#[derive(Clone)]
struct IndexedChoice {
    index: usize,
    label: String,
}

impl fmt::Display for IndexedChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Run a checkbox prompt over `labels` and return the chosen indices in
/// their original order.
pub fn check_indices(
    message: &str,
    labels: Vec<String>,
    defaults: &[usize],
    on_empty: EmptyPolicy,
) -> Result<Vec<usize>> {
    let total = labels.len();
    let choices: Vec<IndexedChoice> = labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| IndexedChoice { index, label })
        .collect();

    let selected = MultiSelect::new(message, choices)
        .with_default(defaults)
        .with_page_size(PAGE_SIZE)
        .prompt()?;

    let mut indices: Vec<usize> = selected.into_iter().map(|choice| choice.index).collect();
    indices.sort_unstable();

    if indices.is_empty() && on_empty == EmptyPolicy::SelectAll {
        return Ok((0..total).collect());
    }
    Ok(indices)
}

pub fn confirm(message: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new(message).with_default(default).prompt()?)
}

/// What the operator wants to delete this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub releases: bool,
    pub tags: bool,
    pub containers: bool,
}

impl Scope {
    pub fn any(&self) -> bool {
        self.releases || self.tags || self.containers
    }

    pub fn forge(&self) -> bool {
        self.releases || self.tags
    }
}

/// Step 1: what to delete. Returns None when the operator exits.
pub fn select_scope() -> Result<Option<Scope>> {
    let options = vec![
        "Releases only",
        "Tags only",
        "Containers only",
        "Releases & Tags",
        "Everything",
        "Exit",
    ];

    let choice = Select::new("What do you want to delete?", options).prompt()?;

    let scope = match choice {
        "Releases only" => Scope {
            releases: true,
            ..Default::default()
        },
        "Tags only" => Scope {
            tags: true,
            ..Default::default()
        },
        "Containers only" => Scope {
            containers: true,
            ..Default::default()
        },
        "Releases & Tags" => Scope {
            releases: true,
            tags: true,
            containers: false,
        },
        "Everything" => Scope {
            releases: true,
            tags: true,
            containers: true,
        },
        _ => return Ok(None),
    };

    Ok(Some(scope))
}

/// Step 2: which platforms. Returns None when the operator goes back.
pub fn select_platforms(scope: Scope) -> Result<Option<PlatformSelection>> {
    let mut platforms = PlatformSelection::default();

    if scope.forge() {
        let options = vec!["GitHub", "GitLab", "Everywhere", BACK_OPTION];
        let choice = Select::new("From where do you want to delete?", options).prompt()?;

        if choice == BACK_OPTION {
            return Ok(None);
        }

        platforms.github = matches!(choice, "GitHub" | "Everywhere");
        platforms.gitlab = matches!(choice, "GitLab" | "Everywhere");

        if scope.containers && choice == "Everywhere" {
            platforms.ghcr = true;
            platforms.gitlab_registry = true;
            platforms.docker_hub = true;
            return Ok(Some(platforms));
        }

        // GitHub credentials double as GHCR credentials.
        if scope.containers && platforms.github {
            platforms.ghcr = true;
        }
    }

    if scope.containers {
        let ghcr_offered = !platforms.ghcr;

        let mut options: Vec<&str> = Vec::new();
        if ghcr_offered {
            options.push("GitHub Container Registry (GHCR)");
        }
        options.push("GitLab Container Registry");
        options.push("Docker Hub");
        options.push("Everywhere");
        options.push(BACK_OPTION);

        let defaults: &[usize] = if ghcr_offered { &[0] } else { &[] };
        let selected = MultiSelect::new(
            "Select container registries (space to select, enter to confirm):",
            options,
        )
        .with_default(defaults)
        .with_page_size(PAGE_SIZE)
        .prompt()?;

        if selected.contains(&BACK_OPTION) {
            return Ok(None);
        }

        if selected.contains(&"Everywhere") {
            platforms.ghcr = true;
            platforms.gitlab_registry = true;
            platforms.docker_hub = true;
        } else {
            if ghcr_offered {
                platforms.ghcr = selected.contains(&"GitHub Container Registry (GHCR)");
            }
            platforms.gitlab_registry = selected.contains(&"GitLab Container Registry");
            platforms.docker_hub = selected.contains(&"Docker Hub");
        }
    }

    Ok(Some(platforms))
}
