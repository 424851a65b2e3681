use anyhow::Result;
use colored::Colorize;
use regex::Regex;

use crate::cli::{CleanArgs, ListArgs};
use crate::config::{self, Config, PlatformSelection};
use crate::error::AppError;
use crate::github::GithubClient;
use crate::gitlab::GitlabClient;
use crate::grouping::{filter_groups, group_images_by_name};
use crate::models::{
    DeleteStats, GithubRelease, GithubTag, GitlabRelease, GitlabTag, GroupedVersionSelection,
    ImageGroup, RegistryKind, VersionRecord,
};
use crate::output;
use crate::prompts::{self, EmptyPolicy, Scope};
use crate::registry::ContainerGateway;

pub async fn run_clean(args: &CleanArgs, verbose: bool) -> Result<()> {
    let filter = match &args.filter {
        Some(pattern) => Some(Regex::new(pattern).map_err(AppError::InvalidPattern)?),
        None => None,
    };

    let (scope, platforms) = match resolve_scope_and_platforms(args)? {
        Some(resolved) => resolved,
        None => return Ok(()),
    };

    if !platforms.any() {
        println!("No platforms selected.");
        return Ok(());
    }

    output::print_run_header(scope, &platforms, args.dry_run);

    let config = config::get_config(&platforms)?;

    let mut totals = DeleteStats::default();

    if scope.forge() && (platforms.github || platforms.gitlab) {
        totals.merge(run_forge_cleanup(scope, &platforms, &config, args.dry_run, verbose).await?);
    }

    if scope.containers && platforms.any_registry() {
        totals.merge(
            run_container_cleanup(&platforms, &config, filter.as_ref(), args.dry_run, verbose)
                .await?,
        );
    }

    output::print_final_summary(&totals, args.dry_run);
    Ok(())
}

pub async fn run_list(args: &ListArgs, verbose: bool) -> Result<()> {
    let preset = Scope {
        releases: args.releases,
        tags: args.tags,
        containers: args.containers,
    };
    let scope = if preset.any() {
        preset
    } else {
        Scope {
            releases: true,
            tags: true,
            containers: true,
        }
    };

    let platforms = match prompts::select_platforms(scope)? {
        Some(platforms) => platforms,
        None => return Ok(()),
    };

    if !platforms.any() {
        println!("No platforms selected.");
        return Ok(());
    }

    let config = config::get_config(&platforms)?;

    if scope.forge() {
        println!("\nFetching releases and tags...");

        if platforms.github {
            let client = GithubClient::new(&config.github, verbose);
            let (releases, tags) = fetch_github_items(&client, scope).await;
            output::print_forge_section(
                "GitHub",
                &releases.iter().map(|r| r.label()).collect::<Vec<_>>(),
                &tags.iter().map(|t| t.name.clone()).collect::<Vec<_>>(),
            );
        }

        if platforms.gitlab {
            let client = GitlabClient::new(&config.gitlab, verbose);
            let (releases, tags) = fetch_gitlab_items(&client, scope).await;
            output::print_forge_section(
                "GitLab",
                &releases.iter().map(|r| r.label()).collect::<Vec<_>>(),
                &tags.iter().map(|t| t.name.clone()).collect::<Vec<_>>(),
            );
        }
    }

    if scope.containers && platforms.any_registry() {
        let gateway = ContainerGateway::from_config(&config, &platforms, verbose)?;
        println!("\nFetching container images...");
        let images = gateway.list_all_images().await;
        let groups = group_images_by_name(&images);
        output::print_image_groups(&groups);
    }

    Ok(())
}

/// Run the two wizard steps, honoring flag presets and back navigation.
/// Returns None when the operator exits.
fn resolve_scope_and_platforms(args: &CleanArgs) -> Result<Option<(Scope, PlatformSelection)>> {
    let preset = Scope {
        releases: args.releases,
        tags: args.tags,
        containers: args.containers,
    };

    loop {
        let scope = if preset.any() {
            preset
        } else {
            match prompts::select_scope()? {
                Some(scope) => scope,
                None => return Ok(None),
            }
        };

        match prompts::select_platforms(scope)? {
            Some(platforms) => return Ok(Some((scope, platforms))),
            None => {
                if preset.any() {
                    // Flags fixed the scope; there is nothing to go back to.
                    return Ok(None);
                }
                println!();
            }
        }
    }
}

async fn fetch_github_items(
    client: &GithubClient,
    scope: Scope,
) -> (Vec<GithubRelease>, Vec<GithubTag>) {
    let releases = if scope.releases {
        match client.list_releases().await {
            Ok(releases) => releases,
            Err(e) => {
                eprintln!("[ERROR] Failed to fetch GitHub releases: {:#}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let tags = if scope.tags {
        match client.list_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                eprintln!("[ERROR] Failed to fetch GitHub tags: {:#}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    (releases, tags)
}

async fn fetch_gitlab_items(
    client: &GitlabClient,
    scope: Scope,
) -> (Vec<GitlabRelease>, Vec<GitlabTag>) {
    let releases = if scope.releases {
        match client.list_releases().await {
            Ok(releases) => releases,
            Err(e) => {
                eprintln!("[ERROR] Failed to fetch GitLab releases: {:#}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let tags = if scope.tags {
        match client.list_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                eprintln!("[ERROR] Failed to fetch GitLab tags: {:#}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    (releases, tags)
}

/// Releases/tags flow: fetch, pick, one confirmation, then delete per
/// platform concurrently (the platforms are independent).
async fn run_forge_cleanup(
    scope: Scope,
    platforms: &PlatformSelection,
    config: &Config,
    dry_run: bool,
    verbose: bool,
) -> Result<DeleteStats> {
    println!("\nFetching releases and tags...");

    let github = if platforms.github {
        Some(GithubClient::new(&config.github, verbose))
    } else {
        None
    };
    let gitlab = if platforms.gitlab {
        Some(GitlabClient::new(&config.gitlab, verbose))
    } else {
        None
    };

    // Independent reads, fetched concurrently.
    let github_fut = async {
        match &github {
            Some(client) => fetch_github_items(client, scope).await,
            None => (Vec::new(), Vec::new()),
        }
    };
    let gitlab_fut = async {
        match &gitlab {
            Some(client) => fetch_gitlab_items(client, scope).await,
            None => (Vec::new(), Vec::new()),
        }
    };
    let ((gh_releases, gh_tags), (gl_releases, gl_tags)) = tokio::join!(github_fut, gitlab_fut);

    let gh_release_sel = select_forge_items(&gh_releases, "releases", "GitHub", |r| r.label())?;
    let gh_tag_sel = select_forge_items(&gh_tags, "tags", "GitHub", |t| t.name.clone())?;
    let gl_release_sel = select_forge_items(&gl_releases, "releases", "GitLab", |r| r.label())?;
    let gl_tag_sel = select_forge_items(&gl_tags, "tags", "GitLab", |t| t.name.clone())?;

    let total =
        gh_release_sel.len() + gh_tag_sel.len() + gl_release_sel.len() + gl_tag_sel.len();
    if total == 0 {
        println!("\nNo releases or tags selected.");
        return Ok(DeleteStats::default());
    }

    println!("\nTotal releases/tags to delete: {}", total);

    if !prompts::confirm(
        "Are you sure you want to delete the selected releases/tags?",
        false,
    )? {
        println!("Operation cancelled");
        return Ok(DeleteStats::default());
    }

    if dry_run {
        for release in &gh_release_sel {
            println!("  [{}] GitHub release {}", "DRY RUN".yellow().bold(), release.tag_name);
        }
        for tag in &gh_tag_sel {
            println!("  [{}] GitHub tag {}", "DRY RUN".yellow().bold(), tag.name);
        }
        for release in &gl_release_sel {
            println!("  [{}] GitLab release {}", "DRY RUN".yellow().bold(), release.tag_name);
        }
        for tag in &gl_tag_sel {
            println!("  [{}] GitLab tag {}", "DRY RUN".yellow().bold(), tag.name);
        }
        return Ok(DeleteStats {
            deleted: total,
            failed: 0,
        });
    }

    println!("\nStarting cleanup...");

    let github_fut = async {
        match &github {
            Some(client) if !gh_release_sel.is_empty() || !gh_tag_sel.is_empty() => {
                client.delete_items(&gh_release_sel, &gh_tag_sel).await
            }
            _ => DeleteStats::default(),
        }
    };
    let gitlab_fut = async {
        match &gitlab {
            Some(client) if !gl_release_sel.is_empty() || !gl_tag_sel.is_empty() => {
                client.delete_items(&gl_release_sel, &gl_tag_sel).await
            }
            _ => DeleteStats::default(),
        }
    };
    let (github_stats, gitlab_stats) = tokio::join!(github_fut, gitlab_fut);

    let mut stats = github_stats;
    stats.merge(gitlab_stats);
    Ok(stats)
}

fn select_forge_items<T: Clone>(
    items: &[T],
    kind: &str,
    platform: &str,
    label: impl Fn(&T) -> String,
) -> Result<Vec<T>> {
    if items.is_empty() {
        println!("No {} found on {}", kind, platform);
        return Ok(Vec::new());
    }

    let labels = items.iter().map(|item| label(item)).collect();
    let indices = prompts::check_indices(
        &format!(
            "Select {} {} to delete (empty for all):",
            platform, kind
        ),
        labels,
        &[],
        EmptyPolicy::SelectAll,
    )?;

    Ok(indices.into_iter().map(|i| items[i].clone()).collect())
}

/// Grouped container flow: list, group, pick groups, then per group pick
/// versions, confirm and delete, with a continue gate between groups.
async fn run_container_cleanup(
    platforms: &PlatformSelection,
    config: &Config,
    filter: Option<&Regex>,
    dry_run: bool,
    verbose: bool,
) -> Result<DeleteStats> {
    let gateway = ContainerGateway::from_config(config, platforms, verbose)?;

    println!("\nFetching container images...");
    let images = gateway.list_all_images().await;

    let groups = filter_groups(group_images_by_name(&images), filter);
    let selected = select_image_groups(groups)?;

    let mut totals = DeleteStats::default();
    let count = selected.len();

    for (index, group) in selected.into_iter().enumerate() {
        let selection = select_versions_for_group(&group, &gateway).await?;
        totals.merge(confirm_and_delete_group(&selection, &gateway, dry_run).await?);

        if index + 1 < count
            && !prompts::confirm("Continue with next image group?", true)?
        {
            println!("Skipping remaining groups...");
            break;
        }
    }

    Ok(totals)
}

/// Present the sorted groups as a checkbox with only the first pre-checked.
/// An empty input returns empty without prompting.
pub fn select_image_groups(groups: Vec<ImageGroup>) -> Result<Vec<ImageGroup>> {
    if groups.is_empty() {
        println!("No container images found");
        return Ok(Vec::new());
    }

    let labels = groups.iter().map(|group| group.label()).collect();
    let indices = prompts::check_indices(
        "Select image groups to clean up (space to select, enter to confirm):",
        labels,
        &[0],
        EmptyPolicy::KeepNone,
    )?;

    Ok(groups
        .into_iter()
        .enumerate()
        .filter(|(index, _)| indices.contains(index))
        .map(|(_, group)| group)
        .collect())
}

/// Fetch and choose deletable versions for one group, registry by
/// registry. Only kinds present in the group are resolved; a fetch failure
/// for one kind contributes nothing and never aborts the others. An
/// explicit empty selection is honored.
pub async fn select_versions_for_group(
    group: &ImageGroup,
    gateway: &ContainerGateway,
) -> Result<GroupedVersionSelection> {
    println!("\nWorking on: {}", group.base_name.bold());

    let mut selection = GroupedVersionSelection::new(group.base_name.clone());

    for kind in RegistryKind::ALL {
        let image = match group.registries.get(kind) {
            Some(image) => image,
            None => continue,
        };

        println!("Fetching {} versions...", kind);
        let versions = match gateway.list_versions(kind, image).await {
            Ok(versions) => versions,
            Err(e) => {
                eprintln!(
                    "[ERROR] Failed to fetch {} versions for {}: {:#}",
                    kind, image.name, e
                );
                continue;
            }
        };

        if versions.is_empty() {
            continue;
        }

        let labels = versions.iter().map(|version| version.label()).collect();
        let indices = prompts::check_indices(
            &format!(
                "[{}] Select versions of \"{}\" to delete:",
                kind, group.base_name
            ),
            labels,
            &[],
            EmptyPolicy::KeepNone,
        )?;

        let chosen: Vec<VersionRecord> =
            indices.into_iter().map(|i| versions[i].clone()).collect();
        selection.set_records(kind, chosen);
    }

    Ok(selection)
}

/// Summarize, confirm and delete one group's selection.
///
/// A zero total skips without prompting; declining the confirmation skips.
/// Deletions run sequentially per registry kind and isolate per-item
/// failures; the confirmed total comes from the resolved selection, not
/// the group's stale aggregate.
pub async fn confirm_and_delete_group(
    selection: &GroupedVersionSelection,
    gateway: &ContainerGateway,
    dry_run: bool,
) -> Result<DeleteStats> {
    let total = selection.total();
    if total == 0 {
        println!(
            "\nNo versions selected for \"{}\". Skipping...",
            selection.base_name
        );
        return Ok(DeleteStats::default());
    }

    output::print_group_summary(selection);

    if !prompts::confirm(
        &format!(
            "Delete {} total versions of \"{}\"?",
            total, selection.base_name
        ),
        false,
    )? {
        println!("Skipped \"{}\"", selection.base_name);
        return Ok(DeleteStats::default());
    }

    if dry_run {
        output::print_dry_run_versions(selection);
        return Ok(DeleteStats {
            deleted: total,
            failed: 0,
        });
    }

    let mut stats = DeleteStats::default();
    for kind in RegistryKind::ALL {
        let records = selection.records(kind);
        if records.is_empty() {
            continue;
        }
        stats.merge(gateway.delete_versions(kind, records).await);
    }

    println!("Deleted versions of \"{}\"", selection.base_name);
    Ok(stats)
}
