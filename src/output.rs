use colored::Colorize;

use crate::config::PlatformSelection;
use crate::models::{DeleteStats, GroupedVersionSelection, ImageGroup, RegistryKind};
use crate::prompts::Scope;

/// Print the configuration recap before fetching anything.
pub fn print_run_header(scope: Scope, platforms: &PlatformSelection, dry_run: bool) {
    println!("\n{}", "Configuration Summary".bold());
    println!("{}", "─".repeat(50));
    if dry_run {
        println!("  {} (no changes will be made)", "DRY RUN".yellow().bold());
    }
    if scope.releases {
        println!("  Deleting releases");
    }
    if scope.tags {
        println!("  Deleting tags");
    }
    if scope.containers {
        println!("  Deleting containers");
    }
    println!("\n  From platforms:");
    if platforms.github {
        println!("    - GitHub");
    }
    if platforms.gitlab {
        println!("    - GitLab");
    }
    if platforms.ghcr {
        println!("    - GitHub Container Registry (GHCR)");
    }
    if platforms.gitlab_registry {
        println!("    - GitLab Container Registry");
    }
    if platforms.docker_hub {
        println!("    - Docker Hub");
    }
    println!("{}", "─".repeat(50));
}

/// Per-registry recap of one group's selection before the confirm prompt.
pub fn print_group_summary(selection: &GroupedVersionSelection) {
    println!("\nSummary for {}:", selection.base_name.bold());
    for kind in RegistryKind::ALL {
        let records = selection.records(kind);
        if !records.is_empty() {
            println!("  - {}: {} versions", kind, records.len());
        }
    }
}

pub fn print_dry_run_versions(selection: &GroupedVersionSelection) {
    for kind in RegistryKind::ALL {
        for version in selection.records(kind) {
            println!(
                "  [{}] {} {}",
                "DRY RUN".yellow().bold(),
                kind,
                version.describe()
            );
        }
    }
}

/// One section of the `list` inventory.
pub fn print_forge_section(platform: &str, releases: &[String], tags: &[String]) {
    println!("\n{}", platform.bold());
    println!("{}", "─".repeat(60));
    if !releases.is_empty() {
        println!("  {} ({}):", "RELEASES".cyan().bold(), releases.len());
        for release in releases {
            println!("    {}", release);
        }
    }
    if !tags.is_empty() {
        println!("  {} ({}):", "TAGS".cyan().bold(), tags.len());
        for tag in tags {
            println!("    {}", tag);
        }
    }
    if releases.is_empty() && tags.is_empty() {
        println!("  {}", "Nothing found.".dimmed());
    }
}

pub fn print_image_groups(groups: &[ImageGroup]) {
    println!("\n{}", "Container image groups".bold());
    println!("{}", "─".repeat(60));
    if groups.is_empty() {
        println!("  {}", "No container images found.".dimmed());
        return;
    }
    for group in groups {
        println!("  {}", group.label());
    }
}

/// Print final summary
pub fn print_final_summary(stats: &DeleteStats, dry_run: bool) {
    println!("\n{}", "═".repeat(60));
    if dry_run {
        println!(
            "{} Would delete {} items, {} errors",
            "DRY RUN SUMMARY:".yellow().bold(),
            stats.deleted.to_string().red().bold(),
            stats.failed
        );
    } else {
        println!(
            "{} Deleted {} items, {} errors",
            "SUMMARY:".bold(),
            stats.deleted.to_string().green().bold(),
            if stats.failed > 0 {
                stats.failed.to_string().red().bold().to_string()
            } else {
                stats.failed.to_string()
            }
        );
    }
}
