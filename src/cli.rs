use clap::{Args, Parser, Subcommand};

/// repotidy — cross-platform release, tag and container image cleaner
#[derive(Parser, Debug)]
#[command(name = "repotidy", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactively select and delete releases, tags and image versions
    Clean(CleanArgs),

    /// List releases, tags and image groups without deleting anything
    List(ListArgs),
}

#[derive(Args, Debug, Default)]
pub struct CleanArgs {
    /// Delete releases (skips the what-to-delete prompt)
    #[arg(long)]
    pub releases: bool,

    /// Delete tags (skips the what-to-delete prompt)
    #[arg(long)]
    pub tags: bool,

    /// Delete container image versions (skips the what-to-delete prompt)
    #[arg(long)]
    pub containers: bool,

    /// Only offer image groups whose base name matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Preview deletions without performing them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// List releases only
    #[arg(long)]
    pub releases: bool,

    /// List tags only
    #[arg(long)]
    pub tags: bool,

    /// List container images only
    #[arg(long)]
    pub containers: bool,
}
