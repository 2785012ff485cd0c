use std::path::PathBuf;

use clap::Parser;

/// Export a WordPress site's authors, categories and posts to local files.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "wp-export", version, about)]
pub struct Cli {
    /// RON configuration file. `wp_export.ron` is used when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root of the WordPress REST API, e.g. https://example.com/wp-json/wp/v2/
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Directory receiving the catalogs and posts.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Export at most this many posts; 0 exports all of them.
    #[arg(long, value_name = "N")]
    pub posts_limit: Option<usize>,

    /// Add post tags to the frontmatter.
    #[arg(long)]
    pub show_tags: bool,

    /// Attempts per request, including the first one.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Also write the log to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}
