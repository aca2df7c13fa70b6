use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Overrides;
use crate::run::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "confluence2md")]
#[command(about = "Convert Confluence pages to Markdown")]
#[command(version)]
pub struct Cli {
    /// Confluence page URL or numeric page ID
    pub url: String,

    /// Output directory or file path; a bare `-o` writes into `output/`.
    /// A directory gets a file named after the page title.
    #[arg(short, long, value_name = "PATH", num_args = 0..=1, default_missing_value = "output")]
    pub output: Option<PathBuf>,

    /// Print JSON with title, page_id, url and markdown
    #[arg(long)]
    pub json: bool,

    /// Skip downloading images
    #[arg(long)]
    pub no_images: bool,

    /// Use Obsidian callouts, wikilinks and embeds
    #[arg(long)]
    pub obsidian: bool,

    /// Prepend YAML frontmatter with page metadata
    #[arg(long)]
    pub frontmatter: bool,

    /// Override CONFLUENCE_BASE_URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Override CONFLUENCE_USERNAME
    #[arg(long)]
    pub username: Option<String>,

    /// Override CONFLUENCE_TOKEN
    #[arg(long)]
    pub token: Option<String>,

    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write log records to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            username: self.username.clone(),
            token: self.token.clone(),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            output: self.output.clone(),
            json: self.json,
            no_images: self.no_images,
            obsidian: self.obsidian,
            frontmatter: self.frontmatter,
            working_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::Cli;

    #[test]
    fn bare_output_flag_means_output_dir() {
        let cli = Cli::try_parse_from(["confluence2md", "123", "-o"]).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("output")));

        let cli = Cli::try_parse_from(["confluence2md", "-o", "notes/Page.md", "123"]).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("notes/Page.md")));

        let cli = Cli::try_parse_from(["confluence2md", "123"]).unwrap();
        assert_eq!(cli.output, None);
    }

    #[test]
    fn flags_and_overrides_are_collected() {
        let cli = Cli::try_parse_from([
            "confluence2md",
            "https://x.atlassian.net/wiki/x/AbC",
            "--json",
            "--no-images",
            "--obsidian",
            "--frontmatter",
            "--token",
            "secret",
            "-vv",
        ])
        .unwrap();
        assert!(cli.json && cli.no_images && cli.obsidian && cli.frontmatter);
        assert_eq!(cli.verbose, 2);
        let overrides = cli.overrides();
        assert_eq!(overrides.token.as_deref(), Some("secret"));
        assert_eq!(overrides.base_url, None);
    }

    #[test]
    fn url_is_required() {
        assert!(Cli::try_parse_from(["confluence2md"]).is_err());
    }
}
