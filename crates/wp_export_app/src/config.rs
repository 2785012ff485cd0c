use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use ron::extensions::Extensions;
use serde::Deserialize;
use wp_export_engine::{ExportConfig, FetchSettings, MarkdownOptions};

use crate::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "wp_export.ron";

/// Optional settings read from a RON file. Every field may be left out;
/// command line flags take precedence over anything set here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub posts_limit: Option<usize>,
    pub show_tags: Option<bool>,
    pub log_file: Option<PathBuf>,
    pub markdown: Option<MarkdownOptions>,
    pub fetch: FetchFileConfig,
}

/// Durations are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchFileConfig {
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub max_bytes: Option<u64>,
    pub download_timeout_ms: Option<u64>,
    pub max_download_bytes: Option<u64>,
}

impl FetchFileConfig {
    fn apply(&self, settings: &mut FetchSettings) {
        if let Some(max_attempts) = self.max_attempts {
            settings.max_attempts = max_attempts;
        }
        if let Some(ms) = self.backoff_ms {
            settings.backoff_unit = Duration::from_millis(ms);
        }
        if let Some(ms) = self.connect_timeout_ms {
            settings.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.request_timeout_ms {
            settings.request_timeout = Duration::from_millis(ms);
        }
        if let Some(max_bytes) = self.max_bytes {
            settings.max_bytes = max_bytes;
        }
        if let Some(ms) = self.download_timeout_ms {
            settings.download_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(max_bytes) = self.max_download_bytes {
            settings.max_download_bytes = Some(max_bytes);
        }
    }
}

impl FileConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        Ok(options.from_str(text)?)
    }

    /// Reads `explicit` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it
    /// exists. A missing explicit file is an error; a missing default is not.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub export: ExportConfig,
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
}

/// Merges defaults, the config file and the command line, in rising order
/// of precedence.
pub fn resolve(cli: &Cli, file: FileConfig) -> anyhow::Result<Settings> {
    let api_url = cli
        .api_url
        .clone()
        .or(file.api_url)
        .unwrap_or_default();
    if api_url.trim().is_empty() {
        bail!("no API URL configured; pass --api-url or set api_url in {DEFAULT_CONFIG_FILE}");
    }

    let mut export = ExportConfig::new(api_url.trim());
    if let Some(data_dir) = cli.data_dir.clone().or(file.data_dir) {
        export.data_dir = data_dir;
    }
    if let Some(limit) = cli.posts_limit.or(file.posts_limit) {
        export.posts_limit = limit;
    }
    export.show_tags = cli.show_tags || file.show_tags.unwrap_or(false);
    if let Some(markdown) = file.markdown {
        export.markdown = markdown;
    }
    file.fetch.apply(&mut export.fetch);
    if let Some(max_attempts) = cli.max_attempts {
        export.fetch.max_attempts = max_attempts;
    }
    if export.fetch.max_attempts == 0 {
        bail!("max_attempts must be at least 1");
    }

    Ok(Settings {
        export,
        log_file: cli.log_file.clone().or(file.log_file),
        verbose: cli.verbose,
    })
}

pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let file = FileConfig::load(cli.config.as_deref())?;
    resolve(cli, file)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use wp_export_engine::CodeBlockStyle;

    use super::*;

    fn cli_with_url() -> Cli {
        Cli {
            api_url: Some("https://example.com/wp-json/wp/v2/".into()),
            ..Cli::default()
        }
    }

    #[test]
    fn defaults_apply_without_file() {
        let settings = resolve(&cli_with_url(), FileConfig::default()).unwrap();
        assert_eq!(settings.export.data_dir, PathBuf::from("data"));
        assert_eq!(settings.export.posts_limit, 0);
        assert!(!settings.export.show_tags);
        assert_eq!(settings.export.fetch.max_attempts, 3);
        assert_eq!(settings.export.fetch.backoff_unit, Duration::from_secs(1));
        assert_eq!(settings.export.fetch.download_timeout, None);
        assert_eq!(settings.export.fetch.max_download_bytes, None);
        assert_eq!(settings.log_file, None);
    }

    #[test]
    fn missing_api_url_is_rejected() {
        let err = resolve(&Cli::default(), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--api-url"));

        let file = FileConfig {
            api_url: Some("   ".into()),
            ..FileConfig::default()
        };
        assert!(resolve(&Cli::default(), file).is_err());
    }

    #[test]
    fn ron_file_fields_are_optional() {
        let file = FileConfig::parse(
            r#"(
                api_url: "https://blog.example/wp-json/wp/v2",
                posts_limit: 5,
                show_tags: true,
                fetch: (backoff_ms: 250, max_attempts: 4, max_download_bytes: 1000),
                markdown: (bullet_marker: "*", code_block_style: Indented),
            )"#,
        )
        .unwrap();

        let settings = resolve(&Cli::default(), file).unwrap();
        assert_eq!(settings.export.api_url, "https://blog.example/wp-json/wp/v2");
        assert_eq!(settings.export.posts_limit, 5);
        assert!(settings.export.show_tags);
        assert_eq!(settings.export.fetch.max_attempts, 4);
        assert_eq!(settings.export.fetch.backoff_unit, Duration::from_millis(250));
        assert_eq!(settings.export.fetch.max_download_bytes, Some(1000));
        assert_eq!(settings.export.fetch.download_timeout, None);
        assert_eq!(settings.export.markdown.bullet_marker, "*");
        assert_eq!(
            settings.export.markdown.code_block_style,
            CodeBlockStyle::Indented
        );
        assert_eq!(settings.export.markdown.em_delimiter, "*");
    }

    #[test]
    fn command_line_overrides_file() {
        let file = FileConfig {
            api_url: Some("https://file.example/wp-json/wp/v2".into()),
            data_dir: Some(PathBuf::from("from-file")),
            posts_limit: Some(10),
            fetch: FetchFileConfig {
                max_attempts: Some(5),
                ..FetchFileConfig::default()
            },
            ..FileConfig::default()
        };
        let cli = Cli {
            data_dir: Some(PathBuf::from("from-cli")),
            posts_limit: Some(1),
            max_attempts: Some(2),
            ..cli_with_url()
        };

        let settings = resolve(&cli, file).unwrap();
        assert_eq!(settings.export.api_url, "https://example.com/wp-json/wp/v2/");
        assert_eq!(settings.export.data_dir, PathBuf::from("from-cli"));
        assert_eq!(settings.export.posts_limit, 1);
        assert_eq!(settings.export.fetch.max_attempts, 2);
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let cli = Cli {
            max_attempts: Some(0),
            ..cli_with_url()
        };
        assert!(resolve(&cli, FileConfig::default()).is_err());
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"(data_dir: "export-out", log_file: "run.log")"#).unwrap();

        let loaded = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded.data_dir, Some(PathBuf::from("export-out")));
        assert_eq!(loaded.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = FileConfig::load(Some(temp.path().join("nope.ron").as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("nope.ron"));
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(FileConfig::parse("(api_url: )").is_err());
    }
}
