use clap::Parser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

use crate::io::HttpOptions;
use crate::zip::{DEFAULT_MANIFEST_SUFFIX, OpenOptions};

#[derive(Parser, Debug)]
#[command(name = "szi-range")]
#[command(version)]
#[command(about = "Read single entries of large ZIP/SZI archives via Range requests", long_about = None)]
#[command(after_help = "Examples:\n  \
  szi-range -m https://example.com/image.szi            print the manifest entry name\n  \
  szi-range -p image.szi image/image_files/0/0_0.jpeg   write one tile to stdout\n  \
  szi-range -L -H 'Authorization: Bearer x' https://example.com/image.szi")]
pub struct Cli {
    /// Archive path or HTTP URL
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Entries to extract
    #[arg(value_name = "ENTRIES")]
    pub entries: Vec<String>,

    /// List entry names
    #[arg(short = 'l')]
    pub list: bool,

    /// List entries with their byte ranges
    #[arg(short = 'L')]
    pub list_ranges: bool,

    /// Print the manifest entry name
    #[arg(short = 'm')]
    pub manifest: bool,

    /// Print the tiles directory
    #[arg(short = 't')]
    pub tiles: bool,

    /// Write entry bodies to stdout, no messages
    #[arg(
        short = 'p',
        conflicts_with_all = ["list", "list_ranges", "manifest", "tiles", "extract_dir"]
    )]
    pub pipe: bool,

    /// Extract entries into DIR
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Suffix of the X/X.<suffix> manifest entry
    #[arg(long, value_name = "SUFFIX", default_value = DEFAULT_MANIFEST_SUFFIX)]
    pub suffix: String,

    /// Extra HTTP header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(HeaderName, HeaderValue)>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Attempts for timed out or refused HTTP connections
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub retries: u32,

    /// More log output (-vv for debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,
}

fn parse_header(s: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {s:?}"))?;
    let name = HeaderName::try_from(name.trim()).map_err(|e| e.to_string())?;
    let value = HeaderValue::try_from(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.archive.starts_with("http://") || self.archive.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet || self.pipe
    }

    /// Default log filter; `RUST_LOG` takes precedence
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "off",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout),
            max_retry: self.retries,
            headers: self.headers.iter().cloned().collect::<HeaderMap>(),
        }
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            manifest_suffix: self.suffix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_headers() {
        let cli = Cli::parse_from([
            "szi-range",
            "-H",
            "Authorization: Bearer abc",
            "-H",
            "X-Trace:1",
            "https://example.com/a.szi",
        ]);

        assert!(cli.is_http_url());
        let options = cli.http_options();
        assert_eq!(options.headers["authorization"], "Bearer abc");
        assert_eq!(options.headers["x-trace"], "1");
        assert_eq!(options.max_retry, 10);
    }

    #[test]
    fn pipe_keeps_stdout_for_entry_bytes() {
        for flag in ["-l", "-L", "-m", "-t"] {
            assert!(Cli::try_parse_from(["szi-range", "-p", flag, "a.szi", "a/a.dzi"]).is_err());
        }
        assert!(Cli::try_parse_from(["szi-range", "-p", "-d", "out", "a.szi", "a/a.dzi"]).is_err());

        let cli = Cli::parse_from(["szi-range", "-p", "a.szi", "a/a.dzi"]);
        assert!(cli.pipe);
    }

    #[test]
    fn rejects_headers_without_colon() {
        assert!(Cli::try_parse_from(["szi-range", "-H", "nope", "a.szi"]).is_err());
    }

    #[test]
    fn suffix_and_verbosity() {
        let cli = Cli::parse_from(["szi-range", "--suffix", "xml", "-vv", "a.szi", "a/a.xml"]);
        assert_eq!(cli.open_options().manifest_suffix, "xml");
        assert_eq!(cli.entries, ["a/a.xml"]);
        assert_eq!(cli.log_filter(), "debug");
    }
}
