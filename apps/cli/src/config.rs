use clap::Parser;
use quickmedia_core::SEEK_SCALE;
use std::path::PathBuf;

/// Answer "now playing" queries from the OS media session manager as JSON lines.
///
/// Reads one command per line from stdin (`-help` lists them) and writes one
/// JSON object per command to stdout. An empty line or `exit` quits.
#[derive(Debug, Parser)]
#[command(name = "quickmedia", version, about)]
pub struct Args {
    /// Log filter used when RUST_LOG is not set (e.g. "debug", "quickmedia=trace")
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Multiplier applied to the seconds entered after `-seek`
    #[arg(long, default_value_t = SEEK_SCALE)]
    pub seek_scale: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["quickmedia"]);
        assert_eq!(args.log_level, "warn");
        assert!(args.log_file.is_none());
        assert_eq!(args.seek_scale, 9_999_999);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "quickmedia",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/quickmedia.log",
            "--seek-scale",
            "10000000",
        ]);
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/quickmedia.log")));
        assert_eq!(args.seek_scale, 10_000_000);
    }
}
