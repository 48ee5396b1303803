use clap::Parser;
use std::path::PathBuf;

/// Student records sidecar. Reads one JSON request per line on stdin and
/// writes one JSON response per line on stdout. Logs go to stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "recordsd", version)]
pub struct Config {
    /// Flat-file store. Created with a demo dataset if it does not exist.
    #[arg(long, env = "RECORDS_DATA_FILE", default_value = "studentMarks.txt")]
    pub data_file: PathBuf,

    /// Pin that unlocks the session.
    #[arg(long, env = "RECORDS_ACCESS_PIN", default_value = "1701", hide_env_values = true)]
    pub access_pin: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::try_parse_from([
            "recordsd",
            "--data-file",
            "/tmp/marks.txt",
            "--access-pin",
            "4242",
        ])
        .expect("parse");
        assert_eq!(cfg.data_file, PathBuf::from("/tmp/marks.txt"));
        assert_eq!(cfg.access_pin, "4242");
    }

    #[test]
    fn command_definition_is_valid() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
