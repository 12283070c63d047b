//! Backup Trigger - Main entry point
//!
//! Archives SOURCE into DEST only if SOURCE changed since the last
//! successful backup.

use anyhow::Result;
use backup_trigger::{config::Config, utils, BackupEngine, HistoryStore, TriggerError};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to back up
    #[arg(value_name = "SOURCE", required_unless_present = "history")]
    source: Option<PathBuf>,

    /// Directory receiving the archives (created if missing)
    #[arg(value_name = "DEST", required_unless_present = "history")]
    destination: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// History log file (overrides config)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the recorded history and exit
    #[arg(long)]
    history: bool,
}

/// Config file (or defaults), then environment, then flags; validated last.
fn resolve_config<F>(args: &Args, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    config.apply_env_overrides(env);
    if let Some(log_file) = &args.log_file {
        config.history.log_file = log_file.clone();
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }

    config.validate().map_err(TriggerError::Config)?;
    Ok(config)
}

// Single-threaded: the archiver child process is the only concurrent work.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = resolve_config(&args, |key| std::env::var(key).ok())?;

    // Initialize logging
    utils::logger::init(&config.log.level)?;

    if args.history {
        let store = HistoryStore::new(config.history.log_file.clone());
        for line in store.entries().await? {
            println!("{}", line);
        }
        return Ok(());
    }

    let (Some(source), Some(destination)) = (args.source, args.destination) else {
        anyhow::bail!("SOURCE and DEST are required");
    };

    tracing::debug!(
        "Starting backup-trigger v{} (log: {})",
        env!("CARGO_PKG_VERSION"),
        config.history.log_file.display()
    );

    let engine = BackupEngine::from_config(&config, source, destination);
    let outcome = engine.run().await?;
    println!("{}", outcome.status_line());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backup_trigger::config::{ENV_ARCHIVER, ENV_LOG_FILE};
    use clap::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_positionals_is_usage_error() {
        let err = Args::try_parse_from(["backup-trigger"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);

        let err = Args::try_parse_from(["backup-trigger", "src"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_history_flag_needs_no_positionals() {
        let args = Args::try_parse_from(["backup-trigger", "--history"]).unwrap();
        assert!(args.history);
        assert!(args.source.is_none());
        assert!(args.destination.is_none());
    }

    #[test]
    fn test_source_and_destination() {
        let args = Args::try_parse_from(["backup-trigger", "src", "dst"]).unwrap();
        assert_eq!(args.source, Some(PathBuf::from("src")));
        assert_eq!(args.destination, Some(PathBuf::from("dst")));
        assert!(!args.history);
    }

    #[test]
    fn test_empty_log_file_flag_rejected() {
        assert!(Args::try_parse_from(["backup-trigger", "--log-file", "", "src", "dst"]).is_err());
    }

    #[test]
    fn test_flag_beats_env_beats_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("backup-trigger.toml");
        fs::write(
            &config_path,
            "[history]\nlog_file = \"from_file.txt\"\n[archive]\nprogram = \"gtar\"\n",
        )
        .unwrap();
        let config_arg = config_path.to_str().unwrap();
        let env = |key: &str| (key == ENV_LOG_FILE).then(|| "from_env.txt".to_string());

        let args = Args::try_parse_from(["backup-trigger", "-c", config_arg, "src", "dst"]).unwrap();
        let config = resolve_config(&args, no_env).unwrap();
        assert_eq!(config.history.log_file, PathBuf::from("from_file.txt"));
        assert_eq!(config.archive.program, "gtar");

        let config = resolve_config(&args, env).unwrap();
        assert_eq!(config.history.log_file, PathBuf::from("from_env.txt"));
        assert_eq!(config.archive.program, "gtar");

        let args = Args::try_parse_from([
            "backup-trigger",
            "-c",
            config_arg,
            "--log-file",
            "from_flag.txt",
            "src",
            "dst",
        ])
        .unwrap();
        let config = resolve_config(&args, env).unwrap();
        assert_eq!(config.history.log_file, PathBuf::from("from_flag.txt"));
    }

    #[test]
    fn test_overrides_are_validated() {
        let args = Args::try_parse_from(["backup-trigger", "src", "dst"]).unwrap();
        let env = |key: &str| (key == ENV_ARCHIVER).then(|| "   ".to_string());

        let err = resolve_config(&args, env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TriggerError>(),
            Some(TriggerError::Config(_))
        ));
    }

    #[test]
    fn test_log_level_flag() {
        let args = Args::try_parse_from(["backup-trigger", "-l", "debug", "src", "dst"]).unwrap();
        let config = resolve_config(&args, no_env).unwrap();
        assert_eq!(config.log.level, "debug");
    }
}
