//! Maintenance commands over a classdesk SQLite store.
//!
//! # Usage
//! `classdesk_cli <db-path> <command> [file]`
//!
//! Commands: `stats`, `validate`, `cleanup`, `export`, `import <file>`,
//! `backup`, `restore <file>`, `reset`. Results are printed as JSON.
//!
//! Set `CLASSDESK_LOG_DIR` to an absolute directory to enable file logging,
//! and `CLASSDESK_LOG_LEVEL` to override the default level.

use classdesk_core::{core_version, default_log_level, init_logging, Repository, RepositoryConfig};
use log::LevelFilter;
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;

const USAGE: &str = "usage: classdesk_cli <db-path> \
<stats|validate|cleanup|export|import <file>|backup|restore <file>|reset|version>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(db_path), Some(command)) = (args.first(), args.get(1)) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    if let Ok(log_dir) = std::env::var("CLASSDESK_LOG_DIR") {
        let level = std::env::var("CLASSDESK_LOG_LEVEL")
            .ok()
            .and_then(|raw| raw.parse::<LevelFilter>().ok())
            .unwrap_or_else(default_log_level);
        if let Err(err) = init_logging(level, Path::new(&log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = RepositoryConfig {
        autosync_interval_secs: 0,
        ..RepositoryConfig::default()
    };

    let mut repo = match Repository::open_sqlite(db_path, config) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("failed to open store `{db_path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let input = |label: &str| -> Result<String, String> {
        let path = args
            .get(2)
            .ok_or_else(|| format!("`{label}` requires a file argument"))?;
        std::fs::read_to_string(path).map_err(|err| format!("failed to read `{path}`: {err}"))
    };

    let outcome = match command.as_str() {
        "stats" => serde_json::to_string_pretty(&repo.stats()).map_err(|err| err.to_string()),
        "validate" => serde_json::to_string_pretty(&repo.validate()).map_err(|err| err.to_string()),
        "cleanup" => Ok(json!({ "repairs": repo.cleanup() }).to_string()),
        "export" => Ok(repo.export_snapshot()),
        "import" => input("import")
            .map(|raw| json!({ "ok": repo.import_snapshot(&raw) }).to_string()),
        "backup" => Ok(repo.create_backup().to_json()),
        "restore" => input("restore")
            .map(|raw| json!({ "ok": repo.restore_backup(&raw) }).to_string()),
        "reset" => {
            let report = repo.reset_to_defaults();
            Ok(json!({ "ok": report.is_complete() }).to_string())
        }
        "version" => Ok(json!({ "version": core_version() }).to_string()),
        other => Err(format!("unknown command `{other}`\n{USAGE}")),
    };

    // flushes anything still dirty and releases the database file
    drop(repo.destroy());

    match outcome {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
