//! Startup tasks: logger and folder structure.

use anstyle::{AnsiColor, Style};
use anyhow::Result;
use env_logger::{Builder, WriteStyle};
use log::kv::Key;
use log::{LevelFilter, info};
use std::io::Write;

use crate::config::AppConfig;
use crate::utils::ensure_dir;

// ────────────────────────────────────────────────────────────────
// Folder Initialization
// ────────────────────────────────────────────────────────────────

/// Create the project directory and the directory holding the database.
pub fn initialize_folder(config: &AppConfig) -> Result<()> {
    ensure_dir(&config.project_dir)?;
    if let Some(parent) = config.database.parent() {
        ensure_dir(parent)?;
    }
    info!("Project directory: {:?}", config.project_dir);
    Ok(())
}

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

const DIM: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::BrightBlack)));
const CYAN: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Cyan)));

/// Format a `duration` key value such as `1.234567ms` as `1.23 ms`.
fn format_duration(raw: &str) -> String {
    if let Some(idx) = raw.find(|c: char| c.is_alphabetic()) {
        let (num, unit) = (&raw[..idx], &raw[idx..]);
        if let Ok(val) = num.parse::<f32>() {
            return format!("{:.2} {}", val, unit);
        }
    }
    raw.to_string()
}

/// Install the global logger. `RUST_LOG` overrides the default filters.
pub fn initialize_logger(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let result = Builder::new()
        .write_style(WriteStyle::Auto)
        .format(|buf, record| {
            let ts = buf.timestamp();

            let level_style = buf.default_level_style(record.level());
            let lvl = format!(
                "{}{}{}",
                level_style.render(),
                record.level(),
                level_style.render_reset()
            );

            let dur_raw = record
                .key_values()
                .get(Key::from("duration"))
                .map(|v| format_duration(&v.to_string()))
                .unwrap_or_default();

            // Right-align the duration to width 10 so messages line up
            let dur = if dur_raw.is_empty() {
                " ".repeat(10)
            } else {
                format!("{}{:>10}{}", CYAN.render(), dur_raw, CYAN.render_reset())
            };

            writeln!(
                buf,
                "{}{}{} {} {}{}{}",
                DIM.render(),
                ts,
                DIM.render_reset(),
                lvl,
                DIM.render(),
                record.target(),
                DIM.render_reset()
            )?;

            let message = record.args().to_string();
            let subsequent_indent = " ".repeat(11);
            let mut lines = message.lines();

            if let Some(first_line) = lines.next() {
                writeln!(buf, "{} {}", dur, first_line)?;
            }
            for line in lines {
                writeln!(buf, "{}{}", subsequent_indent, line)?;
            }

            Ok(())
        })
        // INFO+ globally (DEBUG in debug mode), WARN+ for Rocket
        .filter(None, level)
        .filter(Some("rocket"), LevelFilter::Warn)
        .parse_default_env()
        .try_init();

    // A second initialization (e.g. from tests) keeps the first logger.
    if let Err(err) = result {
        eprintln!("Logger already initialized: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_duration_with_two_decimals() {
        assert_eq!(format_duration("1.234567ms"), "1.23 ms");
        assert_eq!(format_duration("12s"), "12.00 s");
        assert_eq!(format_duration("fast"), "fast");
    }

    #[test]
    fn creates_project_and_database_folders() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            project_dir: dir.path().join("scans"),
            database: dir.path().join("db/workflows.redb"),
            ..AppConfig::default()
        };
        initialize_folder(&config).unwrap();
        assert!(dir.path().join("scans").is_dir());
        assert!(dir.path().join("db").is_dir());
    }
}
