// src/logger.rs
// Console output of the frontdoor binary: level badges, access lines and the listening banner

use chrono::Local;
use colored::{ColoredString, Colorize};
use std::sync::OnceLock;

use crate::network::ServerAddresses;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Http,
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Http => "HTTP",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn badge(self) -> ColoredString {
        let text = format!(" {} ", self.label());
        let badge = match self {
            Level::Http => text.as_str().on_blue().white(),
            Level::Info => text.as_str().on_magenta().white(),
            Level::Warn => text.as_str().on_yellow().black(),
            Level::Error => text.as_str().on_red().white(),
        };
        badge.bold()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Logger {
    requests: bool,
    timestamps: bool,
}

impl Logger {
    pub const fn new(requests: bool, timestamps: bool) -> Self {
        Self {
            requests,
            timestamps,
        }
    }

    /// Whether `AccessLog` should bother timing requests at all.
    pub fn logs_requests(&self) -> bool {
        self.requests
    }

    fn line(&self, level: Level, message: &str) -> String {
        if self.timestamps {
            let now = Local::now().format("%H:%M:%S%.3f").to_string();
            format!("{} {} {}", now.dimmed(), level.badge(), message)
        } else {
            format!("{} {}", level.badge(), message)
        }
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.line(Level::Info, message));
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{}", self.line(Level::Warn, message));
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(Level::Error, message));
    }

    pub fn request(&self, ip: &str, method: &str, target: &str, status: u16, elapsed_ms: u128) {
        if self.requests {
            let entry = access_line(ip, method, target, status, elapsed_ms);
            println!("{}", self.line(Level::Http, &entry));
        }
    }

    pub fn starting(&self, name: &str, version: &str) {
        self.info(&format!("{} {}", name.bold(), version));
    }

    /// A framed banner when stdout is a terminal, plain lines when piped.
    pub fn listening(&self, signature: &str, addresses: &ServerAddresses) {
        let mut rows = vec![format!("{} is up", signature), String::new()];
        rows.push(format!("Local:   {}", addresses.local));
        if let Some(ref network) = addresses.network {
            rows.push(format!("Network: {}", network));
        }

        if atty::is(atty::Stream::Stdout) {
            for line in frame(&rows) {
                println!("{}", line.bright_cyan());
            }
            println!();
        } else {
            for row in rows.iter().filter(|row| !row.is_empty()) {
                self.info(row);
            }
        }
    }

    pub fn stop_requested(&self) {
        self.info("Stopping; open connections are dropped. Signal again to exit now.");
    }

    pub fn forced_exit(&self) {
        self.warn("Second signal received, exiting.");
    }

    pub fn closed(&self) {
        self.info("Listener closed.");
    }
}

fn access_line(ip: &str, method: &str, target: &str, status: u16, elapsed_ms: u128) -> String {
    let code = status.to_string();
    let code = match status {
        500.. => code.red(),
        400..=499 => code.yellow(),
        300..=399 => code.cyan(),
        _ => code.green(),
    };
    format!("{} {} {} {} {}ms", ip.dimmed(), method.bold(), target, code, elapsed_ms)
}

/// Centres plain rows inside a box-drawing frame two columns wider than the widest row.
fn frame(rows: &[String]) -> Vec<String> {
    let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0) + 4;
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("┌{}┐", "─".repeat(width)));
    for row in rows {
        let len = row.chars().count();
        let left = (width - len) / 2;
        lines.push(format!("│{}{}{}│", " ".repeat(left), row, " ".repeat(width - len - left)));
    }
    lines.push(format!("└{}┘", "─".repeat(width)));
    lines
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// First call wins; later calls are ignored.
pub fn init_logger(requests: bool, timestamps: bool) {
    let _ = LOGGER.set(Logger::new(requests, timestamps));
}

pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(true, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_logging_switch() {
        assert!(Logger::new(true, false).logs_requests());
        assert!(!Logger::new(false, true).logs_requests());
    }

    #[test]
    fn test_badges_carry_level_label() {
        for level in [Level::Http, Level::Info, Level::Warn, Level::Error] {
            assert!(level.badge().to_string().contains(level.label()));
        }
    }

    #[test]
    fn test_line_without_timestamp_starts_with_badge() {
        let line = Logger::new(true, false).line(Level::Warn, "careful");
        assert!(line.starts_with(&Level::Warn.badge().to_string()));
        assert!(line.ends_with(" careful"));
    }

    #[test]
    fn test_access_line_fields() {
        let entry = access_line("10.0.0.7", "GET", "/docs/?x=1", 301, 12);
        assert!(entry.contains("10.0.0.7"));
        assert!(entry.contains("/docs/?x=1"));
        assert!(entry.contains("301"));
        assert!(entry.ends_with("12ms"));
    }

    #[test]
    fn test_frame_rows_share_one_width() {
        let rows = vec![
            "frontdoor/0.1.0 is up".to_string(),
            String::new(),
            "Local:   http://localhost:4321".to_string(),
        ];
        let lines = frame(&rows);
        assert_eq!(lines.len(), rows.len() + 2);
        assert!(lines[0].starts_with('┌'));
        assert!(lines[lines.len() - 1].starts_with('└'));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
        assert!(lines[3].contains("http://localhost:4321"));
    }

    #[test]
    fn test_get_logger_without_init() {
        let _ = get_logger().logs_requests();
    }
}
