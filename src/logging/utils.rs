//! Log file location, message cleaning and timestamps.
use std::path::PathBuf;

use crate::exec::redact_args;

/// Mask password arguments in a logged message, the way command lines are
/// masked in [`redact_args`]. Spacing and line breaks are kept.
pub(super) fn redact(msg: &str) -> String {
    if !msg.contains("password") {
        return msg.to_string();
    }
    msg.split('\n')
        .map(redact_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn redact_line(line: &str) -> String {
    let mut mask_next = false;
    line.split(' ')
        .map(|token| {
            if token.is_empty() {
                return String::new();
            }
            if std::mem::take(&mut mask_next) {
                return "******".to_string();
            }
            mask_next = token.starts_with("--") && token.ends_with("password");
            redact_args(&[token]).concat()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove terminal escape sequences so the log file holds plain text.
///
/// CSI sequences (`ESC [` ... final byte in `@`..=`~`) are dropped whole;
/// any other escape drops only the byte that follows `ESC`.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            chars.by_ref().find(|c| ('@'..='~').contains(c));
        }
    }
    out
}

/// `$XDG_CACHE_HOME/bench-setup`, else `~/.cache/bench-setup`, created on
/// first use.
pub(super) fn log_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))?;
    let dir = base.join("bench-setup");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Log file of one subcommand, e.g. `menu.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    log_dir().map(|dir| dir.join(format!("{command}.log")))
}

/// Current UTC time, `HH:MM:SS`, or with the date prepended.
pub(super) fn timestamp(with_date: bool) -> String {
    let format = if with_date {
        "%Y-%m-%d %H:%M:%S"
    } else {
        "%H:%M:%S"
    };
    chrono::Utc::now().format(format).to_string()
}
