//! Rendering for `--output`: tables for people, serde formats for scripts.
//!
//! `plain` prints one key per line so results pipe into `xargs` and friends.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color ────────────────────────────────────────────────────────────

/// Whether ANSI color goes to stdout. `auto` honours `NO_COLOR`.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal(),
    }
}

/// Paint a vehicle state label: green when online, yellow when dozing.
pub fn paint_state(label: &str, color: bool) -> String {
    if !color {
        return label.to_owned();
    }
    match label {
        "online" => label.green().to_string(),
        "asleep" | "suspended" => label.yellow().to_string(),
        "offline" => label.red().to_string(),
        _ => label.dimmed().to_string(),
    }
}

/// Paint a connection indicator.
pub fn paint_connected(connected: bool, color: bool) -> String {
    let label = if connected { "connected" } else { "disconnected" };
    match (connected, color) {
        (_, false) => label.to_owned(),
        (true, true) => label.green().to_string(),
        (false, true) => label.red().to_string(),
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Render a collection. `to_row` feeds the table view, `key` the plain view;
/// json and yaml serialize `items` as-is.
pub fn render_list<T, R>(
    format: &OutputFormat,
    items: &[T],
    to_row: impl Fn(&T) -> R,
    key: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = items.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => items.iter().map(key).collect::<Vec<_>>().join("\n"),
        structured => serialize(structured, items),
    }
}

/// Render one value. Tables have no single-row form, so `detail` supplies
/// the human-readable text.
pub fn render_single<T: Serialize>(
    format: &OutputFormat,
    item: &T,
    detail: impl Fn(&T) -> String,
    key: impl Fn(&T) -> String,
) -> String {
    match format {
        OutputFormat::Table => detail(item),
        OutputFormat::Plain => key(item),
        structured => serialize(structured, item),
    }
}

/// Write to stdout unless `--quiet` or there is nothing to show.
pub fn print_output(rendered: &str, quiet: bool) {
    if quiet || rendered.is_empty() {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{rendered}");
}

fn serialize<T: Serialize + ?Sized>(format: &OutputFormat, value: &T) -> String {
    let result = match format {
        OutputFormat::JsonCompact => serde_json::to_string(value).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
    };
    result.unwrap_or_else(|e| format!("serialization failed: {e}"))
}
