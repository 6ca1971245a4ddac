// ── Tree path helpers ──
//
// Every path the bridge touches is built here so the layout
// (`cars.<vin>.{info,status,commands,settings}.*`) lives in one place.

/// Health flag node.
pub const CONNECTION: &str = "info.connection";

const SEPARATOR: char = '.';

/// Characters that cannot appear inside a single path segment.
const FORBIDDEN: &[char] = &['.', '*', '?', '"', '\'', '[', ']', '`', ','];

/// Sanitize one segment taken from an upstream key.
///
/// Separators and forbidden characters become `_` so an upstream key can
/// never create extra hierarchy levels.
pub fn segment(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || FORBIDDEN.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Validate a full path: non-empty segments, no forbidden characters.
pub fn validate(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path is empty".into());
    }
    for seg in path.split(SEPARATOR) {
        if seg.is_empty() {
            return Err("path contains an empty segment".into());
        }
        if let Some(c) = seg
            .chars()
            .find(|c| c.is_whitespace() || (*c != SEPARATOR && FORBIDDEN.contains(c)))
        {
            return Err(format!("segment '{seg}' contains forbidden character {c:?}"));
        }
    }
    Ok(())
}

pub fn vehicle(vin: &str) -> String {
    format!("cars.{}", segment(vin))
}

pub fn info(vin: &str, field: &str) -> String {
    format!("{}.info.{field}", vehicle(vin))
}

pub fn car_id(vin: &str) -> String {
    info(vin, "car_id")
}

/// `rel` is an already-sanitized, dot-joined path below `status`.
pub fn status(vin: &str, rel: &str) -> String {
    format!("{}.status.{rel}", vehicle(vin))
}

pub fn command(vin: &str, name: &str) -> String {
    format!("{}.commands.{name}", vehicle(vin))
}

pub fn setting(vin: &str, name: &str) -> String {
    format!("{}.settings.{name}", vehicle(vin))
}

/// A user-writable node addressed by a tree path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlTarget {
    Command { vin: String, command: String },
    Setting { vin: String, setting: String },
}

/// Recognise `cars.<vin>.commands.<name>` and `cars.<vin>.settings.<name>`.
pub fn parse_control(path: &str) -> Option<ControlTarget> {
    let mut parts = path.split(SEPARATOR);
    let (Some("cars"), Some(vin), Some(kind), Some(name), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return None;
    };

    match kind {
        "commands" => Some(ControlTarget::Command {
            vin: vin.to_owned(),
            command: name.to_owned(),
        }),
        "settings" => Some(ControlTarget::Setting {
            vin: vin.to_owned(),
            setting: name.to_owned(),
        }),
        _ => None,
    }
}
