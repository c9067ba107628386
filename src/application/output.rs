use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::zk::Stat;

pub fn presence_line(present: bool) -> &'static str {
    if present { "y\n" } else { "n\n" }
}

/// Renders node metadata as `Label:` / value pairs with the values aligned.
pub fn stat_block(stat: &Stat) -> String {
    let rows = [
        ("Czxid", stat.czxid.to_string()),
        ("Mzxid", stat.mzxid.to_string()),
        ("Ctime", format_millis(stat.ctime)),
        ("Mtime", format_millis(stat.mtime)),
        ("Version", stat.version.to_string()),
        ("Cversion", stat.cversion.to_string()),
        ("Aversion", stat.aversion.to_string()),
        ("EphemeralOwner", stat.ephemeral_owner.to_string()),
        ("DataLength", stat.data_length.to_string()),
        ("Pzxid", stat.pzxid.to_string()),
    ];

    rows.iter()
        .map(|(label, value)| format!("{:<16}{}\n", format!("{label}:"), value))
        .collect()
}

/// One name per line, sorted.
pub fn children_lines(mut children: Vec<String>) -> String {
    children.sort();
    children.iter().map(|name| format!("{name}\n")).collect()
}

/// RFC 3339 in UTC, or the raw number when it is out of range.
fn format_millis(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|timestamp| timestamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}
