//! Plain-text rendering of resolved documents
//!
//! Output is the pretty-printed JSON, a blank line, then a short summary
//! picked by object type. NodeInfo documents (recognised by
//! `software.name` plus `version`) get their own summary. Rendering never
//! fails: anything that is not a JSON object comes back as raw text.

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;

use crate::data::{FieldAccess, Resolution};

const CONTENT_LIMIT: usize = 300;
const NAME_LIMIT: usize = 100;
const COLLECTION_PREVIEW: usize = 3;

static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</p\s*>|</li\s*>").expect("valid block break pattern")
});

/// Render a resolution outcome
pub fn render_resolution(resolution: &Resolution) -> String {
    render_bytes(resolution.raw())
}

/// Render a raw body, falling back to the text itself
pub fn render_bytes(raw: &[u8]) -> String {
    match serde_json::from_slice::<Value>(raw) {
        Ok(value) if value.is_object() => render(&value),
        _ => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Render a decoded document
pub fn render(value: &Value) -> String {
    let Ok(json) = serde_json::to_string_pretty(value) else {
        return value.to_string();
    };

    let summary = if is_nodeinfo(value) {
        nodeinfo_summary(value)
    } else {
        object_summary(value)
    };

    format!("{}\n\n{}", json, summary.join("\n"))
}

fn is_nodeinfo(value: &Value) -> bool {
    value.str_field("software.name").is_some() && value.str_field("version").is_some()
}

fn nodeinfo_summary(value: &Value) -> Vec<String> {
    let mut lines = vec!["Type: NodeInfo".to_string()];

    let software = value.str_field("software.name").unwrap_or_default();
    match value.str_field("software.version") {
        Some(version) => lines.push(format!("Software: {} {}", software, version)),
        None => lines.push(format!("Software: {}", software)),
    }
    if let Some(version) = value.str_field("version") {
        lines.push(format!("NodeInfo Version: {}", version));
    }
    if let Some(name) = value.str_field("metadata.nodeName") {
        lines.push(format!("Node Name: {}", name));
    }
    if let Some(protocols) = value.array_field("protocols") {
        let protocols: Vec<_> = protocols.iter().filter_map(Value::as_str).collect();
        if !protocols.is_empty() {
            lines.push(format!("Protocols: {}", protocols.join(", ")));
        }
    }
    if let Some(open) = value.bool_field("openRegistrations") {
        lines.push(format!(
            "Open Registrations: {}",
            if open { "yes" } else { "no" }
        ));
    }
    if let Some(total) = value.i64_field("usage.users.total") {
        lines.push(format!("Users: {}", total));
    }
    if let Some(active) = value.i64_field("usage.users.activeMonth") {
        lines.push(format!("Active Users (month): {}", active));
    }
    if let Some(active) = value.i64_field("usage.users.activeHalfyear") {
        lines.push(format!("Active Users (half year): {}", active));
    }
    if let Some(posts) = value.i64_field("usage.localPosts") {
        lines.push(format!("Local Posts: {}", posts));
    }

    lines
}

fn object_summary(value: &Value) -> Vec<String> {
    let object_type = value.str_field("type").unwrap_or_default();
    let mut lines = vec![format!("Type: {}", object_type), String::new()];

    if let Some(id) = value.str_field("id") {
        lines.push(format!("ID: {}", id));
    }

    match object_type {
        "Person" | "Application" | "Group" | "Organization" | "Service" => actor(value, &mut lines),
        "Note" | "Article" | "Page" | "Question" => content(value, &mut lines),
        "Create" | "Update" | "Delete" | "Follow" | "Add" | "Remove" | "Like" | "Block"
        | "Announce" => activity(value, &mut lines),
        "Collection" | "OrderedCollection" | "CollectionPage" | "OrderedCollectionPage" => {
            collection(value, &mut lines)
        }
        "Image" | "Audio" | "Video" | "Document" => media(value, &mut lines),
        "Event" => event(value, &mut lines),
        "Tombstone" => tombstone(value, &mut lines),
        _ => {}
    }

    lines
}

fn push_str(lines: &mut Vec<String>, value: &Value, path: &str, label: &str) {
    if let Some(text) = value.str_field(path) {
        lines.push(format!("{}: {}", label, text));
    }
}

fn push_date(lines: &mut Vec<String>, value: &Value, path: &str, label: &str) {
    if let Some(date) = value.str_field(path) {
        lines.push(format!("{}: {}", label, format_date(date)));
    }
}

fn actor(value: &Value, lines: &mut Vec<String>) {
    push_str(lines, value, "name", "Name");
    push_str(lines, value, "preferredUsername", "Username");
    push_str(lines, value, "url", "URL");
    if let Some(summary) = value.str_field("summary") {
        lines.push(format!("Summary: {}", strip_html(summary)));
    }
    push_date(lines, value, "published", "Published");
    push_str(lines, value, "followers", "Followers");
    push_str(lines, value, "following", "Following");
}

fn content(value: &Value, lines: &mut Vec<String>) {
    if let Some(name) = value.str_field("name") {
        lines.push(format!("Title: {}", name));
    }
    if let Some(text) = value.str_field("content") {
        lines.push(format!(
            "Content: {}",
            truncate(&strip_html(text), CONTENT_LIMIT)
        ));
    }
    attachments(value, "attachment", lines);
    push_date(lines, value, "published", "Published");
    push_date(lines, value, "updated", "Updated");
    if let Some(author) = value.link_field("attributedTo") {
        lines.push(format!("Author: {}", author));
    }
    push_audience(lines, value, "to", "To");
    push_audience(lines, value, "cc", "CC");
    push_str(lines, value, "inReplyTo", "In Reply To");
}

fn activity(value: &Value, lines: &mut Vec<String>) {
    if let Some(actor) = value.link_field("actor") {
        lines.push(format!("Actor: {}", actor));
    }

    if let Some(object) = value.str_field("object") {
        lines.push(format!("Object: {}", object));
    } else if value.is_object_field("object") {
        let object_type = value.str_field("object.type").unwrap_or_default();
        lines.push(format!("Object Type: {}", object_type));
        push_str(lines, value, "object.id", "Object ID");
        if let Some(text) = value.str_field("object.content") {
            lines.push(format!(
                "Content: {}",
                truncate(&strip_html(text), CONTENT_LIMIT)
            ));
        }
        attachments(value, "object.attachment", lines);
    }

    push_date(lines, value, "published", "Published");
    push_str(lines, value, "target", "Target");
}

fn collection(value: &Value, lines: &mut Vec<String>) {
    if let Some(total) = value.i64_field("totalItems").filter(|total| *total > 0) {
        lines.push(format!("Total Items: {}", total));
    }

    let items = value
        .array_field("items")
        .filter(|items| !items.is_empty())
        .or_else(|| value.array_field("orderedItems"));
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return;
    };

    lines.push("First Items:".to_string());
    for item in items.iter().take(COLLECTION_PREVIEW) {
        let text = match item {
            Value::String(s) => s.clone(),
            other => other
                .str_field("id")
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        lines.push(format!("  - {}", truncate(&text, NAME_LIMIT)));
    }
    if items.len() > COLLECTION_PREVIEW {
        lines.push(format!(
            "  ... and {} more items",
            items.len() - COLLECTION_PREVIEW
        ));
    }
}

fn media(value: &Value, lines: &mut Vec<String>) {
    push_str(lines, value, "name", "Name");
    push_str(lines, value, "url", "URL");
    push_str(lines, value, "duration", "Duration");
    push_date(lines, value, "published", "Published");
    if let Some(author) = value.link_field("attributedTo") {
        lines.push(format!("Author: {}", author));
    }
}

fn event(value: &Value, lines: &mut Vec<String>) {
    push_str(lines, value, "name", "Name");
    if let Some(text) = value.str_field("content") {
        lines.push(format!(
            "Description: {}",
            truncate(&strip_html(text), CONTENT_LIMIT)
        ));
    }
    push_date(lines, value, "startTime", "Start Time");
    push_date(lines, value, "endTime", "End Time");
    push_str(lines, value, "location", "Location");
    push_str(lines, value, "location.name", "Location");
}

fn tombstone(value: &Value, lines: &mut Vec<String>) {
    push_str(lines, value, "formerType", "Former Type");
    push_date(lines, value, "deleted", "Deleted");
}

fn attachments(value: &Value, path: &str, lines: &mut Vec<String>) {
    let Some(attachments) = value.array_field(path).filter(|a| !a.is_empty()) else {
        return;
    };

    lines.push("Attachments:".to_string());
    for (index, attachment) in attachments.iter().enumerate() {
        let mut entry = format!(
            "  {}. {}",
            index + 1,
            attachment.str_field("type").unwrap_or_default()
        );
        if let Some(media_type) = attachment.str_field("mediaType") {
            entry.push_str(&format!(" ({})", media_type));
        }
        if let Some(name) = attachment.str_field("name") {
            entry.push_str(&format!(": {}", truncate(name, NAME_LIMIT)));
        }
        lines.push(entry);

        if let Some(url) = attachment.link_field("url") {
            lines.push(format!("     URL: {}", url));
        }
    }
}

fn push_audience(lines: &mut Vec<String>, value: &Value, path: &str, label: &str) {
    let recipients: Vec<&str> = match value.field(path) {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    match recipients.as_slice() {
        [] => {}
        [single] => lines.push(format!("{}: {}", label, single)),
        many => lines.push(format!("{}: [\n    {}\n  ]", label, many.join(",\n    "))),
    }
}

/// `2024-03-01T12:00:00Z` -> `Mar 01, 2024 12:00:00`; unparseable dates
/// are shown as given
fn format_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|parsed| parsed.format("%b %d, %Y %H:%M:%S").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Strip tags, decode entities and collapse whitespace
fn strip_html(html: &str) -> String {
    let spaced = BLOCK_BREAK.replace_all(html, " ");
    let text = ammonia::Builder::empty().clean(&spaced).to_string();
    let decoded = html_escape::decode_html_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit - 3).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_part(output: &str) -> Value {
        let (json, _) = output.split_once("\n\n").expect("json and summary");
        serde_json::from_str(json).expect("json portion decodes")
    }

    #[test]
    fn json_portion_round_trips() {
        let note = json!({
            "@context": ["https://www.w3.org/ns/activitystreams", { "sensitive": "as:sensitive" }],
            "id": "https://a.example/notes/1",
            "type": "Note",
            "content": "<p>multi\nline</p>",
            "unknownField": { "nested": [1, 2.5, null, true] },
        });

        let output = render(&note);
        assert_eq!(json_part(&output), note);
    }

    #[test]
    fn note_summary_strips_html() {
        let note = json!({
            "id": "https://a.example/notes/1",
            "type": "Note",
            "content": "<p>Hello &amp; welcome</p><p>to the <a href=\"https://a.example\">fediverse</a></p>",
            "attributedTo": "https://a.example/users/bob",
            "published": "2024-03-01T12:00:00Z",
            "to": ["https://www.w3.org/ns/activitystreams#Public"],
        });

        let output = render(&note);
        assert!(output.contains("Type: Note"));
        assert!(output.contains("Content: Hello & welcome to the fediverse"));
        assert!(output.contains("Author: https://a.example/users/bob"));
        assert!(output.contains("Published: Mar 01, 2024 12:00:00"));
        assert!(output.contains("To: https://www.w3.org/ns/activitystreams#Public"));
    }

    #[test]
    fn nodeinfo_is_recognised() {
        let nodeinfo = json!({
            "version": "2.1",
            "software": { "name": "mastodon", "version": "4.2.0" },
            "protocols": ["activitypub"],
            "openRegistrations": true,
            "usage": { "users": { "total": 10, "activeMonth": 3 }, "localPosts": 99 },
        });

        let output = render(&nodeinfo);
        assert!(output.contains("Type: NodeInfo"));
        assert!(output.contains("Software: mastodon 4.2.0"));
        assert!(output.contains("Open Registrations: yes"));
        assert!(output.contains("Local Posts: 99"));
        assert_eq!(json_part(&output), nodeinfo);
    }

    #[test]
    fn non_json_is_returned_unchanged() {
        assert_eq!(render_bytes(b"<html>nope</html>"), "<html>nope</html>");
        assert_eq!(render_bytes(b"[1,2,3]"), "[1,2,3]");
    }

    #[test]
    fn collection_preview_is_limited() {
        let collection = json!({
            "type": "OrderedCollection",
            "totalItems": 5,
            "orderedItems": ["a", "b", "c", "d", "e"],
        });

        let output = render(&collection);
        assert!(output.contains("  - c"));
        assert!(!output.contains("  - d"));
        assert!(output.contains("... and 2 more items"));
    }

    #[test]
    fn truncate_counts_characters() {
        let text = "é".repeat(400);
        let truncated = truncate(&text, CONTENT_LIMIT);
        assert_eq!(truncated.chars().count(), CONTENT_LIMIT);
        assert!(truncated.ends_with("..."));
    }
}
