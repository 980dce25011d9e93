use colored::Colorize;
use ebkit::Outcome;
use serde_json::Value;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim hint on stderr
pub fn hint(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Outcome Rendering
// ============================================================================

/// Fields worth showing for a resource, in display order
const SUMMARY_FIELDS: [&str; 9] = [
    "ApplicationName",
    "EnvironmentName",
    "TemplateName",
    "VersionLabel",
    "label",
    "Status",
    "Health",
    "CNAME",
    "Description",
];

/// One-line summary of a resource
pub fn resource_line(resource: &Value) -> String {
    SUMMARY_FIELDS
        .iter()
        .filter_map(|key| resource.get(key).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Print an outcome for humans
pub fn outcome(outcome: &Outcome, check: bool) {
    let fallback = match (outcome.changed, check) {
        (true, true) => "Changes pending",
        (true, false) => "Changed",
        (false, _) => "No changes",
    };
    let message = outcome.output.as_deref().unwrap_or(fallback);
    match (outcome.changed, check) {
        (true, true) => warn(message),
        (true, false) => success(message),
        (false, _) => info(message),
    }

    for change in &outcome.updates {
        kv(&change.key, &format!("{} → {}", change.old.dimmed(), change.new));
    }

    if let Some(resource) = &outcome.resource {
        for key in SUMMARY_FIELDS {
            if let Some(value) = resource.get(key).and_then(Value::as_str) {
                kv(key, value);
            }
        }
    }

    if let Some(resources) = &outcome.resources {
        header(&format!("{} resource(s)", resources.len()));
        for resource in resources {
            dim(&resource_line(resource));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
