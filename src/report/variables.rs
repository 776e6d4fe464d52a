//! Report variable templates
//!
//! Fixtures declare report variables as templates; placeholders are filled
//! from the unit identity and the run:
//!
//! - `{serial_number}`, `{part_number}`, `{revision}`, `{batch_number}`
//! - `{date}`: today as `dd.mm.YYYY`
//! - `{step:<name>}`: measured value of a step, empty if it did not run

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::{SequenceResult, UnitIdentity};

/// Fill every template in `templates`
pub fn render_all(
    templates: &[(String, String)],
    identity: &UnitIdentity,
    result: &SequenceResult,
    now: DateTime<Utc>,
) -> BTreeMap<String, String> {
    templates
        .iter()
        .map(|(key, template)| (key.clone(), render(template, identity, result, now)))
        .collect()
}

/// Fill one template; unknown placeholders are left as written
pub fn render(
    template: &str,
    identity: &UnitIdentity,
    result: &SequenceResult,
    now: DateTime<Utc>,
) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match lookup(key, identity, result, now) {
                    Some(value) => output.push_str(&value),
                    None => {
                        output.push('{');
                        output.push_str(key);
                        output.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}

fn lookup(
    key: &str,
    identity: &UnitIdentity,
    result: &SequenceResult,
    now: DateTime<Utc>,
) -> Option<String> {
    if let Some(step) = key.strip_prefix("step:") {
        return Some(
            result
                .record(step)
                .and_then(|r| r.outcome.measured_value.as_ref())
                .map(|v| v.to_string())
                .unwrap_or_default(),
        );
    }

    match key {
        "serial_number" => Some(identity.serial_number.clone()),
        "part_number" => Some(identity.part_number.clone()),
        "revision" => Some(identity.revision.clone()),
        "batch_number" => Some(identity.batch_number.clone().unwrap_or_default()),
        "date" => Some(now.format("%d.%m.%Y").to_string()),
        _ => None,
    }
}
