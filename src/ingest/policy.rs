//! Policy records parsed from chunk summaries

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RagError, Result};
use crate::storage;

const GROUP_NAME_MAX_CHARS: usize = 20;

/// One climate policy extracted from a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub policy_id: String,
    pub policy: String,
    pub effect: String,
    pub country: String,
    pub year: String,
}

impl PolicyRecord {
    /// Parse a summary laid out as `Policy: / Effect: / Country: / Year:`.
    ///
    /// Each field is the text between its label and the next one, with
    /// newlines removed and trimmed. `/` is stripped from the country.
    pub fn from_summary(policy_id: impl Into<String>, summary: &str) -> Self {
        let after_policy = after_last(summary, "Policy:");
        let after_effect = after_last(after_policy, "Effect:");
        let after_country = after_last(after_effect, "Country:");

        Self {
            policy_id: policy_id.into(),
            policy: clean(before_first(after_policy, "Effect:")),
            effect: clean(before_first(after_effect, "Country:")),
            country: clean(before_first(after_country, "Year:")).replace('/', ""),
            year: clean(after_last(after_country, "Year:")),
        }
    }

    /// Append to the JSON array in `path`. A missing, unreadable or
    /// non-array file is replaced by a fresh array.
    pub fn append_to_file(&self, path: &Path) -> Result<()> {
        let mut records = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Array(items)) => items,
                _ => {
                    tracing::warn!(path = %path.display(), "not a JSON array, starting fresh");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        records.push(serde_json::to_value(self)?);
        storage::save_json(&records, path)
    }
}

fn after_last<'a>(text: &'a str, label: &str) -> &'a str {
    text.rsplit_once(label).map(|(_, rest)| rest).unwrap_or(text)
}

fn before_first<'a>(text: &'a str, label: &str) -> &'a str {
    text.split_once(label).map(|(head, _)| head).unwrap_or(text)
}

fn clean(field: &str) -> String {
    field.replace('\n', "").trim().to_string()
}

/// Split the records in `input` into one JSON file per value of
/// `attribute`, written to `output_dir/<value>.json`.
///
/// File names have `/` removed and are cut to 20 characters; values that
/// share a cut name land in the same file. Records without the attribute
/// are skipped.
pub fn group_by(attribute: &str, input: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let records: Vec<Value> = storage::load_json(input)?
        .ok_or_else(|| RagError::Generic(format!("No policy file at {}", input.display())))?;
    fs::create_dir_all(output_dir)?;

    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut skipped = 0;
    for record in records {
        let value = match record.get(attribute) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };
        let name: String = value.replace('/', "").chars().take(GROUP_NAME_MAX_CHARS).collect();
        groups.entry(name).or_default().push(record);
    }

    let mut written = Vec::with_capacity(groups.len());
    for (name, items) in &groups {
        let path = output_dir.join(format!("{}.json", name));
        storage::save_json(items, &path)?;
        written.push(path);
    }

    tracing::info!(
        attribute,
        groups = written.len(),
        skipped,
        dir = %output_dir.display(),
        "grouped records"
    );
    Ok(written)
}
