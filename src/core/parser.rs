use crate::domain::model::BoundRecord;
use crate::templates::{ParameterKind, ParameterSchema};
use crate::utils::error::ParseError;
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use std::collections::BTreeMap;

/// One data row keyed by header column, values trimmed.
type RecordRow = BTreeMap<String, String>;

/// 將 CSV 文字解析為綁定記錄
///
/// The first row is the header. Missing required *columns* reject the whole
/// batch; missing *values* are kept blank and only produce warnings.
pub fn parse(raw_text: &str, schema: &ParameterSchema) -> Result<Vec<BoundRecord>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw_text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ParseError::Malformed(e.to_string()))?;
        rows.push(record);
    }

    let mut rows = rows.into_iter();
    let header = rows
        .by_ref()
        .find(|r| !is_blank_line(r))
        .ok_or(ParseError::Empty)?;
    // 空白列仍佔一個編號，只有結尾的空白列被丟棄
    let mut data: Vec<StringRecord> = rows.collect();
    while data.last().is_some_and(is_blank_line) {
        data.pop();
    }
    if data.is_empty() {
        return Err(ParseError::Empty);
    }

    let columns: Vec<String> = header.iter().map(str::to_string).collect();
    let missing: Vec<String> = schema
        .required_keys()
        .filter(|key| !columns.iter().any(|c| c == key))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        tracing::warn!("❌ CSV header is missing required columns: {}", missing.join(", "));
        return Err(ParseError::MissingColumns(missing));
    }

    let checks = FieldChecks::compile(schema);
    let mut records = Vec::with_capacity(data.len());

    for (index, record) in data.iter().enumerate() {
        let id = index + 1;

        let row: RecordRow = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();

        if row.values().all(|v| v.is_empty()) {
            tracing::debug!("Skipping blank row {}", id);
            continue;
        }

        let display_name = schema
            .identity_key
            .as_deref()
            .and_then(|key| row.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Record {}", id));

        let warnings = checks.check(&row, schema);
        for warning in &warnings {
            tracing::warn!("⚠️ Row {} ({}): {}", id, display_name, warning);
        }

        let parameters = row.into_iter().filter(|(_, v)| !v.is_empty()).collect();

        tracing::debug!("Bound row {} as '{}'", id, display_name);
        records.push(BoundRecord {
            id,
            display_name,
            parameters,
            warnings,
        });
    }

    tracing::info!(
        "📋 Parsed {} records from {} data rows",
        records.len(),
        data.len()
    );
    Ok(records)
}

fn is_blank_line(record: &StringRecord) -> bool {
    record.len() <= 1 && record.get(0).map_or(true, str::is_empty)
}

/// Compiled validation hints for one schema.
struct FieldChecks {
    patterns: BTreeMap<String, Regex>,
}

impl FieldChecks {
    fn compile(schema: &ParameterSchema) -> Self {
        let mut patterns = BTreeMap::new();
        for def in &schema.definitions {
            let Some(pattern) = &def.pattern else {
                continue;
            };
            match Regex::new(&format!("^(?:{})$", pattern)) {
                Ok(re) => {
                    patterns.insert(def.key.clone(), re);
                }
                Err(e) => {
                    tracing::warn!("Ignoring invalid pattern for '{}': {}", def.key, e);
                }
            }
        }
        Self { patterns }
    }

    fn check(&self, row: &RecordRow, schema: &ParameterSchema) -> Vec<String> {
        let mut warnings = Vec::new();

        for def in &schema.definitions {
            let value = row.get(&def.key).map(String::as_str).unwrap_or("");

            if value.is_empty() {
                if def.required {
                    match &def.default_value {
                        Some(default) => warnings.push(format!(
                            "required field '{}' is blank, default '{}' will be used",
                            def.key, default
                        )),
                        None => warnings.push(format!("required field '{}' is blank", def.key)),
                    }
                }
                continue;
            }

            if let Some(re) = self.patterns.get(&def.key) {
                if !re.is_match(value) {
                    warnings.push(format!(
                        "field '{}' value '{}' does not match the expected format",
                        def.key, value
                    ));
                }
            }

            if def.kind == ParameterKind::Select
                && !def.options.is_empty()
                && !def.options.iter().any(|o| o.value == value)
            {
                warnings.push(format!(
                    "field '{}' value '{}' is not one of the allowed options",
                    def.key, value
                ));
            }
        }

        warnings
    }
}
