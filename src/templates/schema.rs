use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Text,
    Date,
    Email,
    Number,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// 模板接受的單一欄位定義
#[derive(Debug, Clone, Serialize)]
pub struct ParameterDefinition {
    pub key: String,
    pub label: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub default_value: Option<String>,
    pub placeholder: Option<String>,
    /// Validation hint, checked as a regex anchored to the whole value.
    pub pattern: Option<String>,
    pub options: Vec<SelectOption>,
    pub help_text: Option<String>,
}

impl ParameterDefinition {
    pub fn new(key: &str, label: &str, kind: ParameterKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            default_value: None,
            placeholder: None,
            pattern: None,
            options: Vec::new(),
            help_text: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn placeholder(mut self, value: &str) -> Self {
        self.placeholder = Some(value.to_string());
        self
    }

    pub fn pattern(mut self, value: &str) -> Self {
        self.pattern = Some(value.to_string());
        self
    }

    pub fn option(mut self, value: &str, label: &str) -> Self {
        self.options.push(SelectOption {
            value: value.to_string(),
            label: label.to_string(),
        });
        self
    }

    pub fn help_text(mut self, value: &str) -> Self {
        self.help_text = Some(value.to_string());
        self
    }
}

/// Ordered field definitions accepted by a template.
///
/// `identity_key` names the column used as a recipient's display name.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSchema {
    pub definitions: Vec<ParameterDefinition>,
    pub identity_key: Option<String>,
}

impl ParameterSchema {
    pub fn new(definitions: Vec<ParameterDefinition>) -> Self {
        Self {
            definitions,
            identity_key: None,
        }
    }

    pub fn with_identity(mut self, key: &str) -> Self {
        self.identity_key = Some(key.to_string());
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.key.as_str())
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .filter(|d| d.required)
            .map(|d| d.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&ParameterDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }
}

/// Two-line CSV skeleton for operators: keys, then an example row.
///
/// The example row uses each field's placeholder, else its default, else an
/// empty cell. Cells are joined verbatim without quoting.
pub fn csv_template(schema: &ParameterSchema) -> String {
    let header = schema.keys().collect::<Vec<_>>().join(",");
    let example = schema
        .definitions
        .iter()
        .map(|d| {
            d.placeholder
                .as_deref()
                .or(d.default_value.as_deref())
                .unwrap_or("")
        })
        .collect::<Vec<_>>()
        .join(",");

    format!("{}\n{}", header, example)
}

pub fn csv_template_file_name(template_id: &str) -> String {
    format!("certificate-template-{}.csv", template_id)
}
