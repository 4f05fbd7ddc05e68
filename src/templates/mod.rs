pub mod educate4pt0;
pub mod schema;

pub use educate4pt0::Educate4pt0Template;
pub use schema::{
    csv_template, csv_template_file_name, ParameterDefinition, ParameterKind, ParameterSchema,
    SelectOption,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DEFAULT_TEMPLATE_ID: &str = "educate4pt0";

/// Bound and escaped parameter values handed to a template.
pub type Parameters = BTreeMap<String, String>;

/// A self-contained SVG document with fixed pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualDocument {
    pub width: u32,
    pub height: u32,
    pub markup: String,
}

/// 模板契約：只讀，由 registry 查詢，核心流程不會修改模板
pub trait CertificateTemplate: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> &ParameterSchema;

    /// Builds the visual document. Values in `params` are already escaped for
    /// markup and merged with schema defaults.
    fn render(&self, params: &Parameters) -> VisualDocument;
}

/// Read-only lookup of templates by id, with a fixed fallback template.
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<dyn CertificateTemplate>>,
    default: Arc<dyn CertificateTemplate>,
}

impl TemplateRegistry {
    pub fn new(default: Arc<dyn CertificateTemplate>) -> Self {
        let mut templates = HashMap::new();
        templates.insert(default.id().to_string(), default.clone());
        Self { templates, default }
    }

    /// Registry with every compiled-in template.
    pub fn builtin() -> Self {
        Self::new(Arc::new(Educate4pt0Template::new()))
    }

    pub fn register(mut self, template: Arc<dyn CertificateTemplate>) -> Self {
        self.templates.insert(template.id().to_string(), template);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn CertificateTemplate>> {
        self.templates.get(id)
    }

    /// Looks up `id`, falling back to the default template when unknown.
    pub fn resolve(&self, id: &str) -> Arc<dyn CertificateTemplate> {
        match self.templates.get(id) {
            Some(template) => template.clone(),
            None => {
                tracing::warn!(
                    "⚠️ Unknown template '{}', falling back to '{}'",
                    id,
                    self.default.id()
                );
                self.default.clone()
            }
        }
    }

    pub fn default_template(&self) -> &Arc<dyn CertificateTemplate> {
        &self.default
    }

    /// Templates sorted by id.
    pub fn list(&self) -> Vec<&Arc<dyn CertificateTemplate>> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank {
        schema: ParameterSchema,
    }

    impl CertificateTemplate for Blank {
        fn id(&self) -> &str {
            "blank"
        }
        fn display_name(&self) -> &str {
            "Blank"
        }
        fn description(&self) -> &str {
            "Empty page"
        }
        fn schema(&self) -> &ParameterSchema {
            &self.schema
        }
        fn render(&self, _params: &Parameters) -> VisualDocument {
            VisualDocument {
                width: 10,
                height: 10,
                markup: r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#
                    .to_string(),
            }
        }
    }

    #[test]
    fn unknown_id_resolves_to_default() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(registry.resolve("nope").id(), DEFAULT_TEMPLATE_ID);
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn registered_templates_are_listed_by_id() {
        let registry = TemplateRegistry::builtin().register(Arc::new(Blank {
            schema: ParameterSchema::new(vec![]),
        }));

        let ids: Vec<&str> = registry.list().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["blank", DEFAULT_TEMPLATE_ID]);
        assert_eq!(registry.resolve("blank").display_name(), "Blank");
        assert_eq!(registry.default_template().id(), DEFAULT_TEMPLATE_ID);
    }
}
