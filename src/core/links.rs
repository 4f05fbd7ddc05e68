use crate::domain::model::BoundRecord;
use crate::templates::{ParameterSchema, Parameters};
use crate::utils::error::{CertError, Result};
use url::Url;

/// Shareable link to the certificate page for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateLink {
    pub id: usize,
    pub display_name: String,
    pub url: Url,
}

fn page_url(base_url: &str, template_id: &str) -> Result<Url> {
    let invalid = |reason: String| CertError::InvalidConfigValueError {
        field: "links.base_url".to_string(),
        value: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push("certificate");
    url.set_query(None);
    url.query_pairs_mut().append_pair("template", template_id);
    Ok(url)
}

/// 單張證書的連結：依 schema 順序，空值以預設值補上
pub fn form_link(
    base_url: &str,
    template_id: &str,
    schema: &ParameterSchema,
    params: &Parameters,
) -> Result<Url> {
    let mut url = page_url(base_url, template_id)?;
    {
        let mut query = url.query_pairs_mut();
        for def in &schema.definitions {
            let value = params
                .get(&def.key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .or(def.default_value.as_deref())
                .unwrap_or("");
            if !value.is_empty() {
                query.append_pair(&def.key, value);
            }
        }
    }
    Ok(url)
}

/// One link per bound record, carrying only the values present in the row.
pub fn record_links(
    base_url: &str,
    template_id: &str,
    records: &[BoundRecord],
) -> Result<Vec<CertificateLink>> {
    records
        .iter()
        .map(|record| {
            let mut url = page_url(base_url, template_id)?;
            url.query_pairs_mut().extend_pairs(record.parameters.iter());
            Ok(CertificateLink {
                id: record.id,
                display_name: record.display_name.clone(),
                url,
            })
        })
        .collect()
}
