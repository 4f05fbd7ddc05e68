use super::{CertificateTemplate, Parameters, VisualDocument};
use super::schema::{ParameterDefinition, ParameterKind, ParameterSchema};

// A4 橫向，96 DPI
const PAGE_WIDTH: u32 = 1123;
const PAGE_HEIGHT: u32 = 794;

const NAVY: &str = "#1b2a4a";
const GOLD: &str = "#c9a227";
const INK: &str = "#333333";

/// Generic course completion certificate with Educate 4.0 branding.
pub struct Educate4pt0Template {
    schema: ParameterSchema,
}

impl Educate4pt0Template {
    pub fn new() -> Self {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();

        let schema = ParameterSchema::new(vec![
            ParameterDefinition::new("achieverName", "Student/Achiever Name", ParameterKind::Text)
                .required()
                .placeholder("e.g., John Doe")
                .help_text("Full name of the person receiving the certificate"),
            ParameterDefinition::new("courseName", "Course/Workshop Name", ParameterKind::Text)
                .required()
                .placeholder("e.g., Introduction to Scratch Programming")
                .help_text("Name of the completed course or workshop"),
            ParameterDefinition::new("completionDate", "Completion Date", ParameterKind::Date)
                .required()
                .default_value(today)
                .pattern(r"\d{4}-\d{2}-\d{2}")
                .help_text("Date when the course was completed"),
            ParameterDefinition::new("certifierName", "Instructor/Certifier Name", ParameterKind::Text)
                .required()
                .placeholder("e.g., Ms. Smith")
                .help_text("Name of the person certifying completion"),
            ParameterDefinition::new("certifierTitle", "Certifier Title", ParameterKind::Text)
                .default_value("Instructor")
                .placeholder("e.g., STEAM Coordinator")
                .help_text("Title or role of the certifier (optional)"),
            ParameterDefinition::new("organizationName", "Organization Name", ParameterKind::Text)
                .default_value("Educate 4.0")
                .placeholder("e.g., Springfield Middle School")
                .help_text("Name of the certifying organization (optional)"),
        ])
        .with_identity("achieverName");

        Self { schema }
    }
}

impl Default for Educate4pt0Template {
    fn default() -> Self {
        Self::new()
    }
}

fn value<'a>(params: &'a Parameters, key: &str, fallback: &'a str) -> &'a str {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
}

impl CertificateTemplate for Educate4pt0Template {
    fn id(&self) -> &str {
        "educate4pt0"
    }

    fn display_name(&self) -> &str {
        "Educate 4.0 Certificate"
    }

    fn description(&self) -> &str {
        "Generic course completion certificate with Educate 4.0 branding"
    }

    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn render(&self, params: &Parameters) -> VisualDocument {
        let achiever = value(params, "achieverName", "");
        let course = value(params, "courseName", "");
        let date = value(params, "completionDate", "");
        let certifier = value(params, "certifierName", "");
        let title = value(params, "certifierTitle", "Instructor");
        let organization = value(params, "organizationName", "Educate 4.0");

        let w = PAGE_WIDTH;
        let h = PAGE_HEIGHT;
        let cx = w / 2;

        let markup = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <rect x="0" y="0" width="{w}" height="{h}" fill="#fdfbf5"/>
  <rect x="24" y="24" width="{outer_w}" height="{outer_h}" fill="none" stroke="{navy}" stroke-width="8"/>
  <rect x="44" y="44" width="{inner_w}" height="{inner_h}" fill="none" stroke="{gold}" stroke-width="3"/>
  <g transform="translate({cx} 120)">
    <circle r="38" fill="{navy}"/>
    <circle r="31" fill="none" stroke="{gold}" stroke-width="3"/>
    <text y="9" text-anchor="middle" font-family="sans-serif" font-size="26" font-weight="bold" fill="#ffffff">4.0</text>
  </g>
  <text x="{cx}" y="222" text-anchor="middle" font-family="serif" font-size="52" font-weight="bold" fill="{navy}">Certificate of Completion</text>
  <rect x="{line_x}" y="242" width="240" height="3" fill="{gold}"/>
  <text x="{cx}" y="300" text-anchor="middle" font-family="sans-serif" font-size="20" fill="{ink}">This certificate is proudly presented to</text>
  <text x="{cx}" y="372" text-anchor="middle" font-family="serif" font-size="48" font-style="italic" fill="{navy}">{achiever}</text>
  <text x="{cx}" y="424" text-anchor="middle" font-family="sans-serif" font-size="20" fill="{ink}">For successfully completing the course</text>
  <text x="{cx}" y="476" text-anchor="middle" font-family="serif" font-size="32" font-weight="bold" fill="{navy}">{course}</text>
  <text x="{cx}" y="524" text-anchor="middle" font-family="sans-serif" font-size="16" fill="{ink}">Demonstrating dedication to STEAM education and commitment to continuous learning.</text>
  <text x="280" y="640" text-anchor="middle" font-family="sans-serif" font-size="20" fill="{ink}">{date}</text>
  <rect x="160" y="654" width="240" height="2" fill="{navy}"/>
  <text x="280" y="680" text-anchor="middle" font-family="sans-serif" font-size="15" fill="{ink}">Date of Completion</text>
  <text x="843" y="640" text-anchor="middle" font-family="serif" font-size="24" font-style="italic" fill="{ink}">{certifier}</text>
  <rect x="723" y="654" width="240" height="2" fill="{navy}"/>
  <text x="843" y="680" text-anchor="middle" font-family="sans-serif" font-size="15" fill="{ink}">{title}</text>
  <text x="843" y="702" text-anchor="middle" font-family="sans-serif" font-size="15" font-weight="bold" fill="{ink}">{organization}</text>
</svg>"##,
            outer_w = w - 48,
            outer_h = h - 48,
            inner_w = w - 88,
            inner_h = h - 88,
            line_x = cx - 120,
            navy = NAVY,
            gold = GOLD,
            ink = INK,
        );

        VisualDocument {
            width: w,
            height: h,
            markup,
        }
    }
}
