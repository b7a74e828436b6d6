//! Embedded Tera templates for rendered documents

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;

use super::DocumentError;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

pub const ANNEX_XIII_MD: &str = "annex_xiii.md.tera";
pub const ANNEX_XIII_HTML: &str = "annex_xiii.html.tera";
pub const INVOICE_MD: &str = "invoice.md.tera";
pub const WORKSHEET_MD: &str = "worksheet.md.tera";

/// Renders the embedded templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, DocumentError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let source = std::str::from_utf8(&content.data)
                    .map_err(|e| DocumentError::Template(format!("{}: {}", filename, e)))?;
                tera.add_raw_template(filename, source)
                    .map_err(|e| DocumentError::Template(format!("{}: {}", filename, e)))?;
            }
        }

        Ok(Self { tera })
    }

    pub fn render<C: Serialize>(&self, template: &str, context: &C) -> Result<String, DocumentError> {
        let context = tera::Context::from_serialize(context)
            .map_err(|e| DocumentError::Template(e.to_string()))?;
        self.tera.render(template, &context).map_err(|e| {
            // tera hides the useful part of the message in the source chain
            let mut message = e.to_string();
            let mut source = std::error::Error::source(&e);
            while let Some(inner) = source {
                message.push_str(": ");
                message.push_str(&inner.to_string());
                source = inner.source();
            }
            DocumentError::Template(message)
        })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_embedded() {
        let renderer = TemplateRenderer::new().unwrap();
        for name in [ANNEX_XIII_MD, ANNEX_XIII_HTML, INVOICE_MD, WORKSHEET_MD] {
            assert!(renderer.has_template(name), "{}", name);
        }
    }
}
