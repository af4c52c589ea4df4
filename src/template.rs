use crate::{
    config::OutputFormat,
    error::{Error, Result},
    postprocess::paragraphs,
    section::SectionSet,
};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

#[derive(Serialize)]
struct TemplateContext<'a> {
    title: &'a str,
    sections: Vec<SectionView<'a>>,
    metadata: ContextMetadata,
}

#[derive(Serialize)]
struct SectionView<'a> {
    name: &'a str,
    text: &'a str,
    paragraphs: Vec<String>,
}

#[derive(Serialize)]
struct ContextMetadata {
    generated_at: String,
}

/// Template engine for the text-based output formats.
pub(crate) struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Creates a template engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in template fails to parse.
    pub(crate) fn new() -> Result<Self> {
        let mut tera = Tera::default();

        Self::register_builtin_templates(&mut tera)?;
        tera.register_filter("html_escape", Self::html_escape_filter);

        Ok(Self { tera })
    }

    /// Registers built-in templates for each text format.
    fn register_builtin_templates(tera: &mut Tera) -> Result<()> {
        tera.add_raw_template("markdown", include_str!("../templates/markdown.tera"))
            .map_err(|e| Error::template("markdown", e))?;

        tera.add_raw_template("html", include_str!("../templates/html.tera"))
            .map_err(|e| Error::template("html", e))?;

        tera.add_raw_template("text", include_str!("../templates/text.tera"))
            .map_err(|e| Error::template("text", e))?;

        Ok(())
    }

    /// HTML escape filter implementation.
    fn html_escape_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        if let Some(s) = value.as_str() {
            let escaped = s
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
                .replace('"', "&quot;")
                .replace('\'', "&#39;");
            Ok(Value::String(escaped))
        } else {
            Ok(value.clone())
        }
    }

    /// Renders a document with the template of the given format.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the format has no template.
    pub(crate) fn render(
        &self,
        format: OutputFormat,
        title: &str,
        sections: &SectionSet,
    ) -> Result<String> {
        let template_name = format.name();

        let context = TemplateContext {
            title,
            sections: sections
                .iter()
                .map(|s| SectionView {
                    name: &s.name,
                    text: &s.text,
                    paragraphs: paragraphs(&s.text),
                })
                .collect(),
            metadata: ContextMetadata {
                generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            },
        };

        let mut tera_context = Context::new();
        tera_context.insert("ctx", &context);

        self.tera
            .render(template_name, &tera_context)
            .map_err(|e| Error::template(template_name, e))
    }
}
