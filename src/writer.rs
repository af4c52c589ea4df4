use crate::{
    config::{Config, OutputFormat},
    document::sanitize_name,
    error::{Error, Result},
    postprocess::paragraphs,
    prompt::Perspective,
    section::SectionSet,
    template::TemplateEngine,
};
use chrono::NaiveDate;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::{
    fs,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Renders a titled section set into the bytes of one output format.
pub trait Renderer {
    /// Renders the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document can't be produced.
    fn render(&self, title: &str, sections: &SectionSet) -> Result<Vec<u8>>;
}

/// Markdown, HTML and plain text, rendered with the built-in templates.
struct TemplateRenderer {
    engine: TemplateEngine,
    format: OutputFormat,
}

impl Renderer for TemplateRenderer {
    fn render(&self, title: &str, sections: &SectionSet) -> Result<Vec<u8>> {
        self.engine
            .render(self.format, title, sections)
            .map(String::into_bytes)
    }
}

/// Word-processor document: a bold title, then one paragraph per section
/// holding a bold title run followed by the body.
struct DocxRenderer;

impl DocxRenderer {
    fn section_paragraph(name: &str, text: &str) -> Paragraph {
        let mut paragraph = Paragraph::new()
            .add_run(Run::new().add_text(name).bold())
            .add_run(Run::new().add_break(BreakType::TextWrapping));

        for (index, block) in paragraphs(text).iter().enumerate() {
            let mut run = Run::new();
            if index > 0 {
                run = run
                    .add_break(BreakType::TextWrapping)
                    .add_break(BreakType::TextWrapping);
            }
            for (line_index, line) in block.lines().enumerate() {
                if line_index > 0 {
                    run = run.add_break(BreakType::TextWrapping);
                }
                run = run.add_text(line);
            }
            paragraph = paragraph.add_run(run);
        }

        paragraph
    }
}

impl Renderer for DocxRenderer {
    fn render(&self, title: &str, sections: &SectionSet) -> Result<Vec<u8>> {
        let mut docx = Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(title).bold().size(32)));

        for section in sections.iter() {
            docx = docx.add_paragraph(Self::section_paragraph(&section.name, &section.text));
        }

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| Error::render(OutputFormat::Docx.name(), e.to_string()))?;

        Ok(buffer.into_inner())
    }
}

impl OutputFormat {
    /// Creates the renderer for this format.
    ///
    /// # Errors
    ///
    /// Returns an error if the template engine fails to initialize.
    pub fn renderer(self) -> Result<Box<dyn Renderer>> {
        Ok(match self {
            Self::Markdown | Self::Html | Self::Text => Box::new(TemplateRenderer {
                engine: TemplateEngine::new()?,
                format: self,
            }),
            Self::Docx => Box::new(DocxRenderer),
        })
    }
}

/// Writes the final document and intermediate files.
pub struct Writer {
    output_dir: PathBuf,
    format: OutputFormat,
    date: NaiveDate,
    renderer: Box<dyn Renderer>,
}

impl Writer {
    /// Creates a new writer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer can't be created.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            output_dir: config.output_dir.clone(),
            format: config.format,
            date: config.run_date,
            renderer: config.format.renderer()?,
        })
    }

    /// Path of the final document: `<name>--<YYYY-MM-DD>.<ext>`.
    #[must_use]
    pub fn output_path(&self, document_name: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}--{}.{}",
            sanitize_name(document_name),
            self.date.format("%Y-%m-%d"),
            self.format.extension()
        ))
    }

    /// Path of an intermediate file: `<name>--<tag>--<YYYY-MM-DD>.txt`.
    #[must_use]
    pub fn intermediate_path(&self, document_name: &str, perspective: Perspective) -> PathBuf {
        self.output_dir.join(format!(
            "{}--{}--{}.txt",
            sanitize_name(document_name),
            perspective.tag(),
            self.date.format("%Y-%m-%d")
        ))
    }

    /// Renders and writes the final document, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or the file write fails.
    pub fn write_document(&self, document_name: &str, sections: &SectionSet) -> Result<PathBuf> {
        let content = self.renderer.render(document_name, sections)?;
        let path = self.output_path(document_name);

        write_file_atomic(&path, &content)?;

        info!(
            "Wrote {} document ({} sections) to {}",
            self.format,
            sections.len(),
            path.display()
        );
        Ok(path)
    }

    /// Writes the raw accumulated text of one perspective.
    ///
    /// # Errors
    ///
    /// Returns an error if the file write fails.
    pub fn write_intermediate(
        &self,
        document_name: &str,
        perspective: Perspective,
        text: &str,
    ) -> Result<PathBuf> {
        let path = self.intermediate_path(document_name, perspective);
        write_file_atomic(&path, text.as_bytes())?;

        debug!("Wrote {} notes to {}", perspective, path.display());
        Ok(path)
    }
}

/// Writes a file atomically.
///
/// # Process
///
/// 1. Writes content to a temporary file next to the target
/// 2. Syncs the temporary file to disk
/// 3. Renames it over the target path
///
/// The temporary file is removed again if any step fails.
fn write_file_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let result = write_and_rename(&temp_path, path, content);
    if result.is_err() && temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            debug!("Failed to remove {}: {}", temp_path.display(), e);
        }
    }

    result
}

fn write_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = fs::File::create(temp_path).map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| Error::io(temp_path, e))?;

    drop(temp_file);

    fs::rename(temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}
