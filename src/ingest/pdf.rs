//! PDF text extraction using lopdf

use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RagError, Result};

/// A source PDF and the text extracted from it.
///
/// `folder` is the PDF's directory below the input root (the first path
/// component is dropped) so outputs mirror the input layout.
#[derive(Debug, Clone)]
pub struct PdfSource {
    path: PathBuf,
    folder: PathBuf,
    name: String,
    content: String,
}

impl PdfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let folder = path
            .parent()
            .map(|parent| parent.components().skip(1).collect())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            folder,
            name,
            content: String::new(),
        }
    }

    /// Read every page in order, dropping blank lines
    pub fn extract_text(&mut self) -> Result<&str> {
        tracing::info!(pdf = %self.name, "extracting text");

        let doc = Document::load(&self.path)
            .map_err(|e| RagError::PdfError(format!("Failed to load {}: {}", self.path.display(), e)))?;

        let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_num in page_numbers {
            match doc.extract_text(&[page_num]) {
                Ok(text) => pages.push(drop_blank_lines(&text)),
                Err(e) => tracing::warn!(pdf = %self.name, page = page_num, error = %e, "page skipped"),
            }
        }

        self.content = pages.join("\n");
        Ok(&self.content)
    }

    /// Write the extracted text to `<root>/<folder>/<name>.txt`
    pub fn save_text(&self, output_root: &Path) -> Result<PathBuf> {
        let dir = output_root.join(&self.folder);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.txt", self.name));
        fs::write(&path, &self.content)?;
        tracing::info!(path = %path.display(), "extracted text saved");
        Ok(path)
    }

    /// Use previously saved text instead of re-extracting
    pub fn load_content(&mut self, content_file: &Path) -> Result<()> {
        self.content = fs::read_to_string(content_file)?;
        tracing::debug!(pdf = %self.name, "content loaded");
        Ok(())
    }

    /// Location of this PDF's derived `extension` file under `output_root`
    pub fn output_path(&self, output_root: &Path, extension: &str) -> PathBuf {
        output_root
            .join(&self.folder)
            .join(format!("{}.{}", self.name, extension))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

fn drop_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::TempDir;

    fn write_pdf(path: &Path, text: &str) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_names_from_path() {
        let source = PdfSource::new("input/reports/2021/climate.pdf");
        assert_eq!(source.name(), "climate");
        assert_eq!(source.folder(), Path::new("reports/2021"));
        assert_eq!(
            source.output_path(Path::new("out"), "json"),
            PathBuf::from("out/reports/2021/climate.json")
        );
    }

    #[test]
    fn test_drop_blank_lines() {
        assert_eq!(drop_blank_lines("a\n\n  \nb\n"), "a\nb");
    }

    #[test]
    fn test_extract_and_save() {
        let dir = TempDir::new().unwrap();
        let pdf_path = dir.path().join("policy.pdf");
        write_pdf(&pdf_path, "Carbon tax introduced");

        let mut source = PdfSource::new(&pdf_path);
        let text = source.extract_text().unwrap().to_string();
        assert!(text.contains("Carbon"));

        let out = TempDir::new().unwrap();
        let saved = source.save_text(out.path()).unwrap();
        assert_eq!(fs::read_to_string(&saved).unwrap(), text);

        let mut reloaded = PdfSource::new(&pdf_path);
        reloaded.load_content(&saved).unwrap();
        assert_eq!(reloaded.content(), text);
    }

    #[test]
    fn test_missing_pdf_is_error() {
        let mut source = PdfSource::new("does/not/exist.pdf");
        assert!(matches!(source.extract_text(), Err(RagError::PdfError(_))));
    }
}
