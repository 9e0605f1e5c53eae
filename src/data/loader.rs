// ============================================================
// Layer 4 — Document Loader
// ============================================================
// Reads every supported file in a directory into a Document:
//
//   .txt / .md  → read as UTF-8 text
//   .docx       → paragraph text extracted with docx-rs
//
// A .docx file is a ZIP of XML parts. docx-rs exposes the body as
//
//   Document → Paragraph → Run → Text
//
// and we join the Text leaves run by run, paragraph by paragraph.
//
// Files are visited in filename order so the reader sees the same
// document order on every run. A file that fails to load is
// skipped with a warning rather than failing the whole directory.

use anyhow::{Context, Result};
use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

pub struct DocumentLoader {
    dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for DocumentLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if !self.dir.exists() {
            tracing::warn!(
                "Docs directory '{}' does not exist, returning empty corpus",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            let loaded = match extension(&path).as_deref() {
                Some("txt") | Some("md") => load_text(&path),
                Some("docx")             => load_docx(&path),
                _                        => continue,
            };
            match loaded {
                Ok(doc) => {
                    tracing::debug!("Loaded: {} ({} bytes)", doc.id, doc.content.len());
                    docs.push(doc);
                }
                Err(e) => tracing::warn!("Skipping '{}': {e:#}", path.display()),
            }
        }

        tracing::info!("Loaded {} documents from '{}'", docs.len(), self.dir.display());
        Ok(docs)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn load_text(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Document::new(document_id(path), content))
}

fn load_docx(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let docx = read_docx(&bytes)
        .map_err(|e| anyhow::anyhow!("docx-rs parse error in '{}': {e:?}", path.display()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    Ok(Document::new(document_id(path), paragraphs.join("\n")))
}

/// Runs inside one paragraph belong to the same sentence, so they
/// are joined without a separator.
fn paragraph_text(para: &Paragraph) -> String {
    para.children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
        .flat_map(|run| run.children.iter())
        .filter_map(|rc| match rc {
            RunChild::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_text_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.md"), "first").unwrap();
        fs::write(dir.path().join("ignored.bin"), [0u8, 1, 2]).unwrap();

        let docs = DocumentLoader::new(dir.path()).load_all().unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.txt"]);
        assert_eq!(docs[0].content, "first");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let docs = DocumentLoader::new("/definitely/not/here").load_all().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_broken_docx_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.docx"), b"not a zip").unwrap();
        fs::write(dir.path().join("ok.txt"), "fine").unwrap();

        let docs = DocumentLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "ok.txt");
    }
}
