//! Grimoire catalog: the readable content units of the library.
//!
//! A grimoire is described by a YAML catalog document listing its chapters
//! in reading order. Chapter HTML is stored inline or in sibling files
//! referenced by relative path.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::LibraryArgs;
use crate::tokenizer;

const READING_WORDS_PER_MINUTE: u32 = 200;

/// On-disk catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrimoireDoc {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub chapters: Vec<ChapterDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    /// 1-based reading order, unique within the grimoire.
    pub order: u32,
    /// Inline chapter HTML. Mutually exclusive with `content_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Chapter HTML file, relative to the catalog document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Grimoire {
    pub id: String,
    pub title: String,
    /// Sorted by `order`, validated contiguous from 1.
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: String,
    pub grimoire_id: String,
    pub title: String,
    pub order: u32,
    pub content: String,
    pub reading_time_minutes: u32,
}

impl Grimoire {
    pub fn chapter(&self, order: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.order == order)
    }
}

pub fn load_catalog(path: &Path) -> anyhow::Result<Grimoire> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("read catalog: {}", path.display()))?;
    let doc: GrimoireDoc = serde_yaml::from_str(&yaml).context("parse catalog yaml")?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    grimoire_from_doc(doc, base_dir)
}

fn grimoire_from_doc(doc: GrimoireDoc, base_dir: &Path) -> anyhow::Result<Grimoire> {
    if doc.id.trim().is_empty() {
        anyhow::bail!("grimoire id is empty");
    }
    if doc.title.trim().is_empty() {
        anyhow::bail!("grimoire title is empty");
    }
    if doc.chapters.is_empty() {
        anyhow::bail!("grimoire has no chapters: {}", doc.id);
    }

    let mut chapters = Vec::new();
    for ch in doc.chapters {
        if ch.title.trim().is_empty() {
            anyhow::bail!("chapter title is empty (order {})", ch.order);
        }
        let content = match (ch.content, ch.content_path) {
            (Some(_), Some(_)) => anyhow::bail!(
                "chapter {:?} has both content and content_path; pick one",
                ch.title
            ),
            (Some(html), None) => html,
            (None, Some(rel)) => {
                let content_path: PathBuf = base_dir.join(&rel);
                std::fs::read_to_string(&content_path)
                    .with_context(|| format!("read chapter html: {}", content_path.display()))?
            }
            (None, None) => anyhow::bail!(
                "chapter {:?} has neither content nor content_path",
                ch.title
            ),
        };

        let id = ch
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| chapter_id(&doc.id, ch.order));

        chapters.push(Chapter {
            id,
            grimoire_id: doc.id.clone(),
            title: ch.title,
            order: ch.order,
            reading_time_minutes: estimated_reading_minutes(&content),
            content,
        });
    }

    chapters.sort_by_key(|c| c.order);
    for (idx, chapter) in chapters.iter().enumerate() {
        let expected = idx as u32 + 1;
        if chapter.order != expected {
            anyhow::bail!(
                "chapter orders must be unique and contiguous from 1; found order {} where {} was expected",
                chapter.order,
                expected
            );
        }
    }

    Ok(Grimoire {
        id: doc.id,
        title: doc.title,
        chapters,
    })
}

/// Stripped word count at a fixed reading pace, never reported as zero.
pub fn estimated_reading_minutes(html: &str) -> u32 {
    let words = tokenizer::word_count(html) as u32;
    (words / READING_WORDS_PER_MINUTE).max(1)
}

fn chapter_id(grimoire_id: &str, order: u32) -> String {
    use sha2::Digest as _;
    let mut hasher = sha2::Sha256::new();
    hasher.update(grimoire_id.as_bytes());
    hasher.update(b"/");
    hasher.update(order.to_string().as_bytes());
    let digest = hasher.finalize();
    format!("ch_{}", hex::encode(&digest[..8]))
}

pub fn list(args: LibraryArgs) -> anyhow::Result<()> {
    let grimoire = load_catalog(Path::new(&args.catalog))?;
    println!("{} ({} chapter(s))", grimoire.title, grimoire.chapters.len());
    for chapter in &grimoire.chapters {
        println!(
            "  {:>3}. {} [{} min]",
            chapter.order, chapter.title, chapter.reading_time_minutes
        );
    }
    Ok(())
}

pub fn check(args: LibraryArgs) -> anyhow::Result<()> {
    let grimoire = load_catalog(Path::new(&args.catalog))?;
    tracing::debug!(grimoire_id = %grimoire.id, chapters = grimoire.chapters.len(), "catalog ok");
    println!("ok: {} chapter(s)", grimoire.chapters.len());
    Ok(())
}
