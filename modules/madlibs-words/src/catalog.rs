use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use serde::Deserialize;

use crate::category::Category;
use crate::error::{CatalogError, Result};

const BUNDLED_WORDS: &str = include_str!("../data/words.json");

/// On-disk shape of the catalog resource. Every category is required.
#[derive(Deserialize)]
struct CatalogFile {
    adjective: Vec<String>,
    adverb: Vec<String>,
    exclamation: Vec<String>,
    noun: Vec<String>,
    pluralnoun: Vec<String>,
    verb: Vec<String>,
    name: Vec<String>,
    animal: Vec<String>,
    verbing: Vec<String>,
    color: Vec<String>,
}

/// Immutable category → word list table. Built once at startup and shared
/// read-only by every dispatch.
#[derive(Debug, Clone)]
pub struct WordCatalog {
    lists: HashMap<Category, Vec<String>>,
}

impl WordCatalog {
    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_WORDS)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse a catalog document. Fails if any category is missing or empty.
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let lists = HashMap::from([
            (Category::Adjective, file.adjective),
            (Category::Adverb, file.adverb),
            (Category::Exclamation, file.exclamation),
            (Category::Noun, file.noun),
            (Category::PluralNoun, file.pluralnoun),
            (Category::Verb, file.verb),
            (Category::Name, file.name),
            (Category::Animal, file.animal),
            (Category::Verbing, file.verbing),
            (Category::Color, file.color),
        ]);

        for category in Category::ALL {
            if lists.get(&category).is_none_or(|words| words.is_empty()) {
                return Err(CatalogError::EmptyCategory(category));
            }
        }

        Ok(Self { lists })
    }

    pub fn words(&self, category: Category) -> &[String] {
        // Construction guarantees all ten keys.
        self.lists.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Uniform draw from the category's list.
    pub fn pick<R: Rng>(&self, category: Category, rng: &mut R) -> &str {
        let words = self.words(category);
        &words[rng.random_range(0..words.len())]
    }

    /// Total number of words across all categories.
    pub fn len(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
