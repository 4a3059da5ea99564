// FindBugs bug-pattern and category catalog
//
// Loaded once per process from a FindBugs installation when one is
// configured, otherwise from the catalog bundled with the binary.

use super::xml::{Element, Node, XmlError, XmlStream, format_text};
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// FindBugs version the bundled catalog was taken from
pub const BUNDLED_VERSION: &str = "1.3.9";

const BUNDLED_PATTERNS: &str = include_str!("../../assets/findbugs-patterns.xml");

static SHARED_CATALOG: OnceCell<Arc<PatternCatalog>> = OnceCell::new();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogSource {
    #[default]
    Bundled,
    FindBugsHome,
}

#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    categories: HashMap<String, Category>,
    patterns: HashMap<String, Pattern>,
    source: CatalogSource,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog compiled into the binary
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        if let Err(e) = catalog.merge_xml(BUNDLED_PATTERNS.as_bytes()) {
            warn!("Bundled FindBugs catalog is unreadable: {}", e);
        }
        catalog
    }

    /// Catalog read from `<home>/etc/findbugs.xml` and `<home>/etc/messages.xml`.
    /// Either file may be missing, but not both.
    pub fn from_home(home: &Path) -> Result<Self> {
        let mut catalog = Self {
            source: CatalogSource::FindBugsHome,
            ..Self::default()
        };
        let mut loaded = 0;
        for name in ["findbugs.xml", "messages.xml"] {
            let path = home.join("etc").join(name);
            if !path.is_file() {
                debug!("{} not found", path.display());
                continue;
            }
            let content = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            catalog
                .merge_xml(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            loaded += 1;
        }

        if loaded == 0 {
            anyhow::bail!("no FindBugs pattern files under {}", home.display());
        }
        Ok(catalog)
    }

    /// Process-wide catalog, loaded on first use
    pub fn shared(home: Option<&Path>) -> Arc<PatternCatalog> {
        SHARED_CATALOG
            .get_or_init(|| {
                let catalog = match home {
                    Some(home) => Self::from_home(home).unwrap_or_else(|e| {
                        warn!("{:#}; falling back to bundled FindBugs catalog", e);
                        Self::bundled()
                    }),
                    None => Self::bundled(),
                };
                debug!(
                    "FindBugs catalog: {} categories, {} patterns",
                    catalog.categories.len(),
                    catalog.patterns.len()
                );
                Arc::new(catalog)
            })
            .clone()
    }

    /// Add the categories and patterns found in a FindBugs XML document
    pub fn merge_xml(&mut self, content: &[u8]) -> Result<(), XmlError> {
        let mut stream = XmlStream::new(content);
        let mut builder = CatalogBuilder::default();
        let mut text = String::new();

        while let Some(node) = stream.next_node()? {
            match node {
                Node::Open(el) => builder.open(&el, self),
                Node::Text(t) => text.push_str(&t),
                Node::Close(name) => {
                    builder.close(&name, &text, self);
                    text.clear();
                }
            }
        }
        Ok(())
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    fn declare_category(&mut self, id: &str) {
        self.categories.entry(id.to_string()).or_default();
    }

    fn declare_pattern(&mut self, id: &str, category: Option<&str>) {
        let pattern = self.patterns.entry(id.to_string()).or_default();
        if let Some(category) = category {
            pattern.category = category.to_string();
        }
    }
}

/// Incremental builder fed with `BugCategory`/`BugPattern` nodes
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    category: Option<String>,
    pattern: Option<String>,
}

impl CatalogBuilder {
    pub fn open(&mut self, el: &Element, catalog: &mut PatternCatalog) {
        match el.name.as_str() {
            "BugCategory" => {
                let id = el.attr("category").unwrap_or_default();
                catalog.declare_category(id);
                self.category = Some(id.to_string());
            }
            "BugPattern" => {
                let id = el.attr("type").unwrap_or_default();
                catalog.declare_pattern(id, el.attr("category"));
                self.pattern = Some(id.to_string());
            }
            _ => {}
        }
    }

    /// `text` is the character data collected since the previous close
    pub fn close(&mut self, name: &str, text: &str, catalog: &mut PatternCatalog) {
        match name {
            "BugCategory" => self.category = None,
            "BugPattern" => self.pattern = None,
            "Description" => {
                if let Some(category) = self.category_mut(catalog) {
                    category.name = format_text(text);
                }
            }
            "ShortDescription" => {
                if let Some(pattern) = self.pattern_mut(catalog) {
                    pattern.name = format_text(text);
                }
            }
            "Details" => {
                let details = format_text(text);
                if let Some(category) = self.category_mut(catalog) {
                    category.description = details;
                } else if let Some(pattern) = self.pattern_mut(catalog) {
                    pattern.description = details;
                }
            }
            _ => {}
        }
    }

    fn category_mut<'c>(&self, catalog: &'c mut PatternCatalog) -> Option<&'c mut Category> {
        self.category
            .as_deref()
            .and_then(|id| catalog.categories.get_mut(id))
    }

    fn pattern_mut<'c>(&self, catalog: &'c mut PatternCatalog) -> Option<&'c mut Pattern> {
        self.pattern
            .as_deref()
            .and_then(|id| catalog.patterns.get_mut(id))
    }
}

/// Document-local declarations first, then the shared catalog
pub struct CatalogView<'a> {
    pub local: &'a PatternCatalog,
    pub shared: &'a PatternCatalog,
}

impl<'a> CatalogView<'a> {
    pub fn pattern(&self, id: &str) -> Option<&'a Pattern> {
        self.local.pattern(id).or_else(|| self.shared.pattern(id))
    }

    pub fn category(&self, id: &str) -> Option<&'a Category> {
        self.local.category(id).or_else(|| self.shared.category(id))
    }
}
