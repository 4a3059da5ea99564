// FindBugs XML report parser
//
// Bug instances may reference patterns declared later in the same
// document; those wait until the end of the document to be resolved.

use super::catalog::{
    BUNDLED_VERSION, CatalogBuilder, CatalogSource, CatalogView, PatternCatalog,
};
use super::inspections::{DEFAULT_MESSAGE, InspectionBatch, InspectionState};
use super::xml::{Node, XmlError, XmlStream, format_text, parse_number};
use super::{ParseOutcome, ParserContext, ReportParser};
use crate::error::ReportError;
use crate::state::{Inspection, InspectionType, ReportFile, Severity, ThresholdAggregator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const TRAILING_TAG: &str = "</BugCollection>";

const UNKNOWN_CATEGORY: &str = "Unknown";
const UNKNOWN_DESCRIPTION: &str = "Unknown bug pattern";

pub struct FindBugsParser {
    state: InspectionState,
    home: Option<PathBuf>,
    catalog: Option<Arc<PatternCatalog>>,
}

impl FindBugsParser {
    pub fn new(ctx: &ParserContext) -> Self {
        Self {
            state: InspectionState::new(ctx),
            home: ctx.findbugs_home.clone(),
            catalog: None,
        }
    }

    /// Parser bound to a specific catalog instead of the process-wide one
    pub fn with_catalog(ctx: &ParserContext, catalog: Arc<PatternCatalog>) -> Self {
        Self {
            catalog: Some(catalog),
            ..Self::new(ctx)
        }
    }
}

impl ReportParser for FindBugsParser {
    fn parse(&mut self, report: &ReportFile, _processed: u64) -> Result<ParseOutcome, ReportError> {
        let home = self.home.as_deref();
        let catalog = self
            .catalog
            .get_or_insert_with(|| PatternCatalog::shared(home))
            .clone();
        let report_path = report.path().display().to_string();

        self.state
            .attempt(report, TRAILING_TAG, "FindBugs", |state, content| {
                BugWalk::new(state, &catalog, &report_path).run(content)
            })
    }

    fn is_abnormal_end(&self) -> bool {
        self.state.is_abnormal_end()
    }

    fn complete_report(&mut self, report: &ReportFile) -> String {
        self.state.complete_report(report)
    }

    fn thresholds(&self) -> Option<&ThresholdAggregator> {
        Some(self.state.thresholds())
    }
}

/// Locates files relative to the `SrcDir`/`Jar` roots listed in a report
#[derive(Debug, Default)]
pub struct FileFinder {
    roots: Vec<PathBuf>,
}

impl FileFinder {
    pub fn add_root(&mut self, root: &str) {
        if !root.is_empty() {
            self.roots.push(PathBuf::from(root));
        }
    }

    /// Full path of `relative` under the first directory root containing it
    pub fn find(&self, relative: &str) -> Option<String> {
        self.roots
            .iter()
            .filter(|root| root.is_dir())
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists())
            .map(|found| found.display().to_string())
    }
}

struct BugWalk<'a> {
    state: &'a InspectionState,
    shared: &'a PatternCatalog,
    report_path: &'a str,
    local: PatternCatalog,
    builder: CatalogBuilder,
    finder: FileFinder,
    batch: InspectionBatch,
    bug: Option<Inspection>,
    class: Option<String>,
    waiting: Vec<Inspection>,
}

impl<'a> BugWalk<'a> {
    fn new(state: &'a InspectionState, shared: &'a PatternCatalog, report_path: &'a str) -> Self {
        Self {
            state,
            shared,
            report_path,
            local: PatternCatalog::new(),
            builder: CatalogBuilder::default(),
            finder: FileFinder::default(),
            batch: InspectionBatch::new(),
            bug: None,
            class: None,
            waiting: Vec::new(),
        }
    }

    fn run(mut self, content: &[u8]) -> Result<InspectionBatch, XmlError> {
        let mut stream = XmlStream::new(content);
        let mut text = String::new();

        while let Some(node) = stream.next_node()? {
            match node {
                Node::Open(el) => {
                    self.builder.open(&el, &mut self.local);
                    match el.name.as_str() {
                        "BugCollection" => self.check_version(el.attr("version")),
                        "BugInstance" => {
                            self.bug = Some(Inspection {
                                type_id: el.attr_string("type").unwrap_or_default(),
                                file_path: String::new(),
                                line: 0,
                                message: DEFAULT_MESSAGE.to_string(),
                                severity: Severity::from_priority(parse_number(
                                    el.attr("priority"),
                                )),
                            });
                        }
                        "Class" if self.class.is_none() => {
                            self.class = el.attr_string("classname");
                        }
                        "SourceLine" => {
                            if el.attr("classname").is_some()
                                && el.attr("classname") == self.class.as_deref()
                            {
                                let sourcepath = el.attr("sourcepath").unwrap_or_default();
                                let path = self.path_spec(sourcepath);
                                if let Some(bug) = self.bug.as_mut() {
                                    bug.line = parse_number(el.attr("start"));
                                    if bug.file_path.is_empty() {
                                        bug.file_path = path;
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Node::Text(t) => text.push_str(&t),
                Node::Close(name) => {
                    self.builder.close(&name, &text, &mut self.local);
                    self.close(&name, &text);
                    text.clear();
                }
            }
        }

        self.resolve_waiting();
        Ok(self.batch)
    }

    fn close(&mut self, name: &str, text: &str) {
        match name {
            "Jar" | "SrcDir" => self.finder.add_root(&format_text(text)),
            "BugInstance" => {
                if let Some(mut bug) = self.bug.take() {
                    if bug.file_path.is_empty() {
                        bug.file_path = self.path_spec("");
                    }
                    if self.view().pattern(&bug.type_id).is_some() {
                        self.report(bug);
                    } else {
                        debug!("{} is not declared yet, waiting for end of report", bug.type_id);
                        self.waiting.push(bug);
                    }
                }
                self.class = None;
            }
            "ShortMessage" | "LongMessage" => {
                let message = format_text(text);
                if let Some(bug) = self.bug.as_mut()
                    && bug.message == DEFAULT_MESSAGE
                    && !message.is_empty()
                {
                    bug.message = message;
                }
            }
            "MissingClass" => {
                let class = format_text(text);
                if !class.is_empty() {
                    self.batch.warning(format!("Missing class {}", class));
                }
            }
            _ => {}
        }
    }

    fn check_version(&mut self, version: Option<&str>) {
        if self.shared.source() == CatalogSource::Bundled && version != Some(BUNDLED_VERSION) {
            self.batch.warning(format!(
                "FindBugs report {} has version {}, bundled patterns are from FindBugs {}. \
                 Some pattern names and descriptions may be missing; set the FindBugs home \
                 to load patterns from the installation.",
                self.report_path,
                version.unwrap_or("unknown"),
                BUNDLED_VERSION
            ));
        }
    }

    fn view(&self) -> CatalogView<'_> {
        CatalogView {
            local: &self.local,
            shared: self.shared,
        }
    }

    fn report(&mut self, mut bug: Inspection) {
        let inspection_type = self.inspection_type(&bug.type_id);
        if bug.message == DEFAULT_MESSAGE
            && let Some(pattern) = self.view().pattern(&bug.type_id)
            && !pattern.description.is_empty()
        {
            bug.message = pattern.description.clone();
        }
        self.batch.declare_type(inspection_type);
        self.batch.finding(bug);
    }

    fn resolve_waiting(&mut self) {
        for bug in std::mem::take(&mut self.waiting) {
            if self.view().pattern(&bug.type_id).is_none() {
                debug!("Couldn't get pattern for {}", bug.type_id);
            }
            self.report(bug);
        }
    }

    fn inspection_type(&self, id: &str) -> InspectionType {
        let view = self.view();
        let Some(pattern) = view.pattern(id) else {
            return InspectionType {
                id: id.to_string(),
                name: id.to_string(),
                category: UNKNOWN_CATEGORY.to_string(),
                description: UNKNOWN_DESCRIPTION.to_string(),
            };
        };

        let (category, description) = match view.category(&pattern.category) {
            Some(category) => (category.name.clone(), category.description.clone()),
            None => {
                debug!("Couldn't get category for {}", pattern.category);
                (UNKNOWN_CATEGORY.to_string(), String::new())
            }
        };
        let name = if pattern.name.is_empty() {
            id.to_string()
        } else {
            pattern.name.clone()
        };

        InspectionType {
            id: id.to_string(),
            name,
            category,
            description,
        }
    }

    /// Report path of the current bug: the source path found under one of
    /// the source roots, else derived from the class name
    fn path_spec(&self, sourcepath: &str) -> String {
        let class_file = self
            .class
            .as_deref()
            .map(|class| class.split('$').next().unwrap_or(class).replace('.', "/"));

        let found = (!sourcepath.is_empty())
            .then(|| self.finder.find(sourcepath))
            .flatten()
            .or_else(|| {
                class_file
                    .as_ref()
                    .and_then(|base| self.finder.find(&format!("{}.class", base)))
            });

        let spec = match (found, class_file) {
            (Some(found), _) => found,
            (None, _) if !sourcepath.is_empty() => sourcepath.to_string(),
            (None, Some(base)) => format!("{}.java", base),
            (None, None) => String::new(),
        };
        self.state.resolve_path(&spec)
    }
}
