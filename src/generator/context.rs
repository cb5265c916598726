//! Per-translation generator state
//!
//! A [`Context`] is built fresh for every program and dropped when the
//! program text is returned. Nothing in it outlives one translation, so
//! several translations may run on different threads at once.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConverterConfig;
use crate::models::{Project, RenameTable};

use super::malformed::MalformedDetector;
use super::position::Cursor;

/// Spaces per indentation level
const INDENT: &str = "    ";

/// Fonts declared by every program when the source does not define them
pub const DEFAULT_FONTS: &[(&str, &str, f64)] = &[
    ("ARIAL06", "Arial", 6.0),
    ("ARIAL08", "Arial", 8.0),
    ("ARIAL10", "Arial", 10.0),
    ("ARIAL12", "Arial", 12.0),
    ("COURIER08", "Courier New", 8.0),
    ("COURIER10", "Courier New", 10.0),
];

/// Indented line buffer
///
/// Every non-blank line passes through the malformed-line detector before
/// the indentation is applied.
#[derive(Debug)]
pub struct Emitter<'a> {
    lines: Vec<String>,
    level: usize,
    detector: &'a MalformedDetector,
}

impl<'a> Emitter<'a> {
    pub fn new(detector: &'a MalformedDetector) -> Self {
        Self { lines: Vec::new(), level: 0, detector }
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
            return;
        }
        let text = self.detector.sanitize(text);
        self.lines.push(format!("{}{}", INDENT.repeat(self.level), text));
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Reset the indentation to `level`.
    pub fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_text(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// State of the section currently being walked
#[derive(Debug, Clone)]
pub struct Section {
    pub cursor: Cursor,
    pub font: String,
    pub color: Option<String>,
    /// Operands of the last CACHE, consumed by the next SCALL
    pub cache: Vec<String>,
    pub outline_open: bool,
    /// `POSX`/`POSY` already captured in the open OUTLINE
    pub box_anchored: bool,
}

impl Section {
    pub fn new(cursor: Cursor, font: &str) -> Self {
        Self {
            cursor,
            font: font.to_string(),
            color: None,
            cache: Vec::new(),
            outline_open: false,
            box_anchored: false,
        }
    }
}

/// Everything one translation call needs
pub struct Context<'a> {
    pub out: Emitter<'a>,
    pub config: &'a ConverterConfig,
    pub project: &'a Project,
    /// Alias renames of the sub-form being translated
    pub renames: Option<&'a RenameTable>,
    pub section: Section,
    /// Uppercased font alias to point size
    font_sizes: BTreeMap<String, f64>,
    /// Color aliases declared anywhere in the project
    colors: BTreeSet<String>,
    /// Record-type key to DOCFORMAT name
    pub registry: BTreeMap<String, String>,
    /// Subroutines that need an `SR_` section
    routines: Vec<String>,
    queued: BTreeSet<String>,
    /// Subroutines currently being inlined
    inline_stack: Vec<String>,
    pub warnings: Vec<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a ConverterConfig,
        project: &'a Project,
        detector: &'a MalformedDetector,
        renames: Option<&'a RenameTable>,
    ) -> Self {
        let mut font_sizes: BTreeMap<String, f64> =
            DEFAULT_FONTS.iter().map(|(alias, _, size)| (alias.to_string(), *size)).collect();
        let all_fonts =
            project.document.fonts.values().chain(project.forms.iter().flat_map(|f| f.fonts.values()));
        for font in all_fonts {
            font_sizes.insert(font.alias.to_ascii_uppercase(), font.size);
        }

        let colors = project
            .document
            .colors
            .keys()
            .chain(project.forms.iter().flat_map(|f| f.colors.keys()))
            .cloned()
            .collect();

        let section = Section::new(Cursor::new(0.0, 0.0), &config.layout.default_font);
        Self {
            out: Emitter::new(detector),
            config,
            project,
            renames,
            section,
            font_sizes,
            colors,
            registry: BTreeMap::new(),
            routines: Vec::new(),
            queued: BTreeSet::new(),
            inline_stack: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Start a fresh section with the cursor at `(x, y)`.
    pub fn begin_section(&mut self, x: f64, y: f64) {
        self.section = Section::new(Cursor::new(x, y), &self.config.layout.default_font);
    }

    /// Uppercased font alias after sub-form renames.
    pub fn font_alias(&self, alias: &str) -> String {
        let alias = match self.renames {
            Some(table) => table.font(alias),
            None => alias,
        };
        alias.to_ascii_uppercase()
    }

    /// Color alias after sub-form renames.
    pub fn color_alias(&self, alias: &str) -> String {
        match self.renames {
            Some(table) => table.color(alias).to_string(),
            None => alias.to_string(),
        }
    }

    pub fn is_declared_color(&self, alias: &str) -> bool {
        self.colors.contains(alias)
    }

    /// Vertical correction variable for `font`, if its size is known.
    pub fn correction_for(&self, font: &str) -> Option<String> {
        let size = *self.font_sizes.get(&font.to_ascii_uppercase())?;
        if size <= 0.0 {
            return None;
        }
        self.config.calibration.band_for(size).map(|band| band.variable())
    }

    /// Correction for the current font.
    pub fn correction(&self) -> Option<String> {
        self.correction_for(&self.section.font)
    }

    /// Ask for an `SR_` section for `name`.
    pub fn request_routine(&mut self, name: &str) {
        if self.queued.insert(name.to_string()) {
            self.routines.push(name.to_string());
        }
    }

    /// Next subroutine waiting for its section, in request order.
    pub fn take_routine(&mut self) -> Option<String> {
        if self.routines.is_empty() {
            None
        } else {
            Some(self.routines.remove(0))
        }
    }

    /// Mark `name` as being inlined. Returns false on recursion.
    pub fn enter_inline(&mut self, name: &str) -> bool {
        if self.inline_stack.iter().any(|n| n == name) {
            return false;
        }
        self.inline_stack.push(name.to_string());
        true
    }

    pub fn leave_inline(&mut self) {
        self.inline_stack.pop();
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Open an OUTLINE if none is open. Returns true when this call opened it.
    pub fn ensure_outline(&mut self) -> bool {
        if self.section.outline_open {
            return false;
        }
        self.out.blank();
        self.out.line("OUTLINE");
        self.out.indent();
        self.out.line("POSITION LEFT NEXT");
        self.out.line("DIRECTION ACROSS;");
        self.out.blank();
        self.section.outline_open = true;
        self.section.box_anchored = false;
        true
    }

    pub fn close_outline(&mut self) {
        if self.section.outline_open {
            self.out.dedent();
            self.out.line("ENDIO;");
            self.section.outline_open = false;
        }
    }

    pub fn into_output(self) -> (String, Vec<String>) {
        (self.out.into_text(), self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FontDef, PrimaryDocument};

    fn project_with_font(alias: &str, size: f64) -> Project {
        let mut document = PrimaryDocument::default();
        document.fonts.insert(alias.to_string(), FontDef { alias: alias.to_string(), face: "ARIAL".into(), size });
        Project::new(document, Vec::new())
    }

    #[test]
    fn test_emitter_indents_and_sanitizes() {
        let detector = MalformedDetector::default();
        let mut out = Emitter::new(&detector);
        out.line("A;");
        out.indent();
        out.line("B = -;");
        out.blank();
        out.dedent();
        out.dedent();
        out.line("C;");
        assert_eq!(out.lines(), &["A;", "    /* B = -; */", "", "C;"]);
        assert_eq!(out.into_text(), "A;\n    /* B = -; */\n\nC;\n");
    }

    #[test]
    fn test_correction_lookup() {
        let config = ConverterConfig::default();
        let project = project_with_font("F1", 7.0);
        let detector = MalformedDetector::default();
        let ctx = Context::new(&config, &project, &detector, None);

        assert_eq!(ctx.correction_for("f1").as_deref(), Some("&CORFONT7"));
        assert_eq!(ctx.correction_for("ARIAL08").as_deref(), Some("&CORFONT8"));
        assert_eq!(ctx.correction_for("UNKNOWN"), None);
        assert_eq!(ctx.correction().as_deref(), Some("&CORFONT8"));
    }

    #[test]
    fn test_zero_size_has_no_correction() {
        let config = ConverterConfig::default();
        let project = project_with_font("F0", 0.0);
        let detector = MalformedDetector::default();
        let ctx = Context::new(&config, &project, &detector, None);
        assert_eq!(ctx.correction_for("F0"), None);
    }

    #[test]
    fn test_font_alias_uses_renames() {
        let config = ConverterConfig::default();
        let project = Project::default();
        let detector = MalformedDetector::default();
        let mut renames = RenameTable::default();
        renames.fonts.insert("f1".into(), "F1_1".into());
        let ctx = Context::new(&config, &project, &detector, Some(&renames));
        assert_eq!(ctx.font_alias("f1"), "F1_1");
        assert_eq!(ctx.font_alias("f2"), "F2");
    }

    #[test]
    fn test_routine_queue_deduplicates() {
        let config = ConverterConfig::default();
        let project = Project::default();
        let detector = MalformedDetector::default();
        let mut ctx = Context::new(&config, &project, &detector, None);
        ctx.request_routine("BIG");
        ctx.request_routine("OTHER");
        ctx.request_routine("BIG");
        assert_eq!(ctx.take_routine().as_deref(), Some("BIG"));
        assert_eq!(ctx.take_routine().as_deref(), Some("OTHER"));
        assert_eq!(ctx.take_routine(), None);
    }

    #[test]
    fn test_inline_guard() {
        let config = ConverterConfig::default();
        let project = Project::default();
        let detector = MalformedDetector::default();
        let mut ctx = Context::new(&config, &project, &detector, None);
        assert!(ctx.enter_inline("A"));
        assert!(!ctx.enter_inline("A"));
        ctx.leave_inline();
        assert!(ctx.enter_inline("A"));
    }

    #[test]
    fn test_outline_open_close() {
        let config = ConverterConfig::default();
        let project = Project::default();
        let detector = MalformedDetector::default();
        let mut ctx = Context::new(&config, &project, &detector, None);
        assert!(ctx.ensure_outline());
        assert!(!ctx.ensure_outline());
        ctx.close_outline();
        assert_eq!(
            ctx.out.lines(),
            &["", "OUTLINE", "    POSITION LEFT NEXT", "    DIRECTION ACROSS;", "", "ENDIO;"]
        );
    }
}
