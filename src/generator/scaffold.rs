//! Fixed program sections of a primary-document translation
//!
//! Everything around the per-case sections: header, input and output
//! formats, the page layout group, font and color declarations, the main
//! record loop, stub sections and the initialization docformats.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::command::{walk, AssignOp, Command, CommandKind};
use crate::models::{Metadata, Project};

use super::context::{Context, DEFAULT_FONTS};
use super::position::py_float;
use super::text::initial_value;
use super::walker::walk_commands;

pub const BANNER: &str = "/* Generated by vipp2dfa - Xerox FreeFlow VIPP to Papyrus DocDEF converter */";

/// Colors every program declares
const REQUIRED_COLORS: &[&str] = &["FBLACK", "LMED", "MED", "XDRK"];

/// Page-management commands that only matter inside a conditional
const PAGE_COMMANDS: &[&str] = &["PAGEBRK", "NEWFRAME", "ADD", "BOOKMARK"];

/// Layout commands that make a case worth a section
const LAYOUT_COMMANDS: &[&str] = &["SETLSP", "SETFORM", "SETPAGEDEF", "SETLKF"];

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn delimiter_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"\((.)\)\s+SETDBSEP")
}

fn line_spacing_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"(\d+(?:\.\d+)?)\s+SETLSP")
}

fn page_layout_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &CELL,
        r"\[\s*\[\s*(\d+(?:\.\d+)?)\s+(\d+(?:\.\d+)?)\s+\d+(?:\.\d+)?\s+\d+(?:\.\d+)?\s+\d+\s*\]\s*\]",
    )
}

fn prefix_reference_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"(?i)PREFIX\s+(?:eq|ne|gt|lt|ge|le)\s+\(([A-Z0-9]+)\)")
}

/// Papyrus face for a VIPP font name.
pub fn font_face(name: &str) -> &str {
    match name {
        "ARIAL" => "Arial",
        "ARIALB" => "Arial Bold",
        "ARIALO" => "Arial Italic",
        "ARIALBO" => "Arial Bold Italic",
        "COURIER" => "Courier New",
        "COURIERB" => "Courier New Bold",
        "COURIERO" => "Courier New Italic",
        "COURIERBO" => "Courier New Bold Italic",
        "HELVETICA" | "HELVE" => "Helvetica",
        "HELVEB" => "Helvetica Bold",
        "TIMES" => "Times New Roman",
        "TIMESB" => "Times New Roman Bold",
        "TIMESI" => "Times New Roman Italic",
        "TIMESBI" => "Times New Roman Bold Italic",
        "NZDB" => "NZDB",
        other => other,
    }
}

/// RGB for a VIPP color name; unknown names are black.
pub fn color_rgb(name: &str) -> (u8, u8, u8) {
    match name {
        "WHITE" => (255, 255, 255),
        "RED" => (255, 0, 0),
        "GREEN" => (0, 255, 0),
        "BLUE" => (0, 0, 255),
        "YELLOW" => (255, 255, 0),
        "CYAN" => (0, 255, 255),
        "MAGENTA" => (255, 0, 255),
        "ORANGE" => (255, 165, 0),
        "GRAY" => (128, 128, 128),
        "LIGHTGRAY" => (192, 192, 192),
        "DARKGRAY" => (64, 64, 64),
        "LMED" | "MED" => (217, 217, 217),
        "XDRK" => (166, 166, 166),
        _ => (0, 0, 0),
    }
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn conversion_date() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    civil_date((secs / 86_400) as i64)
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_date(days: i64) -> String {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// `/* Original ...: */` lines for the metadata that is present.
pub fn metadata_lines(ctx: &mut Context, metadata: &Metadata) {
    let fields = [
        ("Title", &metadata.title),
        ("Creator", &metadata.creator),
        ("Date", &metadata.creation_date),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            ctx.out.line(format!("/* Original {}: {} */", label, value));
        }
    }
}

pub fn header(ctx: &mut Context, date: &str) {
    let project = ctx.project;
    let document = &project.document;
    ctx.out.line(BANNER);
    ctx.out.line(format!("/* Source: {} */", document.file_name));
    ctx.out.line(format!("/* Conversion Date: {} */", date));
    ctx.out.blank();
    if document.metadata != Metadata::default() {
        metadata_lines(ctx, &document.metadata);
        ctx.out.blank();
    }
    ctx.out.line(format!("DOCDEF {};", document.docdef_name()));
    ctx.out.blank();
}

pub fn formats(ctx: &mut Context) {
    let input = &ctx.config.input;
    let input_lines = [
        format!("CODE {}", input.code_page),
        "RECORD-FORMAT VARPC".to_string(),
        "RECORD-DELIMITER X'0D0A'".to_string(),
        format!("RECORD-LENGTH {}", input.record_length),
        format!("CHANNEL-CODE {} NOBREAKREPEAT", input.channel_code),
        "TABLE-REF-CODE NO".to_string(),
        "DECIMAL-SEPARATOR '.'".to_string(),
        "CACHELIMIT 100;".to_string(),
    ];
    ctx.out.line("/* Input format specification */");
    ctx.out.line("APPLICATION-INPUT-FORMAT");
    ctx.out.indent();
    for line in input_lines {
        ctx.out.line(line);
    }
    ctx.out.dedent();
    ctx.out.blank();

    ctx.out.line("/* Output format specification */");
    ctx.out.line("APPLICATION-OUTPUT-FORMAT");
    ctx.out.indent();
    for line in ["CODE 1200", "AFPLRECL 8192", "PTXUNIT 1440", "FDFINCLUDE YES", "TLE YES", "ACIFINDEX NO;"] {
        ctx.out.line(line);
    }
    ctx.out.dedent();
    ctx.out.blank();
    ctx.out.line("DEFINEPDFOUTPUT PDFOUT;");
    ctx.out.blank();
}

/// Sort rank of a sub-form by its name suffix.
fn form_priority(name: &str) -> u32 {
    if name.ends_with("_TNC") {
        2
    } else if name.ends_with('S') {
        0
    } else if name.ends_with("F3") {
        3
    } else if name.ends_with('F') {
        1
    } else if name.ends_with("B2") {
        5
    } else if name.ends_with('B') {
        4
    } else {
        99
    }
}

/// Sub-form format names in page-cycling order.
pub fn form_order(project: &Project) -> Vec<String> {
    let mut names: Vec<String> = project.forms.iter().map(|f| f.format_name()).collect();
    names.sort_by(|a, b| {
        let key = |name: &String| {
            let base = name.rsplit_once('_').map_or(name.as_str(), |(base, _)| base).to_string();
            (form_priority(name), base, name.clone())
        };
        key(a).cmp(&key(b))
    });
    names
}

fn logical_page(ctx: &mut Context, number: u32, forms: &[String]) {
    let mut lines: Vec<String> = [
        format!("LOGICALPAGE {}", number),
        "    SIDE FRONT".to_string(),
        "    POSITION 0 0".to_string(),
        "    WIDTH 210 MM".to_string(),
        "    HEIGHT 297 MM".to_string(),
        "    DIRECTION ACROSS".to_string(),
        "    FOOTER".to_string(),
        "        PP = PP + 1;".to_string(),
        "    FOOTEREND".to_string(),
        "    PRINTFOOTER".to_string(),
        "        P = P + 1;".to_string(),
        String::new(),
        "        /* Cycle through FRM files */".to_string(),
    ]
    .into();
    for (idx, name) in forms.iter().enumerate() {
        lines.push(format!("      IF P=={}; THEN; USE FORMAT {} EXTERNAL; ENDIF;", idx + 1, name));
    }
    if let Some(first) = forms.first() {
        lines.push(format!("      IF P>{}; THEN; P=1; USE FORMAT {} EXTERNAL; ENDIF;", forms.len(), first));
    }
    lines.extend(
        [
            "",
            "        /* Page numbering */",
            "        OUTLINE",
            "            POSITION RIGHT (0 MM)",
            "            DIRECTION ACROSS;",
            "            OUTPUT 'Page '!P!' of '!PP",
            "                FONT F5_1",
            "                POSITION (RIGHT-11 MM)286 MM",
            "                ALIGN RIGHT NOPAD;",
            "        ENDIO;",
            "    PRINTEND;",
        ]
        .iter()
        .map(|l| l.to_string()),
    );
    for line in lines {
        ctx.out.line(line);
    }
}

pub fn format_group(ctx: &mut Context) {
    let forms = form_order(ctx.project);
    ctx.out.line("/* Page Layout - FORMATGROUP */");
    ctx.out.line("FORMATGROUP MAIN;");
    ctx.out.indent();
    for line in ["SHEET", "    WIDTH 210 MM", "    HEIGHT 297 MM;", "LAYER 1;"] {
        ctx.out.line(line);
    }
    logical_page(ctx, 1, &forms);
    ctx.out.blank();
    logical_page(ctx, 2, &forms);
    ctx.out.dedent();
    ctx.out.blank();
}

pub fn fonts(ctx: &mut Context) {
    let project = ctx.project;
    let declared: BTreeMap<String, (String, f64)> = project
        .document
        .fonts
        .values()
        .chain(project.forms.iter().flat_map(|f| f.fonts.values()))
        .map(|font| {
            let alias = font.alias.trim_start_matches('/').to_ascii_uppercase();
            let face = font_face(font.face.trim_start_matches('/')).to_string();
            let size = if font.size > 0.0 { font.size } else { 10.0 };
            (alias, (face, size))
        })
        .collect();

    ctx.out.line("/* Font Definitions */");
    for (alias, (face, size)) in &declared {
        ctx.out.line(format!("FONT {} NOTDEF AS '{}' DBCS ROTATION 0 HEIGHT {};", alias, face, py_float(*size)));
    }
    for (alias, face, size) in DEFAULT_FONTS {
        if !declared.contains_key(*alias) {
            ctx.out.line(format!("FONT {} NOTDEF AS '{}' DBCS ROTATION 0 HEIGHT {};", alias, face, py_float(*size)));
        }
    }
    ctx.out.blank();
}

pub fn colors(ctx: &mut Context) {
    let project = ctx.project;
    let declared: BTreeMap<String, String> = project
        .document
        .colors
        .values()
        .chain(project.forms.iter().flat_map(|f| f.colors.values()))
        .map(|color| {
            let alias = color.alias.trim_start_matches('/').to_ascii_uppercase();
            (alias, color.name.trim_start_matches('/').to_ascii_uppercase())
        })
        .collect();

    ctx.out.line("/* Color Definitions */");
    let required = REQUIRED_COLORS.iter().filter(|alias| !declared.contains_key(**alias));
    let all = declared.iter().map(|(a, n)| (a.as_str(), n.as_str())).chain(required.map(|a| (*a, *a)));
    for (alias, name) in all {
        let (r, g, b) = color_rgb(name);
        ctx.out.line(format!("COLOR {} AS RGB {} {} {};", alias, r, g, b));
    }
    ctx.out.blank();
}

/// Field delimiter from `(c) SETDBSEP`, else the configured default.
pub fn delimiter(ctx: &Context) -> String {
    delimiter_pattern()
        .and_then(|p| p.captures(&ctx.project.document.raw))
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| ctx.config.input.default_delimiter.clone())
}

/// The delimiter as a DocDEF string literal.
fn separator_literal(delimiter: &str) -> String {
    if delimiter == "'" {
        "\"'\"".to_string()
    } else {
        format!("'{}'", delimiter)
    }
}

/// First SETLSP value of the prologue, else the first in the raw text.
fn line_spacing(ctx: &Context) -> Option<String> {
    let mut found = None;
    walk(&ctx.project.document.prologue, &mut |command| {
        if found.is_none() {
            if let CommandKind::Generic { name, args } = &command.kind {
                if name == "SETLSP" {
                    found = args.first().cloned();
                }
            }
        }
    });
    found.or_else(|| {
        let captures = line_spacing_pattern()?.captures(&ctx.project.document.raw)?;
        Some(captures[1].to_string())
    })
}

/// Origin of the last `[[x y w h n]]` page definition, truncated to whole millimetres.
fn page_layout(raw: &str) -> Option<(i64, i64)> {
    let captures = page_layout_pattern()?.captures_iter(raw).last()?;
    let x = captures[1].parse::<f64>().ok()?;
    let y = captures[2].parse::<f64>().ok()?;
    Some((x as i64, y as i64))
}

fn record_input(ctx: &mut Context, record: &str) {
    ctx.out.line(format!("RECORD {}", record));
    ctx.out.indent();
    ctx.out.line("REPEAT 1;");
    ctx.out.line("VARIABLE LINE1 SCALAR NOSPACE START 1;");
    ctx.out.dedent();
    ctx.out.line("ENDIO;");
}

pub fn main_format(ctx: &mut Context) {
    ctx.out.line("/* Main document format */");
    ctx.out.line("DOCFORMAT THEMAIN;");
    ctx.out.indent();
    ctx.out.line("MARGIN TOP 0 MM BOTTOM 0 MM LEFT 0 MM RIGHT 0 MM;");
    match line_spacing(ctx) {
        Some(spacing) => ctx.out.line(format!("SETUNITS LINESP {} MM;", spacing)),
        None => ctx.out.line("SETUNITS LINESP AUTO;"),
    }
    ctx.out.blank();
    if let Some((x, y)) = page_layout(&ctx.project.document.raw) {
        ctx.out.line("/* Page layout position from SETPAGEDEF */");
        ctx.out.line("OUTLINE PAGELAYOUT");
        ctx.out.indent();
        ctx.out.line(format!("POSITION {} MM {} MM;", x, y));
        ctx.out.dedent();
        ctx.out.line("ENDIO;");
        ctx.out.blank();
    }
    ctx.out.dedent();

    let separator = ctx.config.input.document_separator.clone();
    let sep = separator_literal(&delimiter(ctx));

    ctx.out.line("/* Main processing loop - reads one record per iteration */");
    ctx.out.line("FOR N REPEAT 1;");
    ctx.out.indent();
    record_input(ctx, "INPUTREC");
    ctx.out.blank();
    ctx.out.line(format!("IF LINE1<>'{}';", separator));
    ctx.out.line("THEN;");
    ctx.out.indent();
    let then_lines = [
        "/* Reset counter to continue processing */".to_string(),
        "N = 0;".to_string(),
        String::new(),
        "/* Delimiter for field extraction */".to_string(),
        format!("&SEP = {};", sep),
        String::new(),
        "/* Split line into fields using EXTRACTALL */".to_string(),
        "D = EXTRACTALL(FLD, LINE1, &SEP, '');".to_string(),
        String::new(),
        "/* Extract PREFIX for format routing */".to_string(),
        "PREFIX = FLD[1];".to_string(),
        String::new(),
        "/* Create scalar variables FLD0, FLD1, FLD2... from array */".to_string(),
        "FOR I REPEAT MAXINDEX(FLD)-1;".to_string(),
        "    {&FIELDS[I]} = FLD[I+1];".to_string(),
        "ENDFOR;".to_string(),
        String::new(),
        "/* Route to appropriate format based on PREFIX */".to_string(),
        "USE FORMAT REFERENCE('DF_'!PREFIX);".to_string(),
        String::new(),
        "/* Reset Field Names/Number */".to_string(),
        "D = CLEAR(FLD);".to_string(),
    ];
    for line in then_lines {
        ctx.out.line(line);
    }
    ctx.out.dedent();
    ctx.out.line("ELSE;");
    ctx.out.indent();
    ctx.out.line("/* Here the output of the document... */");
    ctx.out.line("ENDGROUP 'DOC';");
    ctx.out.blank();
    ctx.out.line("/* Check if next record is EOF only */");
    record_input(ctx, "INPUTREC");
    ctx.out.blank();
    ctx.out.line("IF LINE1<>'%%EOF'; THEN;");
    ctx.out.indent();
    ctx.out.line("SKIPRECORD -1;");
    ctx.out.dedent();
    ctx.out.line("ENDIF;");
    ctx.out.blank();
    ctx.out.line("ENDDOCUMENT;");
    ctx.out.dedent();
    ctx.out.line("ENDIF;");
    ctx.out.dedent();
    ctx.out.line("ENDFOR;");
    ctx.out.blank();
}

/// True when a case body does anything a DOCFORMAT is needed for.
pub fn should_generate(commands: &[Command]) -> bool {
    let mut has_conditional = false;
    let mut has_page_command = false;
    let mut needed = false;
    walk(commands, &mut |command| {
        match &command.kind {
            CommandKind::TextOutput(_) | CommandKind::DrawBox { .. } | CommandKind::ResourceCall(_) => needed = true,
            CommandKind::NewLine { .. } | CommandKind::Move { .. } => needed = true,
            CommandKind::Assignment(assignment) => match assignment.op {
                AssignOp::Increment | AssignOp::Decrement => needed = true,
                AssignOp::Set => {
                    let value = assignment.value.as_deref().unwrap_or_default();
                    needed |= matches!(value, "++" | "--") || value.eq_ignore_ascii_case("PREFIX");
                }
            },
            CommandKind::Conditional { .. } => has_conditional = true,
            CommandKind::Generic { name, .. } => {
                let name = name.as_str();
                needed |= LAYOUT_COMMANDS.contains(&name) || matches!(name, "GETINTV" | "SUBSTR" | "GETITEM");
                has_page_command |= PAGE_COMMANDS.contains(&name);
            }
            _ => {}
        }
    });
    needed || (has_conditional && has_page_command)
}

/// One `DF_` section per case that needs one. Returns the generated keys.
pub fn case_formats(ctx: &mut Context) -> BTreeSet<String> {
    let project = ctx.project;
    let mut generated = BTreeSet::new();
    ctx.out.line("/* Individual DOCFORMAT sections for each record type */");
    ctx.out.blank();
    for case in &project.document.cases {
        if case.is_default() || !should_generate(&case.commands) {
            continue;
        }
        let name = format!("DF_{}", case.key);
        ctx.registry.insert(case.key.clone(), name.clone());
        ctx.begin_section(20.0, 40.0);
        ctx.out.line(format!("DOCFORMAT {};", name));
        ctx.out.indent();
        walk_commands(ctx, &case.commands);
        ctx.out.dedent();
        ctx.out.blank();
        generated.insert(case.key.clone());
    }
    ctx.out.line("/* END OF INDIVIDUAL DOCFORMATS */");
    ctx.out.blank();
    generated
}

/// `SR_` sections for every subroutine too large to inline, including
/// those requested while writing other `SR_` sections.
pub fn routine_formats(ctx: &mut Context, x: f64, y: f64) {
    let project = ctx.project;
    let mut any = false;
    while let Some(name) = ctx.take_routine() {
        let Some(body) = project.subroutine(&name) else {
            continue;
        };
        any = true;
        ctx.begin_section(x, y);
        ctx.enter_inline(&name);
        ctx.out.line(format!("DOCFORMAT SR_{};", name));
        ctx.out.indent();
        walk_commands(ctx, body);
        ctx.out.dedent();
        ctx.out.blank();
        ctx.leave_inline();
    }
    if any {
        ctx.out.line("/* END OF SUBROUTINE DOCFORMATS */");
        ctx.out.blank();
    }
}

/// Record-type keys compared against PREFIX anywhere in the source.
pub fn referenced_prefixes(raw: &str) -> BTreeSet<String> {
    let Some(pattern) = prefix_reference_pattern() else {
        return BTreeSet::new();
    };
    pattern.captures_iter(raw).map(|c| c[1].to_ascii_uppercase()).collect()
}

/// Placeholder sections for referenced record types with no section.
pub fn stubs(ctx: &mut Context, generated: &BTreeSet<String>) {
    let missing: Vec<String> = referenced_prefixes(&ctx.project.document.raw)
        .into_iter()
        .filter(|key| !generated.contains(key))
        .collect();
    if missing.is_empty() {
        return;
    }
    ctx.out.line("/* Stub DOCFORMATs for undefined PREFIX cases */");
    ctx.out.blank();
    for key in missing {
        ctx.out.line(format!("DOCFORMAT DF_{};", key));
        ctx.out.indent();
        ctx.out.line(format!("/* {} Prefix not found or commented out */", key));
        ctx.out.line("/* Add implementation here */");
        ctx.out.dedent();
        ctx.out.line("ENDFORMAT;");
        ctx.out.blank();
    }
    ctx.out.line("/* END OF STUB DOCFORMATS */");
    ctx.out.blank();
}

/// Statements run once before the first document.
fn initialization_lines(prologue: &[Command]) -> Vec<String> {
    let mut lines = Vec::new();
    walk(prologue, &mut |command| match &command.kind {
        CommandKind::Assignment(assignment) if assignment.initial && assignment.op == AssignOp::Set => {
            let name = assignment.target.trim_start_matches('/');
            match &assignment.value {
                Some(value) if name != "VARINI" => lines.push(format!("{} = {};", name, initial_value(value))),
                _ => {}
            }
        }
        CommandKind::Generic { name, args } => match name.as_str() {
            "SETUNIT" if args.first().is_some_and(|unit| unit.eq_ignore_ascii_case("MM")) => {
                lines.push(String::new());
                lines.push("/* Page layout settings */".to_string());
                lines.push("SETUNITS MM;".to_string());
            }
            "SETLSP" => {
                if let Some(spacing) = args.first() {
                    lines.push(format!("SETUNITS LINESP {} MM;", spacing));
                }
            }
            "ORITL" | "PORT" | "LAND" => lines.push(format!("/* Orientation: {} */", name)),
            _ => {}
        },
        _ => {}
    });
    lines
}

pub fn before_first_doc(ctx: &mut Context) {
    let calibration = &ctx.config.calibration;
    let mut corrections: Vec<String> =
        calibration.font_bands.iter().map(|band| format!("{} = {};", band.variable(), band.offset)).collect();
    corrections.push(format!("&CORSEGMENT = {};", calibration.segment_correction));
    let init = initialization_lines(&ctx.project.document.prologue);
    let sep = separator_literal(&delimiter(ctx));

    ctx.out.line("/* Initialize variables */");
    ctx.out.line("DOCFORMAT $_BEFOREFIRSTDOC;");
    ctx.out.indent();
    for line in ["/* Current page */", "PP = 0;", "/* Total pages */", "TP = 0;", ""] {
        ctx.out.line(line);
    }
    ctx.out.line("/* Correction for Xerox position */");
    ctx.out.line("/* Correction = ($SL_MAXY - $SL_MINY)/4 */");
    for line in corrections {
        ctx.out.line(line);
    }
    ctx.out.blank();
    ctx.out.line("/* Variable Initialization from DBM */");
    ctx.out.blank();
    for line in init {
        ctx.out.line(line);
    }
    ctx.out.blank();

    ctx.out.line("/* Read data header */");
    ctx.out.line(format!("&SEP = {};", sep));
    ctx.out.line("FOR I");
    ctx.out.indent();
    ctx.out.line("REPEAT 1;");
    record_input(ctx, "DATAHEADER");
    ctx.out.blank();
    ctx.out.line("/* Field (Standard) Names: FLD1, FLD2, etc. */");
    ctx.out.line("IF LEFT(LINE1, 7, '') == 'PREFIX|'; THEN;");
    ctx.out.indent();
    ctx.out.line("LINE1 = CHANGE(LINE1, 'PREFIX|', '');");
    ctx.out.line("D = EXTRACTALL(&FIELDS, LINE1, &SEP, '');");
    ctx.out.line("IF &FIELDS[MAXINDEX(&FIELDS)] == ''; THEN;");
    ctx.out.indent();
    ctx.out.line("&MAXFIELDS = MAXINDEX(&FIELDS) - 1;");
    ctx.out.dedent();
    ctx.out.line("ELSE;");
    ctx.out.indent();
    ctx.out.line("&MAXFIELDS = MAXINDEX(&FIELDS);");
    ctx.out.dedent();
    ctx.out.line("ENDIF;");
    ctx.out.dedent();
    ctx.out.line("ELSE;");
    ctx.out.indent();
    ctx.out.line("I = 0;");
    ctx.out.blank();
    ctx.out.line("/* Separator */");
    ctx.out.line("IF POS('SETDBSEP', LINE1, 1); THEN;");
    ctx.out.indent();
    ctx.out.line("POS1 = POS('(', LINE1, 1);");
    ctx.out.line("POS2 = POS(')', LINE1, 1);");
    ctx.out.line("&SEP = SUBSTR(LINE1, POS1+1, POS2-POS1-1, '');");
    ctx.out.dedent();
    ctx.out.line("ENDIF;");
    ctx.out.blank();
    ctx.out.line("/* Procedure to be called */");
    ctx.out.line("IF POS('SETPROJECT', LINE1, 1); THEN;");
    ctx.out.indent();
    ctx.out.line("/* Starting position for the second parenthesis... */");
    ctx.out.line("POS1 = POS('(', LINE1, 4);");
    ctx.out.line("POS2 = POS(')', LINE1, POS1+1);");
    ctx.out.line("&PROCEDURE = SUBSTR(LINE1, POS1+1, POS2-POS1-1, '');");
    ctx.out.dedent();
    ctx.out.line("ENDIF;");
    ctx.out.dedent();
    ctx.out.line("ENDIF;");
    ctx.out.dedent();
    ctx.out.line("ENDFOR;");
    ctx.out.dedent();
    ctx.out.blank();
}

pub fn before_doc(ctx: &mut Context) {
    ctx.out.line("/* Per-document initialization */");
    ctx.out.line("DOCFORMAT $_BEFOREDOC;");
    ctx.out.indent();
    let lines = [
        "P = 0;     /* Reset page counter for new document */",
        "PP = 0;    /* Reset total page counter */",
        "",
        "/* Transaction description counter (undeclared variable) */",
        "VAR_COUNTTD = 0;",
        "",
        "/* Undeclared variables - incorrect values for BOXes */",
        "VAR = MM(40);",
        "Y5 = MM(40);",
        "Y3 = MM(40);",
    ];
    for line in lines {
        ctx.out.line(line);
    }
    ctx.out.dedent();
    ctx.out.blank();
    ctx.out.line("/* END OF DOCDEF FILE */");
}
