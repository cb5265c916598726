//! Source-unit loading
//!
//! Reads `.dbm` and `.frm` files, tokenizes and parses them, and collects the
//! declarations (fonts, colors, variables, subroutines) and record-type case
//! blocks into [`PrimaryDocument`] and [`SubForm`] values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::command::{walk, AssignOp, Command, CommandKind};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::models::{CaseBlock, ColorDef, FontDef, Metadata, PrimaryDocument, SubForm, VariableDef};
use crate::parser::{collect_block, parse_significant, ParseWarning};

/// Error type for source loading
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(PathBuf),
}

/// Which kind of VIPP source a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Document,
    Form,
}

/// A loaded source file
#[derive(Debug, Clone)]
pub enum SourceUnit {
    Document(PrimaryDocument),
    Form(SubForm),
}

/// Font size used when an INDEXFONT size is not a number
const FALLBACK_FONT_SIZE: f64 = 10.0;

/// Decode file bytes as UTF-8, falling back to Latin-1.
pub fn decode_source(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Read a source file from disk.
pub fn read_source(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    Ok(decode_source(&bytes))
}

/// Classify by extension, then by the presence of `STARTDBM`.
pub fn detect_kind(path: &Path, content: &str) -> UnitKind {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("dbm") => UnitKind::Document,
        Some("frm") => UnitKind::Form,
        _ if content.contains("STARTDBM") => UnitKind::Document,
        _ => UnitKind::Form,
    }
}

/// Load and parse one source file.
pub fn load_unit(path: &Path) -> Result<SourceUnit, LoadError> {
    let content = read_source(path)?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(match detect_kind(path, &content) {
        UnitKind::Document => SourceUnit::Document(build_document(&file_name, &content)),
        UnitKind::Form => SourceUnit::Form(build_form(&file_name, &content)),
    })
}

/// Tokenize and drop whitespace, logging lexical problems.
fn significant_tokens(file_name: &str, content: &str) -> Vec<Token> {
    let (tokens, lex_warnings) = tokenize(content);
    for warning in &lex_warnings {
        warn!(file = file_name, "{}", warning);
    }
    tokens.into_iter().filter(|t| !t.is_trivia()).collect()
}

fn report_parse_warnings(file_name: &str, warnings: &[ParseWarning]) {
    for warning in warnings {
        debug!(file = file_name, "{}", warning);
    }
    if !warnings.is_empty() {
        info!(file = file_name, count = warnings.len(), "Parser recovered from malformed input");
    }
}

/// Build a primary document from `.dbm` source text.
pub fn build_document(file_name: &str, content: &str) -> PrimaryDocument {
    info!("Parsing as DBM: {}", file_name);
    let tokens = significant_tokens(file_name, content);
    let mut warnings = Vec::new();

    let mut document = PrimaryDocument {
        file_name: file_name.to_string(),
        raw: content.to_string(),
        metadata: extract_metadata(&tokens),
        ..Default::default()
    };
    let (prefixes, fields) = extract_wizvar(&tokens);
    document.wizvar_prefixes = prefixes;
    document.wizvar_fields = fields;

    let regions = split_case_region(&tokens);
    let mut prologue = parse_significant(&regions.outside, &mut warnings);
    for block in &regions.unlabeled {
        prologue.extend(parse_significant(block, &mut warnings));
    }
    for (key, body) in regions.labeled {
        let commands = parse_significant(&body, &mut warnings);
        insert_case(&mut document.cases, CaseBlock { key, commands });
    }
    add_dispatch_cases(&mut document.cases, &prologue);

    document.variables = collect_variables(&prologue);
    document.prologue = prologue;

    let mut all: Vec<&[Command]> = vec![document.prologue.as_slice()];
    all.extend(document.cases.iter().map(|c| c.commands.as_slice()));
    let declarations = collect_declarations(&all);
    document.fonts = declarations.fonts;
    document.colors = declarations.colors;
    document.subroutines = declarations.subroutines;

    report_parse_warnings(file_name, &warnings);
    debug!(
        file = file_name,
        cases = document.cases.len(),
        fonts = document.fonts.len(),
        colors = document.colors.len(),
        "Document structure loaded"
    );
    document
}

/// Build a sub-form from `.frm` source text.
pub fn build_form(file_name: &str, content: &str) -> SubForm {
    info!("Parsing as FRM: {}", file_name);
    let tokens = significant_tokens(file_name, content);
    let mut warnings = Vec::new();

    let whole = parse_significant(&tokens, &mut warnings);
    let commands = match form_block(&tokens) {
        Some(range) => parse_significant(&tokens[range], &mut Vec::new()),
        None => whole.clone(),
    };
    let declarations = collect_declarations(&[whole.as_slice(), commands.as_slice()]);

    report_parse_warnings(file_name, &warnings);
    SubForm {
        file_name: file_name.to_string(),
        raw: content.to_string(),
        metadata: extract_metadata(&tokens),
        fonts: declarations.fonts,
        colors: declarations.colors,
        bats: declarations.bats,
        commands,
        subroutines: declarations.subroutines,
        renames: Default::default(),
    }
}

/// Read `%%Title:`, `%%Creator:` and `%%CreationDate:` from the first 20 tokens.
pub fn extract_metadata(tokens: &[Token]) -> Metadata {
    let mut metadata = Metadata::default();
    for token in tokens.iter().take(20).filter(|t| t.kind == TokenKind::Comment) {
        let value = |tag: &str| token.text.split_once(tag).map(|(_, rest)| rest.trim().to_string());
        if let Some(title) = value("%%Title:") {
            metadata.title = Some(title);
        } else if let Some(creator) = value("%%Creator:") {
            metadata.creator = Some(creator);
        } else if let Some(date) = value("%%CreationDate:") {
            metadata.creation_date = Some(date);
        }
    }
    metadata
}

/// Field declarations between `%%WIZVAR:BEGIN` and `%%WIZVAR:END`.
///
/// Names starting with `PREFIX` are record prefixes, the rest are fields.
pub fn extract_wizvar(tokens: &[Token]) -> (Vec<String>, Vec<String>) {
    let mut prefixes = Vec::new();
    let mut fields = Vec::new();
    let mut inside = false;

    for token in tokens.iter().filter(|t| t.kind == TokenKind::Comment) {
        if token.text.contains("%%WIZVAR:BEGIN") {
            inside = true;
        } else if token.text.contains("%%WIZVAR:END") {
            inside = false;
        } else if inside && token.text.contains("%%WIZVAR") {
            let line = token.text.replace("%%WIZVAR", "");
            let line = line.trim().trim_start_matches(':');
            for name in line.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if name.starts_with("PREFIX") {
                    prefixes.push(name.to_string());
                } else {
                    fields.push(name.to_string());
                }
            }
        }
    }
    (prefixes, fields)
}

#[derive(Debug, Default)]
struct CaseRegions {
    outside: Vec<Token>,
    unlabeled: Vec<Vec<Token>>,
    labeled: Vec<(String, Vec<Token>)>,
}

/// A `(LABEL)` string usable as a case key: no spaces and no dots.
fn case_label(token: &Token) -> Option<String> {
    if token.kind != TokenKind::String {
        return None;
    }
    let inner = token.text.strip_prefix('(')?.strip_suffix(')')?;
    (!inner.contains(' ') && !inner.contains('.')).then(|| inner.to_string())
}

/// Separate the `CASE PREFIX ... ENDCASE` region from the rest of the file.
fn split_case_region(tokens: &[Token]) -> CaseRegions {
    let mut regions = CaseRegions::default();
    let mut in_region = false;
    let mut labeled_any = false;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        if !in_region {
            if token.is_word("CASE") && tokens.get(i + 1).is_some_and(|t| t.is_word("PREFIX")) {
                in_region = true;
                i += 2;
                continue;
            }
            regions.outside.push(token.clone());
            i += 1;
            continue;
        }

        if token.is_word("ENDCASE") {
            in_region = false;
            labeled_any = false;
            i += 1;
        } else if let Some(label) = case_label(token) {
            labeled_any = true;
            let open = tokens[i + 1..].iter().position(|t| t.is_delimiter("{")).map(|p| p + i + 1);
            match open {
                Some(open) => {
                    let (range, end) = collect_block(tokens, open);
                    regions.labeled.push((label, tokens[range].to_vec()));
                    i = end + 1;
                }
                None => {
                    regions.labeled.push((label, Vec::new()));
                    i = tokens.len();
                }
            }
        } else if token.is_delimiter("{") {
            if tokens.get(i + 1).is_some_and(|t| t.is_delimiter("}")) {
                regions.labeled.push(("{}".to_string(), Vec::new()));
                i += 2;
            } else {
                let (range, end) = collect_block(tokens, i);
                if labeled_any {
                    debug!(line = token.line, "Unlabeled block after case labels parsed as prologue");
                }
                regions.unlabeled.push(tokens[range].to_vec());
                i = end + 1;
            }
        } else {
            i += 1;
        }
    }
    regions
}

/// Insert or replace by key, keeping the first position.
fn insert_case(cases: &mut Vec<CaseBlock>, case: CaseBlock) {
    match cases.iter_mut().find(|c| c.key == case.key) {
        Some(existing) => *existing = case,
        None => cases.push(case),
    }
}

/// A top-level `PREFIX eq (XX) { ... } IF` defines case `XX` when none exists.
fn add_dispatch_cases(cases: &mut Vec<CaseBlock>, prologue: &[Command]) {
    let Ok(pattern) = Regex::new(r"^PREFIX\s+eq\s+\(([A-Za-z0-9_]+)\)$") else {
        return;
    };
    for command in prologue {
        let CommandKind::Conditional { condition, body: Some(body) } = &command.kind else {
            continue;
        };
        if body.is_empty() {
            continue;
        }
        let Some(key) = pattern.captures(&condition.join(" ")).map(|c| c[1].to_string()) else {
            continue;
        };
        if cases.iter().all(|c| c.key != key) {
            debug!(case = %key, "Case defined by dispatch conditional");
            cases.push(CaseBlock { key, commands: body.clone() });
        }
    }
}

fn collect_variables(prologue: &[Command]) -> Vec<VariableDef> {
    let mut variables: Vec<VariableDef> = Vec::new();
    for command in prologue {
        let CommandKind::Assignment(assign) = &command.kind else { continue };
        if assign.op != AssignOp::Set {
            continue;
        }
        let variable = VariableDef {
            name: assign.target.trim_start_matches('/').to_string(),
            value: assign.value.clone().unwrap_or_default(),
            initial: assign.initial,
        };
        match variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => variables.push(variable),
        }
    }
    variables
}

#[derive(Debug, Default)]
struct Declarations {
    fonts: BTreeMap<String, FontDef>,
    colors: BTreeMap<String, ColorDef>,
    bats: BTreeMap<String, String>,
    subroutines: BTreeMap<String, Vec<Command>>,
}

fn strip_slash(text: &str) -> String {
    text.trim_start_matches('/').to_string()
}

/// Collect INDEXFONT, INDEXCOLOR, INDEXBAT and XGFRESDEF anywhere in the trees.
fn collect_declarations(trees: &[&[Command]]) -> Declarations {
    let mut declarations = Declarations::default();
    for tree in trees {
        walk(tree, &mut |command| match &command.kind {
            CommandKind::Generic { name, args } if name == "INDEXFONT" && args.len() == 3 => {
                let alias = strip_slash(&args[0]);
                let size = args[2].parse::<f64>().unwrap_or(FALLBACK_FONT_SIZE);
                let font = FontDef { alias: alias.clone(), face: strip_slash(&args[1]), size };
                declarations.fonts.insert(alias, font);
            }
            CommandKind::Generic { name, args } if name == "INDEXCOLOR" && args.len() == 2 => {
                let alias = strip_slash(&args[0]);
                let color = ColorDef { alias: alias.clone(), name: strip_slash(&args[1]) };
                declarations.colors.insert(alias, color);
            }
            CommandKind::Generic { name, args } if name == "INDEXBAT" && args.len() == 2 => {
                declarations.bats.insert(strip_slash(&args[0]), strip_slash(&args[1]));
            }
            CommandKind::Definition { name, body } => {
                declarations.subroutines.insert(name.clone(), body.clone());
            }
            _ => {}
        });
    }
    declarations
}

/// The `{` block marked by a `Begin Form` comment within the next four tokens.
///
/// Only the first comment after a brace is checked.
fn form_block(tokens: &[Token]) -> Option<std::ops::Range<usize>> {
    let start = tokens.iter().enumerate().position(|(i, token)| {
        token.is_delimiter("{")
            && tokens[i + 1..]
                .iter()
                .take(4)
                .find(|t| t.kind == TokenKind::Comment)
                .is_some_and(|c| c.text.contains("Begin Form"))
    })?;
    let (range, _) = collect_block(tokens, start);
    Some(range)
}
