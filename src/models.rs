//! Data model for parsed VIPP source units
//!
//! A [`Project`] is one primary document (`.dbm`) together with the sub-forms
//! (`.frm`) that share its output namespace.

use std::collections::BTreeMap;
use std::path::Path;

use crate::command::Command;

/// `/ALIAS /FACE size INDEXFONT`
#[derive(Debug, Clone, PartialEq)]
pub struct FontDef {
    pub alias: String,
    pub face: String,
    pub size: f64,
}

/// `/ALIAS NAME INDEXCOLOR`
#[derive(Debug, Clone, PartialEq)]
pub struct ColorDef {
    pub alias: String,
    pub name: String,
}

/// Top-level `/NAME value SETVAR`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub value: String,
    pub initial: bool,
}

/// `%%Title:`, `%%Creator:` and `%%CreationDate:` header comments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub creation_date: Option<String>,
}

/// One record-type section of a primary document
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBlock {
    /// Record-type key; `{}` is the empty default case
    pub key: String,
    pub commands: Vec<Command>,
}

impl CaseBlock {
    pub fn is_default(&self) -> bool {
        self.key == "{}"
    }
}

/// Old-to-new alias mapping recorded for a sub-form by the resolver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenameTable {
    pub fonts: BTreeMap<String, String>,
    pub colors: BTreeMap<String, String>,
}

impl RenameTable {
    pub fn font<'a>(&'a self, alias: &'a str) -> &'a str {
        self.fonts.get(alias).map(String::as_str).unwrap_or(alias)
    }

    pub fn color<'a>(&'a self, alias: &'a str) -> &'a str {
        self.colors.get(alias).map(String::as_str).unwrap_or(alias)
    }
}

/// A parsed `.dbm` file
#[derive(Debug, Clone, Default)]
pub struct PrimaryDocument {
    pub file_name: String,
    pub raw: String,
    pub metadata: Metadata,
    pub wizvar_prefixes: Vec<String>,
    pub wizvar_fields: Vec<String>,
    pub fonts: BTreeMap<String, FontDef>,
    pub colors: BTreeMap<String, ColorDef>,
    pub variables: Vec<VariableDef>,
    /// Commands outside the CASE region
    pub prologue: Vec<Command>,
    /// Case blocks in source order
    pub cases: Vec<CaseBlock>,
    /// XGFRESDEF bodies by name
    pub subroutines: BTreeMap<String, Vec<Command>>,
}

impl PrimaryDocument {
    pub fn case(&self, key: &str) -> Option<&CaseBlock> {
        self.cases.iter().find(|c| c.key == key)
    }

    /// DOCDEF name: the alphanumeric characters of the file stem.
    pub fn docdef_name(&self) -> String {
        let name: String = file_stem(&self.file_name).chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if name.is_empty() {
            "CONVERTED".to_string()
        } else {
            name
        }
    }
}

/// A parsed `.frm` file
#[derive(Debug, Clone, Default)]
pub struct SubForm {
    pub file_name: String,
    pub raw: String,
    pub metadata: Metadata,
    pub fonts: BTreeMap<String, FontDef>,
    pub colors: BTreeMap<String, ColorDef>,
    /// `/ALIAS /NAME INDEXBAT` attribute sets
    pub bats: BTreeMap<String, String>,
    /// Form body
    pub commands: Vec<Command>,
    pub subroutines: BTreeMap<String, Vec<Command>>,
    pub renames: RenameTable,
}

impl SubForm {
    /// Format name used by `USE FORMAT ... EXTERNAL`.
    pub fn format_name(&self) -> String {
        format_name(&self.file_name)
    }
}

/// A primary document and the sub-forms sharing its output namespace
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub document: PrimaryDocument,
    pub forms: Vec<SubForm>,
}

impl Project {
    pub fn new(document: PrimaryDocument, forms: Vec<SubForm>) -> Self {
        Self { document, forms }
    }

    /// Subroutine lookup across the document and every form, document first.
    pub fn subroutine(&self, name: &str) -> Option<&Vec<Command>> {
        self.document
            .subroutines
            .get(name)
            .or_else(|| self.forms.iter().find_map(|f| f.subroutines.get(name)))
    }
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Uppercased file stem restricted to alphanumerics and underscores.
pub fn format_name(file_name: &str) -> String {
    file_stem(file_name)
        .to_ascii_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
