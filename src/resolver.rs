//! Font and color alias conflict resolution
//!
//! A primary document and its sub-forms share one output namespace. The
//! document keeps its aliases; a sub-form alias that collides with one
//! already in use is renamed to `ALIAS_N` and the rename is recorded in the
//! sub-form's [`RenameTable`](crate::models::RenameTable).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{info, warn};

use crate::models::{Project, SubForm};

/// Which alias table a rename applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Font,
    Color,
}

/// One alias renamed inside a sub-form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub form: String,
    pub kind: AliasKind,
    pub from: String,
    pub to: String,
}

/// Tracks used aliases and the next suffix for each base name.
#[derive(Debug, Default)]
struct Namespace {
    used: BTreeSet<String>,
    counters: HashMap<String, usize>,
}

impl Namespace {
    fn new<'a>(aliases: impl IntoIterator<Item = &'a String>) -> Self {
        Self { used: aliases.into_iter().cloned().collect(), counters: HashMap::new() }
    }

    /// Claim `alias`, returning the name actually assigned.
    fn claim(&mut self, alias: &str) -> String {
        if self.used.insert(alias.to_string()) {
            return alias.to_string();
        }
        loop {
            let counter = self.counters.entry(alias.to_string()).or_insert(0);
            *counter += 1;
            let candidate = format!("{}_{}", alias, counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Re-key `table` through `namespace`, returning the old-to-new mapping.
fn resolve_table<T>(
    namespace: &mut Namespace,
    table: &mut BTreeMap<String, T>,
    set_alias: impl Fn(&mut T, &str),
) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();
    let entries = std::mem::take(table);
    for (alias, mut def) in entries {
        let assigned = namespace.claim(&alias);
        if assigned != alias {
            set_alias(&mut def, &assigned);
        }
        table.insert(assigned.clone(), def);
        mapping.insert(alias, assigned);
    }
    mapping
}

fn record(form: &SubForm, kind: AliasKind, mapping: &BTreeMap<String, String>, renames: &mut Vec<Rename>) {
    for (from, to) in mapping.iter().filter(|(from, to)| from != to) {
        warn!(form = %form.file_name, "{:?} alias conflict: renamed {} to {}", kind, from, to);
        renames.push(Rename { form: form.file_name.clone(), kind, from: from.clone(), to: to.clone() });
    }
}

/// Resolve alias conflicts across a project, in place.
///
/// Sub-forms are sorted by file name first so renames are stable across runs.
pub fn resolve_conflicts(project: &mut Project) -> Vec<Rename> {
    project.forms.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut fonts = Namespace::new(project.document.fonts.keys());
    let mut colors = Namespace::new(project.document.colors.keys());
    let mut renames = Vec::new();

    for form in &mut project.forms {
        info!("Resolving alias conflicts for FRM: {}", form.file_name);
        let font_map = resolve_table(&mut fonts, &mut form.fonts, |font, alias| font.alias = alias.to_string());
        let color_map =
            resolve_table(&mut colors, &mut form.colors, |color, alias| color.alias = alias.to_string());
        record(form, AliasKind::Font, &font_map, &mut renames);
        record(form, AliasKind::Color, &color_map, &mut renames);
        form.renames.fonts = font_map;
        form.renames.colors = color_map;
    }
    renames
}
