//! Condition translation
//!
//! VIPP conditions arrive as atoms already folded by the parser
//! (`VAR_A eq (X)`). They are split back into operands, cleaned of
//! definition keywords, and rewritten with DocDEF operators.

use super::text::term;

/// Keywords that can leak into a condition from surrounding definitions
const FILTERED: &[&str] = &["INDEXBAT", "INDEXFONT", "INDEXCOLOR", "SETUNIT", "MM", "CM", "INCH", "null"];

/// Relational operators that make a condition need `ISTRUE()`
const RELATIONAL: &[&str] = &["==", "<>", ">", "<", ">=", "<="];

/// A translated condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Statements emitted before the IF (`++`/`--` side effects)
    pub hoisted: Vec<String>,
    pub expression: String,
    pub relational: bool,
}

impl Condition {
    /// The `IF ...;` line.
    pub fn if_line(&self) -> String {
        if self.expression.trim().is_empty() {
            "IF 1;".to_string()
        } else if self.relational {
            format!("IF ISTRUE({});", self.expression)
        } else {
            format!("IF {};", self.expression)
        }
    }
}

fn comparison(op: &str) -> Option<&'static str> {
    match op.to_ascii_lowercase().as_str() {
        "eq" => Some("=="),
        "ne" => Some("<>"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "le" => Some("<="),
        "ge" => Some(">="),
        _ => None,
    }
}

fn logical(op: &str) -> Option<&'static str> {
    match op.to_ascii_lowercase().as_str() {
        "and" => Some("AND"),
        "or" => Some("OR"),
        "not" => Some("NOT"),
        _ => None,
    }
}

fn is_operator(atom: &str) -> bool {
    comparison(atom).is_some() || logical(atom).is_some()
}

/// Fold postfix `A B and` into `A and B`.
fn fold_logical(atoms: &[String]) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    for atom in atoms {
        let is_binary = matches!(atom.to_ascii_lowercase().as_str(), "and" | "or");
        let foldable =
            stack.len() >= 2 && stack[stack.len() - 2..].iter().all(|operand| !is_operator(operand));
        if is_binary && foldable {
            let right = stack.pop().unwrap_or_default();
            let left = stack.pop().unwrap_or_default();
            stack.push(format!("{} {} {}", left, atom, right));
        } else {
            stack.push(atom.clone());
        }
    }
    stack
}

/// Split on whitespace outside parentheses.
pub fn split_operands(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// `FRLEFT t op` or `FRLEFT op t`: remaining frame space compared to a threshold.
fn frame_left(params: &[String]) -> Option<String> {
    let idx = params.iter().position(|p| p == "FRLEFT")?;
    let (first, second) = (params.get(idx + 1)?, params.get(idx + 2)?);
    let is_op = |p: &str| matches!(p.to_ascii_lowercase().as_str(), "lt" | "<" | "gt" | ">" | "ge" | ">=" | "le" | "<=");
    let (threshold, op) = if is_op(first) { (second, first) } else { (first, second) };
    let test = match op.to_ascii_lowercase().as_str() {
        "lt" | "<" => ">",
        "gt" | ">" => "<",
        "ge" | ">=" => "<=",
        "le" | "<=" => ">=",
        _ => return None,
    };
    Some(format!("$SL_MAXY{}$LP_HEIGHT-MM({})", test, threshold))
}

/// Rewrite operators; wrap string-compared variables in `NOSPACE()`.
fn convert_operators(params: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(params.len());
    for (i, param) in params.iter().enumerate() {
        let Some(op) = comparison(param) else {
            result.push(param.clone());
            continue;
        };
        result.push(op.to_string());
        if !matches!(op, "==" | "<>") || result.len() < 2 {
            continue;
        }
        let Some(next) = params.get(i + 1) else { continue };
        let prev_idx = result.len() - 2;
        let prev = &result[prev_idx];
        let literal_next = next.starts_with('\'') || next.to_ascii_uppercase() == *next;
        let variable_prev = prev.starts_with("VAR_") || prev.starts_with("FLD[");
        if literal_next && variable_prev && !prev.starts_with("NOSPACE(") {
            result[prev_idx] = format!("NOSPACE({})", prev);
        }
    }
    result
}

/// Translate condition atoms.
pub fn convert(atoms: &[String]) -> Condition {
    let joined = fold_logical(atoms).join(" ");
    let mut hoisted = Vec::new();
    let mut params: Vec<String> = Vec::new();
    for param in split_operands(&joined) {
        if FILTERED.contains(&param.as_str()) {
            continue;
        }
        match param.as_str() {
            "++" | "--" => {
                if let Some(var) = params.pop() {
                    let var = var.trim_start_matches('/').to_string();
                    let sign = if param == "++" { '+' } else { '-' };
                    hoisted.push(format!("{} = {} {} 1;", var, var, sign));
                }
            }
            _ => params.push(param),
        }
    }

    if let Some(expression) = frame_left(&params) {
        return Condition { hoisted, expression, relational: true };
    }

    let expression = convert_operators(&params)
        .iter()
        .map(|p| match logical(p) {
            Some(word) => word.to_string(),
            None => term(p),
        })
        .collect::<Vec<_>>()
        .join(" ");
    let relational = RELATIONAL.iter().any(|op| expression.contains(op));
    Condition { hoisted, expression, relational }
}
