//! RPN command-tree builder
//!
//! VIPP is postfix: operands are pushed onto a stack and a command keyword
//! pops the operands it needs. Bracketed ranges are captured whole as block
//! operands and parsed recursively when a command takes a body. Control flow
//! also appears in prefix form (`IF cond { ... } ENDIF`), mostly in forms.

use std::ops::Range;

use tracing::debug;

use crate::command::{
    AssignOp, Assignment, Command, CommandKind, Operand, ResourceCall, ResourceKind, Tag,
    TaggedValue, TextOutput,
};
use crate::lexer::{Token, TokenKind};

/// Fixed-arity commands emitted as [`CommandKind::Generic`]
const GENERIC_ARITY: &[(&str, usize)] = &[
    ("SETFORM", 1),
    ("SETLKF", 1),
    ("SETPAGEDEF", 1),
    ("SETPARAMS", 1),
    ("NEWFRAME", 0),
    ("PAGEBRK", 0),
    ("SKIPPAGE", 0),
    ("NEWFRONT", 0),
    ("NEWBACK", 0),
    ("INDEXFONT", 3),
    ("INDEXCOLOR", 2),
    ("INDEXBAT", 2),
    ("FOR", 0),
    ("ENDFOR", 0),
    ("BOOKMARK", 1),
    ("SETPAGENUMBER", 5),
    ("CLIP", 4),
    ("ENDCLIP", 0),
    ("GETINTV", 4),
    ("GETITEM", 2),
    ("SETUNIT", 1),
    ("SETLSP", 1),
    ("ORITL", 0),
    ("PORT", 0),
    ("LAND", 0),
    ("SETFTSW", 2),
    ("ADD", 0),
];

/// Commands with bespoke stack handling
const SPECIAL_COMMANDS: &[&str] = &[
    "SH", "SHL", "SHR", "SHr", "SHC", "SHP", "MOVETO", "MOVEH", "NL", "SETVAR", "++", "--",
    "DRAWB", "SCALL", "ICALL", "CACHE", "XGFRESDEF", "IF", "ELSE", "ENDIF", "VSUB", "FORMAT",
    "eq", "ne", "lt", "gt", "le", "ge",
];

pub const COMPARISONS: &[&str] = &["eq", "ne", "lt", "gt", "le", "ge"];

const UNITS: &[&str] = &["MM", "CM", "INCH", "POINT"];

const COLOR_LETTERS: &[&str] = &["R", "B", "W", "G", "C", "M", "Y", "K"];

/// A structural problem the parser recovered from
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// Result of parsing a token stream
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub commands: Vec<Command>,
    pub warnings: Vec<ParseWarning>,
}

/// Returns true if `token` is a command keyword the parser dispatches on.
pub fn is_command(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier | TokenKind::Operator)
        && (SPECIAL_COMMANDS.contains(&token.text.as_str())
            || GENERIC_ARITY.iter().any(|(name, _)| *name == token.text))
}

/// Find the block opened at `open_idx` (`{` or `[`).
///
/// Returns the range of tokens strictly inside the brackets and the index of
/// the matching close bracket. Only brackets of the same type are counted.
/// An unbalanced block runs to the end of the slice and the returned end index
/// is `tokens.len()`.
pub fn collect_block(tokens: &[Token], open_idx: usize) -> (Range<usize>, usize) {
    let open = tokens[open_idx].text.as_str();
    let close = if open == "[" { "]" } else { "}" };
    let mut depth = 1usize;
    let mut i = open_idx + 1;

    while i < tokens.len() {
        let token = &tokens[i];
        if token.kind == TokenKind::Delimiter {
            if token.text == open {
                depth += 1;
            } else if token.text == close {
                depth -= 1;
                if depth == 0 {
                    return (open_idx + 1..i, i);
                }
            }
        }
        i += 1;
    }

    (open_idx + 1..tokens.len(), tokens.len())
}

/// Parse a token stream into a command tree.
///
/// Whitespace and unknown tokens are dropped first. Never fails: short stacks
/// and malformed constructs produce warnings and best-effort commands.
pub fn parse_commands(tokens: &[Token]) -> ParseResult {
    let significant: Vec<Token> = tokens.iter().filter(|t| !t.is_trivia()).cloned().collect();
    let mut warnings = Vec::new();
    let commands = parse_significant(&significant, &mut warnings);
    ParseResult { commands, warnings }
}

/// Parse tokens that have already had trivia removed.
pub(crate) fn parse_significant(tokens: &[Token], warnings: &mut Vec<ParseWarning>) -> Vec<Command> {
    RpnParser { tokens, pos: 0, stack: Vec::new(), commands: Vec::new(), warnings }.run()
}

/// Fold `L R op` sequences into `L op R` atoms.
fn fold_condition(tokens: &[Token]) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    for token in tokens {
        if COMPARISONS.contains(&token.text.as_str()) && stack.len() >= 2 {
            let right = stack.pop().unwrap_or_default();
            let left = stack.pop().unwrap_or_default();
            stack.push(format!("{} {} {}", left, token.text, right));
        } else {
            stack.push(token.text.clone());
        }
    }
    stack
}

fn is_numeric(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.parse::<f64>().is_ok()
}

fn strip_name(text: &str) -> String {
    let text = text.trim_start_matches('/');
    text.strip_prefix('(').and_then(|t| t.strip_suffix(')')).unwrap_or(text).to_string()
}

struct RpnParser<'a, 'w> {
    tokens: &'a [Token],
    pos: usize,
    stack: Vec<Operand>,
    commands: Vec<Command>,
    warnings: &'w mut Vec<ParseWarning>,
}

impl<'a, 'w> RpnParser<'a, 'w> {
    fn run(mut self) -> Vec<Command> {
        let tokens = self.tokens;
        while self.pos < tokens.len() {
            let token = &tokens[self.pos];
            match token.kind {
                TokenKind::Comment => {}
                TokenKind::Delimiter if token.text == "{" || token.text == "[" => {
                    let (range, end) = collect_block(tokens, self.pos);
                    self.stack.push(Operand::Block(tokens[range].to_vec()));
                    self.pos = end + 1;
                    continue;
                }
                TokenKind::Delimiter => {}
                TokenKind::Operator if token.text == "-" && self.adjacent_number() => {
                    let number = &tokens[self.pos + 1];
                    self.stack.push(Operand::Literal(format!("-{}", number.text)));
                    self.pos += 2;
                    continue;
                }
                _ if is_command(token) => self.dispatch(token),
                TokenKind::Identifier => self.identifier(token),
                _ => self.stack.push(Operand::Literal(token.text.clone())),
            }
            self.pos += 1;
        }
        self.commands
    }

    /// A `-` immediately followed by a number with no space between them.
    fn adjacent_number(&self) -> bool {
        let minus = &self.tokens[self.pos];
        self.tokens.get(self.pos + 1).is_some_and(|next| {
            next.kind == TokenKind::Number
                && next.line == minus.line
                && next.column == minus.column + 1
        })
    }

    fn warn(&mut self, token: &Token, message: String) {
        debug!(line = token.line, "{}", message);
        self.warnings.push(ParseWarning { message, line: token.line, column: token.column });
    }

    fn emit(&mut self, token: &Token, kind: CommandKind) {
        self.commands.push(Command::new(kind, token.line, token.column));
    }

    fn pop(&mut self) -> Option<Operand> {
        self.stack.pop()
    }

    fn pop_text(&mut self) -> Option<String> {
        self.stack.pop().map(|op| op.text())
    }

    /// Pop up to `count` operands, returned in push order.
    fn pop_n(&mut self, token: &Token, count: usize) -> Vec<String> {
        if self.stack.len() < count {
            let message = format!(
                "{} expects {} operand(s), found {}",
                token.text,
                count,
                self.stack.len()
            );
            self.warn(token, message);
        }
        let start = self.stack.len().saturating_sub(count);
        self.stack.drain(start..).map(|op| op.text()).collect()
    }

    fn parse_block(&mut self, tokens: &[Token]) -> Vec<Command> {
        parse_significant(tokens, self.warnings)
    }

    fn identifier(&mut self, token: &Token) {
        let text = token.text.as_str();
        if UNITS.contains(&text.to_ascii_uppercase().as_str()) {
            self.stack.push(Operand::Literal(text.to_string()));
        } else if text.len() <= 3 && text.starts_with(['F', 'f']) && !text.eq_ignore_ascii_case("FLD") {
            self.emit(token, CommandKind::SetFont(text.to_string()));
        } else if COLOR_LETTERS.contains(&text.to_ascii_uppercase().as_str()) {
            self.emit(token, CommandKind::SetColor(text.to_ascii_uppercase()));
        } else {
            self.stack.push(Operand::Literal(text.to_string()));
        }
    }

    fn dispatch(&mut self, token: &'a Token) {
        match token.text.as_str() {
            "SH" | "SHL" | "SHR" | "SHr" | "SHC" => self.text_output(token),
            "SHP" => self.paragraph_output(token),
            "MOVETO" => {
                let args = self.pop_n(token, 2);
                let mut args = args.into_iter();
                let x = args.next().unwrap_or_default();
                let y = Some(args.next().unwrap_or_default());
                self.emit(token, CommandKind::Move { x, y });
            }
            "MOVEH" => {
                let x = self.pop_n(token, 1).pop().unwrap_or_default();
                self.emit(token, CommandKind::Move { x, y: None });
            }
            "NL" => self.new_line(token),
            "SETVAR" => self.set_var(token),
            "++" | "--" => {
                let op = if token.text == "++" { AssignOp::Increment } else { AssignOp::Decrement };
                let target = self.pop_n(token, 1).pop().unwrap_or_default();
                let assignment = Assignment { op, target, value: None, initial: false };
                self.emit(token, CommandKind::Assignment(assignment));
            }
            "DRAWB" => {
                let args = self.pop_n(token, 5);
                self.emit(token, CommandKind::DrawBox { args });
            }
            "SCALL" | "ICALL" => self.resource_call(token),
            "CACHE" => self.cache(token),
            "XGFRESDEF" => self.definition(token),
            "IF" => self.conditional(token),
            "ELSE" => self.else_branch(token),
            "ENDIF" => self.emit(token, CommandKind::EndIf),
            "VSUB" => {
                if let Some(operand) = self.pop() {
                    let tagged = TaggedValue { text: operand.text(), tag: Tag::Interpolate };
                    self.stack.push(Operand::Tagged(tagged));
                }
            }
            "FORMAT" => {
                let pattern = self.pop_text().unwrap_or_default();
                let value = self.pop_text().unwrap_or_default();
                let tagged = TaggedValue { text: value, tag: Tag::Picture(pattern) };
                self.stack.push(Operand::Tagged(tagged));
            }
            op if COMPARISONS.contains(&op) => {
                if self.stack.len() >= 2 {
                    let right = self.pop_text().unwrap_or_default();
                    let left = self.pop_text().unwrap_or_default();
                    self.stack.push(Operand::Literal(format!("{} {} {}", left, op, right)));
                } else {
                    self.stack.push(Operand::Literal(op.to_string()));
                }
            }
            name => self.generic(token, name),
        }
    }

    fn generic(&mut self, token: &Token, name: &str) {
        let arity = GENERIC_ARITY.iter().find(|(n, _)| *n == name).map(|(_, a)| *a).unwrap_or(0);
        let args = self.pop_n(token, arity);
        self.emit(token, CommandKind::Generic { name: name.to_string(), args });
        // `/R src start len GETINTV SETVAR`: the result variable was already popped
        if name == "GETINTV" && self.tokens.get(self.pos + 1).is_some_and(|t| t.text == "SETVAR") {
            self.pos += 1;
        }
    }

    fn output_from(keyword: &str, operand: Option<Operand>) -> TextOutput {
        let mut output = TextOutput {
            keyword: keyword.to_string(),
            source: String::new(),
            interpolate: false,
            picture: None,
            width: None,
            align: None,
        };
        match operand {
            Some(Operand::Tagged(TaggedValue { text, tag: Tag::Interpolate })) => {
                output.source = text;
                output.interpolate = true;
            }
            Some(Operand::Tagged(TaggedValue { text, tag: Tag::Picture(pattern) })) => {
                output.source = text;
                output.picture = Some(pattern);
            }
            Some(other) => output.source = other.text(),
            None => {}
        }
        output
    }

    fn text_output(&mut self, token: &Token) {
        if self.stack.is_empty() {
            self.warn(token, format!("{} without text operand", token.text));
        }
        let operand = self.pop();
        let output = Self::output_from(&token.text, operand);
        self.emit(token, CommandKind::TextOutput(output));
    }

    /// `(text) VSUB align SHP` or `source width align SHP`
    fn paragraph_output(&mut self, token: &Token) {
        let tagged_text = self.stack.len() >= 2 && self.stack[self.stack.len() - 2].is_interpolated();
        let align = self.pop_text();
        let width = if tagged_text { None } else { self.pop_text() };
        if self.stack.is_empty() {
            self.warn(token, "SHP without text operand".to_string());
        }
        let operand = self.pop();
        let mut output = Self::output_from("SHP", operand);
        output.width = width;
        output.align = align;
        self.emit(token, CommandKind::TextOutput(output));
    }

    fn new_line(&mut self, token: &Token) {
        let depth = self.stack.len();
        let top = self.stack.last().map(Operand::text);
        let amount = match top {
            Some(number) if depth >= 2
                && self.stack[depth - 2].text() == "-"
                && is_numeric(&number)
                && !number.starts_with('-') =>
            {
                self.stack.truncate(depth - 2);
                Some(format!("-{}", number))
            }
            Some(number) if is_numeric(&number) => {
                self.stack.pop();
                Some(number)
            }
            _ => None,
        };
        self.emit(token, CommandKind::NewLine { amount });
    }

    /// `/var value [/INI] SETVAR`
    fn set_var(&mut self, token: &Token) {
        let start = self.stack.len().saturating_sub(4);
        let params: Vec<String> = self.stack.drain(start..).map(|op| op.text()).collect();
        let initial = params.iter().any(|p| p == "/INI");
        let mut params = params.into_iter().filter(|p| p != "/INI");
        match (params.next(), params.next()) {
            (Some(target), Some(value)) => {
                let assignment = Assignment { op: AssignOp::Set, target, value: Some(value), initial };
                self.emit(token, CommandKind::Assignment(assignment));
            }
            _ => self.warn(token, "SETVAR needs a name and a value".to_string()),
        }
    }

    /// `(name) SCALL`, `(name) scale SCALL`, `(name) ICALL`
    fn resource_call(&mut self, token: &Token) {
        let kind = if token.text == "ICALL" { ResourceKind::Image } else { ResourceKind::Segment };
        let mut name = self.pop_n(token, 1).pop().unwrap_or_default();
        let mut args = Vec::new();
        let named_below = matches!(self.stack.last(), Some(Operand::Literal(t)) if t.starts_with('('));
        if is_numeric(&name) && named_below {
            args.push(name);
            name = self.pop_text().unwrap_or_default();
        }
        self.emit(token, CommandKind::ResourceCall(ResourceCall { kind, name, args }));
    }

    /// `(file) CACHE [w h]`: trailing operands are read ahead up to the next command.
    fn cache(&mut self, token: &Token) {
        let mut args: Vec<String> = self.pop_text().into_iter().collect();
        let mut ahead = self.pos + 1;
        while ahead < self.tokens.len() && ahead < self.pos + 10 && !is_command(&self.tokens[ahead]) {
            args.push(self.tokens[ahead].text.clone());
            ahead += 1;
        }
        self.emit(token, CommandKind::Generic { name: "CACHE".to_string(), args });
        self.pos = ahead - 1;
    }

    /// `/NAME { ... } XGFRESDEF`
    fn definition(&mut self, token: &Token) {
        let block = self.pop();
        let name = self.pop_text();
        match (name, block) {
            (Some(name), Some(Operand::Block(tokens))) => {
                let body = self.parse_block(&tokens);
                let name = strip_name(&name);
                self.emit(token, CommandKind::Definition { name, body });
            }
            _ => self.warn(token, "XGFRESDEF needs a name and a block".to_string()),
        }
    }

    fn conditional(&mut self, token: &'a Token) {
        if self.stack.iter().any(Operand::is_block) {
            self.postfix_conditional(token);
        } else {
            self.prefix_conditional(token);
        }
    }

    /// `cond { body } IF`: the whole stack is the condition plus its body.
    fn postfix_conditional(&mut self, token: &Token) {
        let items: Vec<Operand> = self.stack.drain(..).collect();
        let body_idx = items.iter().rposition(Operand::is_block);
        let mut condition = Vec::new();
        let mut body_tokens = None;
        for (idx, item) in items.into_iter().enumerate() {
            match item {
                Operand::Block(tokens) if Some(idx) == body_idx => body_tokens = Some(tokens),
                other => condition.push(other.text()),
            }
        }
        let body = body_tokens.map(|tokens| self.parse_block(&tokens));
        self.emit(token, CommandKind::Conditional { condition, body });
    }

    /// `IF cond { body } [ENDIF]` or the flat `IF cond` line form.
    fn prefix_conditional(&mut self, token: &'a Token) {
        let tokens = self.tokens;
        let mut j = self.pos + 1;
        let mut condition_tokens: Vec<Token> = Vec::new();
        while j < self.tokens.len()
            && self.tokens[j].line == token.line
            && !self.tokens[j].is_delimiter("{")
        {
            if self.tokens[j].kind != TokenKind::Comment {
                condition_tokens.push(self.tokens[j].clone());
            }
            j += 1;
        }
        let condition = fold_condition(&condition_tokens);

        let body = if j < tokens.len() && tokens[j].is_delimiter("{") {
            let (range, end) = collect_block(tokens, j);
            j = end + 1;
            if tokens.get(j).is_some_and(|t| t.is_word("ENDIF")) {
                j += 1;
            }
            Some(self.parse_block(&tokens[range]))
        } else {
            None
        };

        self.pos = j - 1;
        self.emit(token, CommandKind::Conditional { condition, body });
    }

    fn else_branch(&mut self, token: &Token) {
        let tokens = self.tokens;
        let body = if matches!(self.stack.last(), Some(Operand::Block(_))) {
            match self.pop() {
                Some(Operand::Block(tokens)) => Some(self.parse_block(&tokens)),
                _ => None,
            }
        } else if tokens.get(self.pos + 1).is_some_and(|t| t.is_delimiter("{")) {
            let (range, end) = collect_block(tokens, self.pos + 1);
            self.pos = end;
            Some(self.parse_block(&tokens[range]))
        } else {
            None
        };
        self.emit(token, CommandKind::Else { body });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Vec<Command> {
        parse_commands(&tokenize(source).0).commands
    }

    #[test]
    fn test_collect_block_balanced() {
        let (tokens, _) = tokenize("{ a { b } c } d");
        let (range, end) = collect_block(&tokens, 0);
        assert_eq!(tokens[end].text, "}");
        let depth: i32 = tokens[range]
            .iter()
            .map(|t| match t.text.as_str() {
                "{" => 1,
                "}" => -1,
                _ => 0,
            })
            .sum();
        assert_eq!(depth, 0);
        assert_eq!(tokens[end + 2].text, "d");
    }

    #[test]
    fn test_collect_block_unbalanced() {
        let (tokens, _) = tokenize("{ a { b }");
        let (range, end) = collect_block(&tokens, 0);
        assert_eq!(end, tokens.len());
        assert_eq!(range.end, tokens.len());
    }

    #[test]
    fn test_move_and_show() {
        let commands = parse("10 20 MOVETO (Hello) SHL");
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].kind, CommandKind::Move { x: "10".into(), y: Some("20".into()) });
        match &commands[1].kind {
            CommandKind::TextOutput(output) => {
                assert_eq!(output.keyword, "SHL");
                assert_eq!(output.source, "(Hello)");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_setvar_with_ini() {
        let commands = parse("/VAR_A 0 /INI SETVAR");
        match &commands[0].kind {
            CommandKind::Assignment(a) => {
                assert_eq!(a.target, "/VAR_A");
                assert_eq!(a.value.as_deref(), Some("0"));
                assert!(a.initial);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_setvar_short_stack_warns() {
        let result = parse_commands(&tokenize("/VAR_A SETVAR").0);
        assert!(result.commands.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_vsub_tags_operand() {
        let commands = parse("($$VAR_A. text) VSUB SH");
        match &commands[0].kind {
            CommandKind::TextOutput(output) => {
                assert!(output.interpolate);
                assert_eq!(output.source, "($$VAR_A. text)");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shp_arity_depends_on_tag() {
        let tagged = parse("($$V.) VSUB 0 SHP");
        let plain = parse("VAR_X 80 3 SHP");
        match (&tagged[0].kind, &plain[0].kind) {
            (CommandKind::TextOutput(a), CommandKind::TextOutput(b)) => {
                assert!(a.interpolate);
                assert_eq!(a.width, None);
                assert_eq!(a.align.as_deref(), Some("0"));
                assert_eq!(b.source, "VAR_X");
                assert_eq!(b.width.as_deref(), Some("80"));
                assert_eq!(b.align.as_deref(), Some("3"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_format_tags_picture() {
        let commands = parse("VAR_AMT (@@#.##) FORMAT SHR");
        match &commands[0].kind {
            CommandKind::TextOutput(output) => {
                assert_eq!(output.source, "VAR_AMT");
                assert_eq!(output.picture.as_deref(), Some("(@@#.##)"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_nl() {
        let adjacent = parse("-4 NL");
        let spaced = parse("- 4 NL");
        assert_eq!(adjacent[0].kind, CommandKind::NewLine { amount: Some("-4".into()) });
        assert_eq!(spaced[0].kind, CommandKind::NewLine { amount: Some("-4".into()) });
        assert_eq!(parse("NL")[0].kind, CommandKind::NewLine { amount: None });
    }

    #[test]
    fn test_postfix_if_with_body() {
        let commands = parse("VAR_A (X) eq { (yes) SH } IF");
        match &commands[0].kind {
            CommandKind::Conditional { condition, body } => {
                assert_eq!(condition, &vec!["VAR_A eq (X)".to_string()]);
                assert_eq!(body.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_prefix_if_with_block_skips_endif() {
        let commands = parse("IF VAR_A (X) eq { (yes) SH } ENDIF (after) SH");
        assert_eq!(commands.len(), 2);
        match &commands[0].kind {
            CommandKind::Conditional { condition, body } => {
                assert_eq!(condition, &vec!["VAR_A eq (X)".to_string()]);
                assert!(body.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_prefix_if_flat_form() {
        let commands = parse("IF VAR_A (X) eq\n/VAR_B 1 SETVAR\nELSE\n/VAR_B 2 SETVAR\nENDIF");
        let names: Vec<_> = commands.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["IF", "SETVAR", "ELSE", "SETVAR", "ENDIF"]);
        assert!(matches!(commands[0].kind, CommandKind::Conditional { body: None, .. }));
        assert!(matches!(commands[2].kind, CommandKind::Else { body: None }));
    }

    #[test]
    fn test_prefix_else_block() {
        let commands = parse("IF A { (a) SH } ELSE { (b) SH } ENDIF");
        let names: Vec<_> = commands.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["IF", "ELSE", "ENDIF"]);
        assert!(matches!(&commands[1].kind, CommandKind::Else { body: Some(b) } if b.len() == 1));
    }

    #[test]
    fn test_definition_parses_body_once() {
        let commands = parse("/LOGO { 0 0 MOVETO (x) SH } XGFRESDEF");
        match &commands[0].kind {
            CommandKind::Definition { name, body } => {
                assert_eq!(name, "LOGO");
                assert_eq!(body.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scall_with_scale() {
        let commands = parse("(LOGO) 0.5 SCALL");
        match &commands[0].kind {
            CommandKind::ResourceCall(call) => {
                assert_eq!(call.name, "(LOGO)");
                assert_eq!(call.args, vec!["0.5".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cache_reads_ahead() {
        let commands = parse("(pic.jpg) CACHE [ 120 80 ] (pic) SCALL");
        match &commands[0].kind {
            CommandKind::Generic { name, args } => {
                assert_eq!(name, "CACHE");
                assert_eq!(args, &vec!["(pic.jpg)", "[", "120", "80", "]", "(pic)"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_font_and_color_identifiers() {
        let commands = parse("F1 R FLD1 SH");
        assert_eq!(commands[0].kind, CommandKind::SetFont("F1".into()));
        assert_eq!(commands[1].kind, CommandKind::SetColor("R".into()));
        assert!(matches!(&commands[2].kind, CommandKind::TextOutput(o) if o.source == "FLD1"));
    }

    #[test]
    fn test_getintv_consumes_setvar() {
        let result = parse_commands(&tokenize("/VAR_D VAR_S 0 4 GETINTV SETVAR").0);
        assert_eq!(result.commands.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_short_stack_degrades() {
        let result = parse_commands(&tokenize("1 DRAWB").0);
        assert!(matches!(&result.commands[0].kind, CommandKind::DrawBox { args } if args.len() == 1));
        assert_eq!(result.warnings.len(), 1);
    }
}
