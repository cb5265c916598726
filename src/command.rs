//! Command tree produced by the parser
//!
//! Each VIPP command family is a variant carrying only the fields that family
//! needs. The generator matches exhaustively over [`CommandKind`].

use crate::lexer::Token;

/// An operand on the parser's RPN stack
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Any pushed token text: numbers, strings, names, unit suffixes
    Literal(String),
    /// A bracketed token range, parsed later if a command needs a body
    Block(Vec<Token>),
    /// A value marked by a modifier command (VSUB, FORMAT)
    Tagged(TaggedValue),
}

/// A stack value carrying a modifier tag
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    pub text: String,
    pub tag: Tag,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// `$$NAME.` markers inside the text are substituted at output time
    Interpolate,
    /// Numeric picture pattern applied at output time, e.g. `(@@#.##)`
    Picture(String),
}

impl Operand {
    /// Flatten the operand to text. Blocks become their token texts joined by spaces.
    pub fn text(&self) -> String {
        match self {
            Operand::Literal(text) => text.clone(),
            Operand::Block(tokens) => {
                tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ")
            }
            Operand::Tagged(tagged) => tagged.text.clone(),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Operand::Block(_))
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self, Operand::Tagged(TaggedValue { tag: Tag::Interpolate, .. }))
    }
}

/// A parsed command with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub line: usize,
    pub column: usize,
}

impl Command {
    pub fn new(kind: CommandKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    /// The VIPP keyword this command was parsed from.
    pub fn name(&self) -> &str {
        match &self.kind {
            CommandKind::Conditional { .. } => "IF",
            CommandKind::Else { .. } => "ELSE",
            CommandKind::EndIf => "ENDIF",
            CommandKind::Assignment(assign) => match assign.op {
                AssignOp::Set => "SETVAR",
                AssignOp::Increment => "++",
                AssignOp::Decrement => "--",
            },
            CommandKind::TextOutput(output) => &output.keyword,
            CommandKind::ResourceCall(call) => match call.kind {
                ResourceKind::Segment => "SCALL",
                ResourceKind::Image => "ICALL",
            },
            CommandKind::Definition { .. } => "XGFRESDEF",
            CommandKind::Move { y: Some(_), .. } => "MOVETO",
            CommandKind::Move { y: None, .. } => "MOVEH",
            CommandKind::NewLine { .. } => "NL",
            CommandKind::DrawBox { .. } => "DRAWB",
            CommandKind::SetFont(_) => "SETFONT",
            CommandKind::SetColor(_) => "SETCOLOR",
            CommandKind::Generic { name, .. } => name,
        }
    }

    /// Nested command lists owned by this command.
    pub fn children(&self) -> impl Iterator<Item = &Vec<Command>> {
        let body = match &self.kind {
            CommandKind::Conditional { body, .. } | CommandKind::Else { body } => body.as_ref(),
            CommandKind::Definition { body, .. } => Some(body),
            _ => None,
        };
        body.into_iter()
    }

    /// True when this command writes something onto the page.
    pub fn is_output(&self) -> bool {
        matches!(
            self.kind,
            CommandKind::TextOutput(_)
                | CommandKind::NewLine { .. }
                | CommandKind::DrawBox { .. }
                | CommandKind::ResourceCall(_)
        ) || self.name() == "SETLSP"
    }
}

/// Command families
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// `cond {body} IF` or `IF cond {body}`; `body` is `None` for the flat form
    /// where the branch follows as sibling commands up to ELSE/ENDIF.
    Conditional { condition: Vec<String>, body: Option<Vec<Command>> },
    Else { body: Option<Vec<Command>> },
    EndIf,
    Assignment(Assignment),
    TextOutput(TextOutput),
    ResourceCall(ResourceCall),
    /// `/NAME {body} XGFRESDEF`
    Definition { name: String, body: Vec<Command> },
    /// MOVETO carries both coordinates, MOVEH only `x`
    Move { x: String, y: Option<String> },
    NewLine { amount: Option<String> },
    /// `x y width height style DRAWB`
    DrawBox { args: Vec<String> },
    SetFont(String),
    SetColor(String),
    Generic { name: String, args: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Increment,
    Decrement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub op: AssignOp,
    pub target: String,
    pub value: Option<String>,
    /// Marked `/INI`: only assigned once, before the first document
    pub initial: bool,
}

/// SH, SHL, SHR, SHr, SHC and SHP
#[derive(Debug, Clone, PartialEq)]
pub struct TextOutput {
    pub keyword: String,
    pub source: String,
    pub interpolate: bool,
    pub picture: Option<String>,
    /// SHP column width
    pub width: Option<String>,
    /// SHP alignment code (0 left, 1 right, 2 center, 3 justify)
    pub align: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Segment,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCall {
    pub kind: ResourceKind,
    pub name: String,
    /// Extra operands such as an ICALL scale factor
    pub args: Vec<String>,
}

/// Visit every command in a tree, depth first.
pub fn walk<'a>(commands: &'a [Command], visit: &mut impl FnMut(&'a Command)) {
    for command in commands {
        visit(command);
        for body in command.children() {
            walk(body, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn cmd(kind: CommandKind) -> Command {
        Command::new(kind, 1, 1)
    }

    #[test]
    fn test_block_operand_text() {
        let block = Operand::Block(vec![
            Token::new(TokenKind::Variable, "/A", 1, 1),
            Token::new(TokenKind::Number, "1", 1, 4),
        ]);
        assert_eq!(block.text(), "/A 1");
        assert!(block.is_block());
    }

    #[test]
    fn test_names() {
        assert_eq!(cmd(CommandKind::Move { x: "1".into(), y: None }).name(), "MOVEH");
        assert_eq!(cmd(CommandKind::Move { x: "1".into(), y: Some("2".into()) }).name(), "MOVETO");
        let inc = Assignment { op: AssignOp::Increment, target: "V".into(), value: None, initial: false };
        assert_eq!(cmd(CommandKind::Assignment(inc)).name(), "++");
    }

    #[test]
    fn test_walk_visits_nested_bodies() {
        let inner = cmd(CommandKind::NewLine { amount: None });
        let tree = vec![cmd(CommandKind::Conditional {
            condition: vec!["A".into()],
            body: Some(vec![inner]),
        })];
        let mut names = Vec::new();
        walk(&tree, &mut |c| names.push(c.name().to_string()));
        assert_eq!(names, vec!["IF", "NL"]);
    }

    #[test]
    fn test_is_output() {
        assert!(cmd(CommandKind::NewLine { amount: None }).is_output());
        assert!(cmd(CommandKind::Generic { name: "SETLSP".into(), args: vec![] }).is_output());
        assert!(!cmd(CommandKind::SetFont("F1".into())).is_output());
    }
}
