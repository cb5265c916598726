//! Lossless tokenizer for VIPP source text
//!
//! Every byte of the input ends up in exactly one token, so concatenating the
//! token texts reproduces the source. Whitespace and unrecognized characters
//! are kept as their own token kinds; the parser skips them.

use tracing::warn;

/// Words that classify an identifier as a [`TokenKind::Keyword`].
pub const KEYWORDS: &[&str] = &[
    "XGF", "ENDXGF", "SETPROJECT", "ENDJOB", "STARTDBM", "ENDCASE", "BEGINDOCUMENT",
    "ENDDOCUMENT", "CASE", "PREFIX", "ENDPAGE", "BEGINPAGE", "FSHOW", "SETPARAMS", "SETUNIT",
    "SETFTSW", "SETSUB", "SETVARS", "SETVAR", "SETINFO", "IF", "ELSE", "ENDIF", "FOR", "ENDFOR",
    "WHILE", "ENDWHILE", "REPEAT", "BREAK", "CONTINUE", "GOTO", "INDEXFONT", "INDEXCOLOR",
    "INDEXBAT", "XGFRESDEF", "SETPAGESIZE", "SETLSP", "SETPAGENUMBER", "SETPAGEDEF", "SETLKF",
    "SETFORM", "MOVETO", "MOVEH", "LINETO", "NL", "ORITL", "PORT", "LAND", "SHL", "SHR", "SHC",
    "SHP", "CACHE", "ICALL", "SCALL", "DRAWB", "MM", "CM", "INCH", "POINT",
];

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    /// `/NAME` reference
    Variable,
    /// Quoted or parenthesized literal, delimiters included
    String,
    Number,
    Operator,
    Delimiter,
    Comment,
    Whitespace,
    Unknown,
}

/// A lexical token with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column of the first character
    pub column: usize,
    /// Byte offset into the source
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self { kind, text: text.into(), line, column, offset: 0 }
    }

    /// True for tokens the parser ignores entirely.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Unknown)
    }

    pub fn is_delimiter(&self, text: &str) -> bool {
        self.kind == TokenKind::Delimiter && self.text == text
    }

    /// True for identifiers and keywords spelled `word`.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self.kind, TokenKind::Keyword | TokenKind::Identifier) && self.text == word
    }
}

/// A recoverable lexical problem
#[derive(Debug, Clone, PartialEq)]
pub struct LexWarning {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for LexWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// Returns true if `word` is a reserved VIPP word (case-insensitive).
pub fn is_keyword(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    KEYWORDS.contains(&upper.as_str())
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

const TWO_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||", "++", "--"];

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    warnings: Vec<LexWarning>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn byte_at(&self, pos: usize) -> usize {
        self.chars.get(pos).map(|&(b, _)| b).unwrap_or(self.source.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek(0) {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }

    fn warn(&mut self, message: &str, line: usize, column: usize) {
        warn!(line, column, "{}", message);
        self.warnings.push(LexWarning { message: message.to_string(), line, column });
    }

    fn run(mut self) -> (Vec<Token>, Vec<LexWarning>) {
        while let Some(c) = self.peek(0) {
            let start = self.pos;
            let (line, column) = (self.line, self.column);
            let kind = self.scan(c, line, column);
            let (offset, end) = (self.byte_at(start), self.byte_at(self.pos));
            let text = &self.source[offset..end];
            let kind = kind.classify(text);
            self.tokens.push(Token { kind, text: text.to_string(), line, column, offset });
        }
        (self.tokens, self.warnings)
    }

    fn scan(&mut self, c: char, line: usize, column: usize) -> TokenKind {
        match c {
            c if c.is_whitespace() => {
                self.bump_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '/' if self.peek(1) == Some('*') => self.block_comment(line, column),
            '/' if self.peek(1).is_some_and(is_ident_char) => {
                self.bump();
                self.bump_while(is_ident_char);
                TokenKind::Variable
            }
            '%' => {
                self.bump_while(|c| c != '\n');
                TokenKind::Comment
            }
            '\'' | '"' => self.quoted(c, line, column),
            '(' => self.vipp_string(line, column),
            '0'..='9' => self.number(),
            '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
            c if is_ident_start(c) => {
                self.bump_while(is_ident_char);
                TokenKind::Identifier
            }
            '[' | ']' | '{' | '}' | ',' | ';' | ':' | ')' => {
                self.bump();
                TokenKind::Delimiter
            }
            '+' | '-' | '*' | '/' | '=' | '!' | '<' | '>' | '&' | '|' => {
                let pair: String = [Some(c), self.peek(1)].iter().flatten().collect();
                self.bump();
                if TWO_CHAR_OPERATORS.contains(&pair.as_str()) {
                    self.bump();
                }
                TokenKind::Operator
            }
            _ => {
                self.bump();
                TokenKind::Unknown
            }
        }
    }

    fn block_comment(&mut self, line: usize, column: usize) -> TokenKind {
        self.bump();
        self.bump();
        loop {
            match self.peek(0) {
                None => {
                    self.warn("Unterminated block comment", line, column);
                    break;
                }
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        TokenKind::Comment
    }

    fn quoted(&mut self, quote: char, line: usize, column: usize) -> TokenKind {
        self.bump();
        loop {
            match self.bump() {
                None => {
                    self.warn("Unterminated string literal", line, column);
                    break;
                }
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => break,
                Some(_) => {}
            }
        }
        TokenKind::String
    }

    fn vipp_string(&mut self, line: usize, column: usize) -> TokenKind {
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                None => {
                    self.warn("Unterminated VIPP string", line, column);
                    break;
                }
                Some('(') => depth += 1,
                Some(')') => depth -= 1,
                Some(_) => {}
            }
        }
        TokenKind::String
    }

    fn number(&mut self) -> TokenKind {
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            self.bump_while(|c| c.is_ascii_hexdigit());
        } else {
            self.bump_while(|c| c.is_ascii_digit() || c == '.');
        }
        TokenKind::Number
    }
}

impl TokenKind {
    fn classify(self, text: &str) -> TokenKind {
        if self == TokenKind::Identifier && is_keyword(text) {
            TokenKind::Keyword
        } else {
            self
        }
    }
}

/// Tokenize VIPP source text.
///
/// Never fails: unterminated comments and literals produce a warning and a
/// token that runs to the end of the input.
///
/// # Examples
///
/// ```
/// use vipp2dfa::lexer::{tokenize, TokenKind};
///
/// let (tokens, warnings) = tokenize("/VAR_A (Hello) SETVAR");
/// assert!(warnings.is_empty());
/// assert_eq!(tokens[0].kind, TokenKind::Variable);
/// assert_eq!(tokens[2].text, "(Hello)");
/// assert_eq!(tokens[4].kind, TokenKind::Keyword);
/// ```
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexWarning>) {
    Lexer::new(source).run()
}
