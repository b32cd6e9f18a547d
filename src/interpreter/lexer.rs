use logos::Logos;

/// Represents a lexical token in the source input.
///
/// Unlike most lexers, whitespace and newlines are emitted as real tokens:
/// the grammar is whitespace-sensitive (`print a b` passes two arguments,
/// `a[0]` indexes while `a [0]` does not), so the parser needs to see them.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    /// Numeric literal tokens such as `42` or `3.14`. The raw lexeme is kept
    /// and parsed with a decimal float parser later on.
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    NumLit(String),
    /// String literal tokens such as `"abc"`. No escape sequences; the
    /// surrounding quotes are stripped.
    #[regex(r#""[^"\n]*""#, |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    StringLit(String),
    /// Identifier tokens; variable or function names such as `x` or `print`.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    /// `if`
    #[token("if")]
    If,
    /// `else`
    #[token("else")]
    Else,
    /// `end`
    #[token("end")]
    End,
    /// `while`
    #[token("while")]
    While,
    /// `for`
    #[token("for")]
    For,
    /// `range`
    #[token("range")]
    Range,
    /// `break`
    #[token("break")]
    Break,
    /// `return`
    #[token("return")]
    Return,
    /// `func`
    #[token("func")]
    Func,
    /// `on`
    #[token("on")]
    On,
    /// `true`
    #[token("true")]
    True,
    /// `false`
    #[token("false")]
    False,
    /// `num`
    #[token("num")]
    Num,
    /// `string`
    #[token("string")]
    String,
    /// `bool`
    #[token("bool")]
    Bool,
    /// `any`
    #[token("any")]
    Any,
    /// `and`
    #[token("and")]
    And,
    /// `or`
    #[token("or")]
    Or,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`
    #[token("*")]
    Asterisk,
    /// `/`
    #[token("/")]
    Slash,
    /// `==`
    #[token("==")]
    Eq,
    /// `!=`
    #[token("!=")]
    NotEq,
    /// `<`
    #[token("<")]
    Lt,
    /// `>`
    #[token(">")]
    Gt,
    /// `<=`
    #[token("<=")]
    LtEq,
    /// `>=`
    #[token(">=")]
    GtEq,
    /// `!`
    #[token("!")]
    Bang,
    /// `:=`
    #[token(":=")]
    Declare,
    /// `=`
    #[token("=")]
    Assign,
    /// `:`
    #[token(":")]
    Colon,
    /// `.`
    #[token(".")]
    Dot,
    /// `...`
    #[token("...")]
    Ellipsis,
    /// `,`
    #[token(",")]
    Comma,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `{`
    #[token("{")]
    LCurly,
    /// `}`
    #[token("}")]
    RCurly,
    /// `// Comments.` Emitted rather than skipped; the parser treats a
    /// comment as end of line.
    #[regex(r"//[^\n]*")]
    Comment,
    /// A run of spaces or tabs, merged into a single significant token.
    #[regex(r"[ \t\f]+")]
    Whitespace,
    /// A line break.
    #[regex(r"\r?\n")]
    NewLine,
    /// Any character no other rule recognizes. The lexer is total: it emits
    /// this token and keeps going rather than failing.
    #[regex(r".", |lex| lex.slice().to_string(), priority = 0)]
    Illegal(String),
    /// End of input. The NUL pattern keeps the scanner total; `tokenize`
    /// appends the real terminator.
    #[token("\0")]
    Eof,
}

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    /// The line number, starting at 1.
    pub line:   usize,
    /// The column number within the line, starting at 1.
    pub column: usize,
}

/// A token paired with the position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Tok {
    /// The token itself.
    pub token: Token,
    /// Where the token begins in the source.
    pub pos:   Pos,
}

impl Token {
    /// Returns the source text this token stands for. Payload-carrying tokens
    /// return their lexeme, fixed tokens their spelling.
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::NumLit(lit) | Self::Ident(lit) | Self::Illegal(lit) => lit.clone(),
            Self::StringLit(lit) => format!("\"{lit}\""),
            Self::If => "if".to_string(),
            Self::Else => "else".to_string(),
            Self::End => "end".to_string(),
            Self::While => "while".to_string(),
            Self::For => "for".to_string(),
            Self::Range => "range".to_string(),
            Self::Break => "break".to_string(),
            Self::Return => "return".to_string(),
            Self::Func => "func".to_string(),
            Self::On => "on".to_string(),
            Self::True => "true".to_string(),
            Self::False => "false".to_string(),
            Self::Num => "num".to_string(),
            Self::String => "string".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Any => "any".to_string(),
            Self::And => "and".to_string(),
            Self::Or => "or".to_string(),
            Self::Plus => "+".to_string(),
            Self::Minus => "-".to_string(),
            Self::Asterisk => "*".to_string(),
            Self::Slash => "/".to_string(),
            Self::Eq => "==".to_string(),
            Self::NotEq => "!=".to_string(),
            Self::Lt => "<".to_string(),
            Self::Gt => ">".to_string(),
            Self::LtEq => "<=".to_string(),
            Self::GtEq => ">=".to_string(),
            Self::Bang => "!".to_string(),
            Self::Declare => ":=".to_string(),
            Self::Assign => "=".to_string(),
            Self::Colon => ":".to_string(),
            Self::Dot => ".".to_string(),
            Self::Ellipsis => "...".to_string(),
            Self::Comma => ",".to_string(),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::LBracket => "[".to_string(),
            Self::RBracket => "]".to_string(),
            Self::LCurly => "{".to_string(),
            Self::RCurly => "}".to_string(),
            Self::Comment => "//".to_string(),
            Self::Whitespace => " ".to_string(),
            Self::NewLine => "\n".to_string(),
            Self::Eof => String::new(),
        }
    }

    /// Formats the token for diagnostics: quoted lexeme for most tokens,
    /// bare digits for number literals, and prose for the invisible ones.
    #[must_use]
    pub fn format_details(&self) -> String {
        match self {
            Self::NumLit(lit) => lit.clone(),
            Self::NewLine => "end of line".to_string(),
            Self::Eof => "end of input".to_string(),
            Self::Whitespace => "whitespace".to_string(),
            _ => format!("'{}'", self.literal()),
        }
    }

    /// Returns the token kind name used by the `tokenize` dump.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::NumLit(_) => "NUM_LIT",
            Self::StringLit(_) => "STRING_LIT",
            Self::Ident(_) => "IDENT",
            Self::If => "IF",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::While => "WHILE",
            Self::For => "FOR",
            Self::Range => "RANGE",
            Self::Break => "BREAK",
            Self::Return => "RETURN",
            Self::Func => "FUNC",
            Self::On => "ON",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Num => "NUM",
            Self::String => "STRING",
            Self::Bool => "BOOL",
            Self::Any => "ANY",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Asterisk => "ASTERISK",
            Self::Slash => "SLASH",
            Self::Eq => "EQ",
            Self::NotEq => "NOT_EQ",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::LtEq => "LTEQ",
            Self::GtEq => "GTEQ",
            Self::Bang => "BANG",
            Self::Declare => "DECLARE",
            Self::Assign => "ASSIGN",
            Self::Colon => "COLON",
            Self::Dot => "DOT",
            Self::Ellipsis => "ELLIPSIS",
            Self::Comma => "COMMA",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBracket => "LBRACKET",
            Self::RBracket => "RBRACKET",
            Self::LCurly => "LCURLY",
            Self::RCurly => "RCURLY",
            Self::Comment => "COMMENT",
            Self::Whitespace => "WS",
            Self::NewLine => "NL",
            Self::Eof => "EOF",
            Self::Illegal(_) => "ILLEGAL",
        }
    }
}

/// Tokenizes an entire source string into an eager token vector.
///
/// The result always ends with a single [`Token::Eof`]. Comments are dropped,
/// whitespace runs and newlines are kept, and unrecognized characters become
/// [`Token::Illegal`] so that lexing never fails.
///
/// # Example
/// ```
/// use quill::interpreter::lexer::{Token, tokenize};
///
/// let toks = tokenize("a := 1");
/// assert_eq!(toks[0].token, Token::Ident("a".to_string()));
/// assert_eq!(toks.last().unwrap().token, Token::Eof);
/// assert_eq!(toks[2].pos.column, 3);
/// ```
#[must_use]
pub fn tokenize(source: &str) -> Vec<Tok> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    let mut line = 1;
    let mut line_start = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = result.unwrap_or_else(|()| Token::Illegal(lexer.slice().to_string()));
        let pos = Pos { line,
                        column: span.start - line_start + 1, };
        if token == Token::NewLine {
            line += 1;
            line_start = span.end;
        }
        tokens.push(Tok { token, pos });
    }

    tokens.push(Tok { token: Token::Eof,
                      pos:   Pos { line,
                                   column: source.len() - line_start + 1, }, });
    tokens
}

/// Renders a token vector as the human-readable dump printed by the
/// `tokenize` subcommand: one `line:column KIND [literal]` entry per line.
#[must_use]
pub fn dump(tokens: &[Tok]) -> String {
    let mut out = String::new();
    for tok in tokens {
        out.push_str(&format!("{}:{} {}", tok.pos.line, tok.pos.column, tok.token.kind_name()));
        match &tok.token {
            Token::NumLit(_) | Token::StringLit(_) | Token::Ident(_) | Token::Illegal(_) => {
                out.push(' ');
                out.push_str(&tok.token.literal());
            },
            _ => {},
        }
        out.push('\n');
    }
    out
}
