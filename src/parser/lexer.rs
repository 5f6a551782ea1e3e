//! Tolerant tokenizer for HCL source text.
//!
//! The lexer never fails. Problems (unterminated strings, heredocs or block
//! comments, stray characters) are emitted as [`TokenKind::Invalid`] tokens
//! so the extractor can drop the enclosing declaration and keep going.
//!
//! String templates are lexed eagerly: `${ ... }` interpolations and
//! `%{ ... }` directives become nested token lists inside a [`Template`].

/// A lexical token with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line
    pub line: usize,
    /// 1-based byte column
    pub column: usize,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    /// Quoted string or heredoc
    Str(Template),
    /// `{ } [ ] ( ) = , . : ? ;`
    Punct(char),
    /// Arithmetic, comparison, logical operators plus `=>` and `...`
    Op(&'static str),
    Newline,
    /// Lexing problem, with a message
    Invalid(String),
}

impl TokenKind {
    #[must_use]
    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Self::Punct(p) if *p == c)
    }
}

/// A string template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub segments: Vec<Segment>,
    pub heredoc: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    /// `${ ... }`
    Interpolation(Vec<Token>),
    /// `%{ ... }`
    Directive(Vec<Token>),
}

impl Template {
    /// Concatenated literal text, interpolations and directives removed.
    #[must_use]
    pub fn literal_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Interpolation(_) | Segment::Directive(_) => None,
            })
            .collect()
    }

    /// True when the template has no interpolation or directive.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }
}

/// Templates nested deeper than this inside one string are rejected.
pub const MAX_TEMPLATE_NESTING: usize = 32;

const TWO_CHAR_OPS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||", "=>"];
const ONE_CHAR_OPS: &[&str] = &["+", "-", "*", "/", "%", "!", "<", ">"];
const PUNCT: &[char] = &['{', '}', '[', ']', '(', ')', '=', ',', '.', ':', '?', ';'];

/// Tokenize a whole source file.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let (tokens, _) = lexer.lex_tokens(Mode::TopLevel);
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    TopLevel,
    /// Inside `${}` / `%{}` of a quoted string; a newline aborts
    QuotedTemplate,
    /// Inside `${}` / `%{}` of a heredoc
    HeredocTemplate,
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    line_start: usize,
    /// Exclusive end of the region being lexed
    limit: usize,
    /// `${}` / `%{}` sequences currently open
    template_depth: usize,
    /// Set when a template hit `MAX_TEMPLATE_NESTING`
    too_deep: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            limit: src.len(),
            template_depth: 0,
            too_deep: false,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.limit
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        let idx = self.pos + offset;
        if idx < self.limit {
            Some(self.bytes[idx])
        } else {
            None
        }
    }

    fn column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    /// Advance one character, tracking lines.
    fn bump(&mut self) {
        let Some(c) = self.src[self.pos..].chars().next() else {
            return;
        };
        if c == '\n' {
            self.line += 1;
            self.line_start = self.pos + 1;
        }
        self.pos += c.len_utf8();
    }

    fn bump_to(&mut self, target: usize) {
        while self.pos < target && self.pos < self.src.len() {
            self.bump();
        }
    }

    fn token(&self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        Token {
            kind,
            line,
            column,
            start,
            end: self.pos,
        }
    }

    /// Lex tokens until the region ends or, in template modes, until the
    /// closing `}` of the interpolation. Returns whether the closer was seen.
    fn lex_tokens(&mut self, mode: Mode) -> (Vec<Token>, bool) {
        let mut tokens = Vec::new();
        let mut depth = 0usize;

        loop {
            while matches!(self.peek(0), Some(b' ' | b'\t' | b'\r')) {
                self.bump();
            }
            let Some(b) = self.peek(0) else {
                return (tokens, false);
            };
            let (start, line, column) = (self.pos, self.line, self.column());

            match b {
                b'\n' => {
                    if mode == Mode::QuotedTemplate {
                        return (tokens, false);
                    }
                    self.bump();
                    if mode == Mode::TopLevel {
                        tokens.push(self.token(TokenKind::Newline, start, line, column));
                    }
                }
                b'#' => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => {
                    if !self.skip_block_comment() {
                        tokens.push(self.token(
                            TokenKind::Invalid("unterminated block comment".to_string()),
                            start,
                            line,
                            column,
                        ));
                    }
                }
                b'"' => {
                    self.bump();
                    let (template, problem) = self.lex_template(true);
                    tokens.push(self.token(TokenKind::Str(template), start, line, column));
                    if let Some(message) = problem {
                        tokens.push(self.token(TokenKind::Invalid(message), start, line, column));
                    }
                }
                b'<' if self.peek(1) == Some(b'<') => {
                    if let Some(mut heredoc) = self.lex_heredoc() {
                        tokens.append(&mut heredoc);
                    } else {
                        self.bump();
                        tokens.push(self.token(TokenKind::Op("<"), start, line, column));
                    }
                }
                b'~' if mode != Mode::TopLevel => self.bump(),
                b'}' if mode != Mode::TopLevel && depth == 0 => {
                    self.bump();
                    return (tokens, true);
                }
                b'0'..=b'9' => {
                    let kind = self.lex_number();
                    tokens.push(self.token(kind, start, line, column));
                }
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    while matches!(
                        self.peek(0),
                        Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-')
                    ) {
                        self.bump();
                    }
                    let ident = self.src[start..self.pos].to_string();
                    tokens.push(self.token(TokenKind::Ident(ident), start, line, column));
                }
                _ => {
                    let kind = self.lex_symbol();
                    match kind {
                        TokenKind::Punct('{') => depth += 1,
                        TokenKind::Punct('}') => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    tokens.push(self.token(kind, start, line, column));
                }
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(0), Some(b'0'..=b'9')) {
            self.bump();
        }
        if self.peek(0) == Some(b'.') && matches!(self.peek(1), Some(b'0'..=b'9')) {
            self.bump();
            while matches!(self.peek(0), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let digits_at = if matches!(self.peek(1), Some(b'+' | b'-')) { 2 } else { 1 };
            if matches!(self.peek(digits_at), Some(b'0'..=b'9')) {
                for _ in 0..digits_at {
                    self.bump();
                }
                while matches!(self.peek(0), Some(b'0'..=b'9')) {
                    self.bump();
                }
            }
        }
        TokenKind::Number(self.src[start..self.pos].to_string())
    }

    fn lex_symbol(&mut self) -> TokenKind {
        let rest = &self.src[self.pos..self.limit];
        if rest.starts_with("...") {
            self.bump_to(self.pos + 3);
            return TokenKind::Op("...");
        }
        if let Some(op) = TWO_CHAR_OPS.iter().find(|op| rest.starts_with(**op)) {
            self.bump_to(self.pos + 2);
            return TokenKind::Op(*op);
        }
        if let Some(op) = ONE_CHAR_OPS.iter().find(|op| rest.starts_with(**op)) {
            self.bump();
            return TokenKind::Op(*op);
        }
        let c = rest.chars().next().unwrap_or('\0');
        self.bump();
        if PUNCT.contains(&c) {
            TokenKind::Punct(c)
        } else {
            TokenKind::Invalid(format!("unexpected character '{c}'"))
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
    }

    /// Returns false when the comment is never closed.
    fn skip_block_comment(&mut self) -> bool {
        self.bump();
        self.bump();
        while !self.at_end() {
            if self.peek(0) == Some(b'*') && self.peek(1) == Some(b'/') {
                self.bump();
                self.bump();
                return true;
            }
            self.bump();
        }
        false
    }

    /// Lex a template body. For quoted strings the opening quote has been
    /// consumed; the closing quote is consumed here.
    fn lex_template(&mut self, quoted: bool) -> (Template, Option<String>) {
        let mut template = Template {
            segments: Vec::new(),
            heredoc: !quoted,
        };
        let mut literal = String::new();
        let mut problem = None;

        loop {
            let Some(b) = self.peek(0) else {
                if quoted {
                    problem = Some("unterminated string".to_string());
                }
                break;
            };
            match b {
                b'"' if quoted => {
                    self.bump();
                    break;
                }
                b'\n' if quoted => {
                    problem = Some("unterminated string".to_string());
                    break;
                }
                b'\\' if quoted => {
                    self.bump();
                    match self.peek(0) {
                        Some(b'n') => literal.push('\n'),
                        Some(b't') => literal.push('\t'),
                        Some(b'r') => literal.push('\r'),
                        Some(b'\n') | None => continue,
                        Some(_) => {
                            let c = self.src[self.pos..].chars().next().unwrap_or_default();
                            literal.push(c);
                        }
                    }
                    self.bump();
                }
                b'$' | b'%' if self.peek(1) == Some(b) && self.peek(2) == Some(b'{') => {
                    literal.push(b as char);
                    literal.push('{');
                    self.bump_to(self.pos + 3);
                }
                b'$' | b'%' if self.peek(1) == Some(b'{') => {
                    if !literal.is_empty() {
                        template
                            .segments
                            .push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    self.bump_to(self.pos + 2);
                    if self.template_depth >= MAX_TEMPLATE_NESTING {
                        self.too_deep = true;
                        self.skip_template_rest(quoted);
                        break;
                    }
                    let mode = if quoted {
                        Mode::QuotedTemplate
                    } else {
                        Mode::HeredocTemplate
                    };
                    self.template_depth += 1;
                    let (tokens, closed) = self.lex_tokens(mode);
                    self.template_depth -= 1;
                    template.segments.push(if b == b'$' {
                        Segment::Interpolation(tokens)
                    } else {
                        Segment::Directive(tokens)
                    });
                    if !closed {
                        problem = Some("unterminated template sequence".to_string());
                        if quoted {
                            break;
                        }
                    }
                }
                _ => {
                    let c = self.src[self.pos..].chars().next().unwrap_or_default();
                    literal.push(c);
                    self.bump();
                }
            }
        }

        if !literal.is_empty() {
            template.segments.push(Segment::Literal(literal));
        }
        if self.template_depth == 0 && std::mem::take(&mut self.too_deep) {
            problem = Some(format!(
                "string templates nested deeper than {MAX_TEMPLATE_NESTING} levels"
            ));
        }
        (template, problem)
    }

    /// Skip what is left of an over-nested template without lexing it: to
    /// the end of the line for quoted strings, to the end of the body for
    /// heredocs.
    fn skip_template_rest(&mut self, quoted: bool) {
        while let Some(b) = self.peek(0) {
            if quoted && b == b'\n' {
                break;
            }
            self.bump();
        }
    }

    /// Lex `<<EOF` / `<<-EOF` heredocs. Returns `None` (consuming nothing)
    /// when the input is not a heredoc opener.
    fn lex_heredoc(&mut self) -> Option<Vec<Token>> {
        let (start, line, column) = (self.pos, self.line, self.column());
        let mut p = self.pos + 2;
        if p < self.limit && self.bytes[p] == b'-' {
            p += 1;
        }
        let marker_start = p;
        if p >= self.limit || !(self.bytes[p].is_ascii_alphabetic() || self.bytes[p] == b'_') {
            return None;
        }
        while p < self.limit && (self.bytes[p].is_ascii_alphanumeric() || self.bytes[p] == b'_') {
            p += 1;
        }
        let marker = &self.src[marker_start..p];
        while p < self.limit && matches!(self.bytes[p], b' ' | b'\t' | b'\r') {
            p += 1;
        }
        if p < self.limit && self.bytes[p] != b'\n' {
            return None;
        }
        let body_start = (p + 1).min(self.limit);

        let mut body_end = self.limit;
        let mut after = self.limit;
        let mut terminated = false;
        let mut line_begin = body_start;
        while line_begin < self.limit {
            let line_end = self.src[line_begin..self.limit]
                .find('\n')
                .map_or(self.limit, |i| line_begin + i);
            if self.src[line_begin..line_end].trim() == marker {
                body_end = line_begin;
                after = line_end;
                terminated = true;
                break;
            }
            line_begin = line_end + 1;
        }

        self.bump_to(body_start);
        let outer_limit = self.limit;
        self.limit = body_end;
        let (template, problem) = self.lex_template(false);
        self.limit = outer_limit;
        self.bump_to(after);

        let mut tokens = vec![self.token(TokenKind::Str(template), start, line, column)];
        if !terminated {
            tokens.push(self.token(
                TokenKind::Invalid(format!("unterminated heredoc '{marker}'")),
                start,
                line,
                column,
            ));
        } else if let Some(message) = problem {
            tokens.push(self.token(TokenKind::Invalid(message), start, line, column));
        }
        Some(tokens)
    }
}
