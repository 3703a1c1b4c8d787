//! Tokenizer for learner scripts

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Template(Vec<TemplateChunk>),
    /// Identifiers and keywords alike
    Word(String),
    Punct(&'static str),
    Eof,
}

/// Piece of a template literal
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(String),
    /// Source of a `${...}` hole with the position it starts at
    Expr { source: String, line: usize, column: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    /// A line break separates this token from the previous one
    pub newline_before: bool,
}

// Longest first so greedy matching works
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--",
    "+=", "-=", "*=", "/=", "{", "}", "(", ")", "[", "]", ";", ",", ".", ":", "?", "+", "-", "*",
    "/", "%", "<", ">", "=", "!", "&", "|",
];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::at(source, 1, 1)
    }

    /// Lexer whose positions start at `line`/`column`
    pub fn at(source: &str, line: usize, column: usize) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line,
            column,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let newline_before = self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let kind = match self.peek() {
                None => TokenKind::Eof,
                Some(c) if c.is_ascii_digit() => self.number()?,
                Some('.') if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) => self.number()?,
                Some(c) if c == '"' || c == '\'' => self.string(c)?,
                Some('`') => self.template()?,
                Some(c) if is_word_start(c) => self.word(),
                Some(_) => self.punct()?,
            };
            let done = kind == TokenKind::Eof;
            tokens.push(Token {
                kind,
                line,
                column,
                newline_before,
            });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    /// Skip whitespace and comments; report whether a newline was crossed
    fn skip_trivia(&mut self) -> Result<bool, SyntaxError> {
        let mut newline = false;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('\n'), _) => {
                    newline = true;
                    self.bump();
                }
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            None => return Err(self.error("Unterminated comment")),
                            Some('\n') => newline = true,
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            return u64::from_str_radix(&digits, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| self.error("Invalid hexadecimal literal"));
        }

        while self.peek().map_or(false, |c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).map_or(true, |c| c.is_ascii_digit() || !is_word_start(c)) {
            self.bump();
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
            if self.peek_at(if sign { 2 } else { 1 }).map_or(false, |c| c.is_ascii_digit()) {
                self.bump();
                if sign {
                    self.bump();
                }
                while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let text: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("Invalid number literal '{}'", text)))
    }

    fn escape(&mut self) -> Result<char, SyntaxError> {
        let c = self.bump().ok_or_else(|| self.error("Unterminated string literal"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'u' => {
                let mut code = String::new();
                if self.peek() == Some('{') {
                    self.bump();
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                        code.push(c);
                    }
                } else {
                    for _ in 0..4 {
                        code.extend(self.bump());
                    }
                }
                u32::from_str_radix(&code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("Invalid unicode escape"))?
            }
            other => other,
        })
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Unterminated string literal")),
                Some('\\') => {
                    if self.peek() == Some('\n') {
                        self.bump();
                        continue;
                    }
                    value.push(self.escape()?);
                }
                Some(c) if c == quote => return Ok(TokenKind::Str(value)),
                Some(c) => value.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let mut chunks = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => break,
                Some('\\') => text.push(self.escape()?),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !text.is_empty() {
                        chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                    }
                    let (line, column) = (self.line, self.column);
                    let source = self.template_hole()?;
                    chunks.push(TemplateChunk::Expr { source, line, column });
                }
                Some(c) => text.push(c),
            }
        }
        if !text.is_empty() || chunks.is_empty() {
            chunks.push(TemplateChunk::Text(text));
        }
        Ok(TokenKind::Template(chunks))
    }

    /// Raw source of a `${...}` hole up to its matching brace
    fn template_hole(&mut self) -> Result<String, SyntaxError> {
        let mut depth = 0usize;
        let mut source = String::new();
        let mut quote: Option<char> = None;
        loop {
            let c = self.bump().ok_or_else(|| self.error("Unterminated template expression"))?;
            if let Some(q) = quote {
                source.push(c);
                if c == '\\' {
                    source.extend(self.bump());
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    source.push(c);
                }
                '{' => {
                    depth += 1;
                    source.push(c);
                }
                '}' if depth == 0 => return Ok(source),
                '}' => {
                    depth -= 1;
                    source.push(c);
                }
                _ => source.push(c),
            }
        }
    }

    fn word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_word_start(c) || c.is_ascii_digit() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Word(word)
    }

    fn punct(&mut self) -> Result<TokenKind, SyntaxError> {
        for p in PUNCTUATORS {
            let matches = p
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_at(i) == Some(c));
            if !matches {
                continue;
            }
            // `a?.5:1` is a conditional, not optional chaining
            if *p == "?." && self.peek_at(2).map_or(false, |c| c.is_ascii_digit()) {
                continue;
            }
            for _ in 0..p.chars().count() {
                self.bump();
            }
            return Ok(TokenKind::Punct(p));
        }
        let c = self.peek().unwrap_or('\0');
        Err(self.error(format!("Unexpected character '{}'", c)))
    }
}

fn is_word_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_words_strings_and_punctuation() {
        let tokens = kinds("await page.getByLabel('User').fill(\"a\\nb\");");
        assert_eq!(tokens[0], TokenKind::Word("await".to_string()));
        assert_eq!(tokens[2], TokenKind::Punct("."));
        assert_eq!(tokens[5], TokenKind::Str("User".to_string()));
        assert_eq!(tokens[10], TokenKind::Str("a\nb".to_string()));
        assert_eq!(tokens.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = Lexer::new("a // note\n/* block\n */ b").tokenize().unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_template_holes() {
        let tokens = kinds("`Hello ${user.name}!`");
        match &tokens[0] {
            TokenKind::Template(chunks) => {
                assert_eq!(chunks.len(), 3);
                assert!(matches!(&chunks[1], TemplateChunk::Expr { source, .. } if source == "user.name"));
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_numbers_and_operators() {
        let tokens = kinds("x === 3.5 ?? 0x10 >= 1e3");
        assert_eq!(tokens[1], TokenKind::Punct("==="));
        assert_eq!(tokens[2], TokenKind::Number(3.5));
        assert_eq!(tokens[3], TokenKind::Punct("??"));
        assert_eq!(tokens[4], TokenKind::Number(16.0));
        assert_eq!(tokens[6], TokenKind::Number(1000.0));
    }

    #[test]
    fn test_unterminated_string_reports_position() {
        let err = Lexer::new("let a = 1;\nlet b = 'oops").tokenize().unwrap_err();
        assert_eq!(err.line, 2);
    }
}
