use thiserror::Error;

/// Reserved words of the rule language, matched case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    From,
    To,
    Allow,
    Block,
    And,
    Or,
    Tag,
    Ip,
    Subnet,
    Vm,
    Any,
    All,
    Vms,
    Tcp,
    Udp,
    Icmp,
    Port,
    Type,
    Code,
}

const KEYWORDS: [(&str, Keyword); 19] = [
    ("FROM", Keyword::From),
    ("TO", Keyword::To),
    ("ALLOW", Keyword::Allow),
    ("BLOCK", Keyword::Block),
    ("AND", Keyword::And),
    ("OR", Keyword::Or),
    ("TAG", Keyword::Tag),
    ("IP", Keyword::Ip),
    ("SUBNET", Keyword::Subnet),
    ("VM", Keyword::Vm),
    ("ANY", Keyword::Any),
    ("ALL", Keyword::All),
    ("VMS", Keyword::Vms),
    ("TCP", Keyword::Tcp),
    ("UDP", Keyword::Udp),
    ("ICMP", Keyword::Icmp),
    ("PORT", Keyword::Port),
    ("TYPE", Keyword::Type),
    ("CODE", Keyword::Code),
];

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(word))
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|(text, _)| *text)
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident,
    QuotedString,
    Number,
    LParen,
    RParen,
    Equals,
    Slash,
    Colon,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Keyword(keyword) => write!(f, "keyword {}", keyword),
            Self::Ident => write!(f, "identifier"),
            Self::QuotedString => write!(f, "quoted string"),
            Self::Number => write!(f, "number"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Equals => write!(f, "'='"),
            Self::Slash => write!(f, "'/'"),
            Self::Colon => write!(f, "':'"),
            Self::Eof => write!(f, "end of rule"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,

    /// Source text of the token; the decoded interior for quoted strings
    pub text: String,

    /// Character offset of the first character of the token
    pub position: usize,
}

impl Token {
    /// Integer value of a number token; `None` for other kinds or if the literal overflows
    pub fn number(&self) -> Option<u64> {
        match self.kind {
            TokenKind::Number => self.text.parse().ok(),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Short description used in diagnostics, e.g. `identifier 'foo'`
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Ident | TokenKind::Number => format!("{} '{}'", self.kind, self.text),
            TokenKind::QuotedString => format!("{} \"{}\"", self.kind, self.text),
            TokenKind::Keyword(_) => format!("keyword '{}'", self.text),
            _ => self.kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorReason {
    UnterminatedString,
    UnexpectedChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unterminated quoted string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("Unexpected character {character:?} at position {position}")]
    UnexpectedChar { character: char, position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            Self::UnterminatedString { position } | Self::UnexpectedChar { position, .. } => {
                *position
            }
        }
    }

    pub fn reason(&self) -> LexErrorReason {
        match self {
            Self::UnterminatedString { .. } => LexErrorReason::UnterminatedString,
            Self::UnexpectedChar { character, .. } => LexErrorReason::UnexpectedChar(*character),
        }
    }
}

/// Characters allowed in a bare word: identifiers, numbers, addresses and UUIDs
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Split rule text into tokens. The returned sequence always ends with an `Eof` token.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let chars = text.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let punctuation = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '=' => Some(TokenKind::Equals),
            '/' => Some(TokenKind::Slash),
            ':' => Some(TokenKind::Colon),
            _ => None,
        };
        if let Some(kind) = punctuation {
            tokens.push(Token {
                kind,
                text: c.to_string(),
                position: pos,
            });
            pos += 1;
            continue;
        }

        if c == '"' {
            let start = pos;
            let len = chars[start + 1..]
                .iter()
                .position(|&c| c == '"')
                .ok_or(LexError::UnterminatedString { position: start })?;
            tokens.push(Token {
                kind: TokenKind::QuotedString,
                text: chars[start + 1..start + 1 + len].iter().collect(),
                position: start,
            });
            pos = start + len + 2;
            continue;
        }

        if is_word_char(c) {
            let start = pos;
            while pos < chars.len() && is_word_char(chars[pos]) {
                pos += 1;
            }
            let word = chars[start..pos].iter().collect::<String>();
            let kind = if word.bytes().all(|b| b.is_ascii_digit()) {
                TokenKind::Number
            } else if let Some(keyword) = Keyword::lookup(&word) {
                TokenKind::Keyword(keyword)
            } else {
                TokenKind::Ident
            };
            tokens.push(Token {
                kind,
                text: word,
                position: start,
            });
            continue;
        }

        return Err(LexError::UnexpectedChar {
            character: c,
            position: pos,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        position: chars.len(),
    });

    Ok(tokens)
}
