use crate::protocol::Protocol;
use crate::rule::{Action, Endpoint, IcmpSpec, ProtocolClause, Rule, Target, Wildcard};
use crate::tokenizer::{tokenize, Keyword, LexError, Token, TokenKind};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Length of a hyphenated UUID, the only form accepted for VM identifiers
const UUID_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    InvalidLiteral,
    EmptyList,
    UnknownProtocol,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken => write!(f, "Unexpected token"),
            Self::UnexpectedEof => write!(f, "Unexpected end of rule"),
            Self::InvalidLiteral => write!(f, "Invalid literal"),
            Self::EmptyList => write!(f, "Empty list"),
            Self::UnknownProtocol => write!(f, "Unknown protocol"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub kind: ParseErrorKind,

    /// Character offset of the offending token
    pub position: usize,

    pub expected: String,
    pub found: String,
}

/// Any failure to turn rule text into a [`Rule`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RuleError {
    /// Character offset in the rule text at which the failure was detected
    pub fn position(&self) -> usize {
        match self {
            Self::Lex(e) => e.position(),
            Self::Parse(e) => e.position,
        }
    }
}

/// Parse a single rule, e.g. `FROM ip 1.2.3.4 TO tag role = db ALLOW tcp PORT 80`.
///
/// Keywords are case-insensitive. The whole text must form exactly one rule;
/// any trailing tokens are an error.
pub fn parse(text: &str) -> Result<Rule, RuleError> {
    let tokens = tokenize(text)?;
    Ok(Parser::new(tokens).rule()?)
}

struct Parser {
    /// Always ends with an `Eof` token
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, kind: ParseErrorKind, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError {
            kind,
            position: token.position,
            expected: expected.to_string(),
            found: token.describe(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let kind = if self.peek().kind == TokenKind::Eof {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::UnexpectedToken
        };
        self.error(kind, expected)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(TokenKind::Keyword(keyword))
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, ParseError> {
        if self.peek().is_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("keyword {}", keyword)))
        }
    }

    fn rule(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword(Keyword::From)?;
        let from = self.list(Keyword::Or, Self::endpoint, "endpoint")?;
        self.expect_keyword(Keyword::To)?;
        let to = self.list(Keyword::Or, Self::endpoint, "endpoint")?;
        let action = self.action()?;
        let protocol = self.protocol_clause()?;

        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("end of rule"));
        }

        Ok(Rule {
            from,
            to,
            action,
            protocol,
        })
    }

    /// Either a single item, or one or more items in parentheses joined by `separator`
    fn list<T>(
        &mut self,
        separator: Keyword,
        item: fn(&mut Self) -> Result<T, ParseError>,
        item_name: &str,
    ) -> Result<Vec<T>, ParseError> {
        if !self.eat(TokenKind::LParen) {
            return Ok(vec![item(self)?]);
        }

        if self.peek().kind == TokenKind::RParen {
            return Err(self.error(ParseErrorKind::EmptyList, item_name));
        }

        let mut items = vec![item(self)?];
        while self.eat_keyword(separator) {
            items.push(item(self)?);
        }

        if !self.eat(TokenKind::RParen) {
            return Err(self.unexpected(&format!("keyword {} or ')'", separator)));
        }

        Ok(items)
    }

    fn endpoint(&mut self) -> Result<Endpoint, ParseError> {
        const EXPECTED: &str = "endpoint (IP, SUBNET, VM, TAG, ANY or ALL VMS)";

        let keyword = match self.peek().kind {
            TokenKind::Keyword(keyword) => keyword,
            _ => return Err(self.unexpected(EXPECTED)),
        };

        match keyword {
            Keyword::Ip => {
                self.advance();
                let literal = self.word("IPv4 address")?;
                Ipv4Addr::from_str(&literal.text)
                    .map(Endpoint::Ip)
                    .map_err(|_| invalid_literal(&literal, "IPv4 address"))
            }
            Keyword::Subnet => {
                self.advance();
                self.subnet().map(Endpoint::Subnet)
            }
            Keyword::Vm => {
                self.advance();
                let literal = self.word("VM UUID")?;
                if literal.text.len() != UUID_LEN {
                    return Err(invalid_literal(&literal, "VM UUID"));
                }
                Uuid::parse_str(&literal.text)
                    .map(Endpoint::Vm)
                    .map_err(|_| invalid_literal(&literal, "VM UUID"))
            }
            Keyword::Tag => {
                self.advance();
                let name = self.tag_text(false)?;
                let value = if self.eat(TokenKind::Equals) {
                    Some(self.tag_text(true)?)
                } else {
                    None
                };
                Ok(Endpoint::Tag { name, value })
            }
            Keyword::Any => {
                self.advance();
                Ok(Endpoint::Wildcard(Wildcard::Any))
            }
            Keyword::All => {
                self.advance();
                self.expect_keyword(Keyword::Vms)?;
                Ok(Endpoint::Wildcard(Wildcard::AllVms))
            }
            _ => Err(self.unexpected(EXPECTED)),
        }
    }

    /// `address/prefix-length`
    fn subnet(&mut self) -> Result<Ipv4Net, ParseError> {
        const EXPECTED: &str = "CIDR subnet";

        // The CIDR is a single literal: no whitespace around the slash
        let address = self.word(EXPECTED)?;
        let slash_position = address.position + address.text.chars().count();
        if self.peek().kind != TokenKind::Slash || self.peek().position != slash_position {
            return Err(self.error(ParseErrorKind::InvalidLiteral, "'/' and prefix length"));
        }
        self.advance();
        if self.peek().kind != TokenKind::Number || self.peek().position != slash_position + 1 {
            return Err(self.error(ParseErrorKind::InvalidLiteral, "prefix length"));
        }
        let prefix_len = self.advance();

        let cidr = format!("{}/{}", address.text, prefix_len.text);
        Ipv4Net::from_str(&cidr).map_err(|_| ParseError {
            kind: ParseErrorKind::InvalidLiteral,
            position: address.position,
            expected: EXPECTED.to_string(),
            found: format!("'{}'", cidr),
        })
    }

    /// A bare word (identifier or number) holding a literal such as an address
    fn word(&mut self, expected: &str) -> Result<Token, ParseError> {
        match self.peek().kind {
            TokenKind::Ident | TokenKind::Number => Ok(self.advance()),
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Tag names may be identifiers or quoted strings; values may additionally be numbers
    fn tag_text(&mut self, is_value: bool) -> Result<String, ParseError> {
        let expected = if is_value { "tag value" } else { "tag name" };

        match self.peek().kind {
            TokenKind::Ident | TokenKind::QuotedString => {}
            TokenKind::Number if is_value => {}
            _ => return Err(self.unexpected(expected)),
        }

        let token = self.advance();
        if token.text.is_empty() {
            return Err(invalid_literal(&token, &format!("non-empty {}", expected)));
        }
        Ok(token.text)
    }

    fn action(&mut self) -> Result<Action, ParseError> {
        if self.eat_keyword(Keyword::Allow) {
            Ok(Action::Allow)
        } else if self.eat_keyword(Keyword::Block) {
            Ok(Action::Block)
        } else {
            Err(self.unexpected("ALLOW or BLOCK"))
        }
    }

    fn protocol_clause(&mut self) -> Result<ProtocolClause, ParseError> {
        const EXPECTED: &str = "protocol (TCP, UDP or ICMP)";

        let token = self.peek();
        let name = match token.kind {
            TokenKind::Keyword(_) | TokenKind::Ident => match Protocol::parse(&token.text) {
                Some(protocol) => protocol,
                None if token.kind == TokenKind::Ident => {
                    return Err(self.error(ParseErrorKind::UnknownProtocol, EXPECTED))
                }
                None => return Err(self.unexpected(EXPECTED)),
            },
            _ => return Err(self.unexpected(EXPECTED)),
        };
        self.advance();

        let targets = if name.has_ports() {
            self.list(Keyword::And, Self::port_target, "PORT")?
        } else {
            self.list(Keyword::And, Self::icmp_target, "TYPE")?
        };

        Ok(ProtocolClause { name, targets })
    }

    /// `PORT <number>` or `PORT ALL`
    fn port_target(&mut self) -> Result<Target, ParseError> {
        self.expect_keyword(Keyword::Port)?;
        if self.eat_keyword(Keyword::All) {
            return Ok(Target::AllPorts);
        }

        let port = self.number("port number (1-65535) or ALL", 1..=u64::from(u16::MAX))?;
        Ok(Target::PortNumber(port as u16))
    }

    /// `TYPE <number> [CODE <number>]`
    fn icmp_target(&mut self) -> Result<Target, ParseError> {
        let byte = 0..=u64::from(u8::MAX);

        self.expect_keyword(Keyword::Type)?;
        let icmp_type = self.number("ICMP type (0-255)", byte.clone())? as u8;
        let code = if self.eat_keyword(Keyword::Code) {
            Some(self.number("ICMP code (0-255)", byte)? as u8)
        } else {
            None
        };

        Ok(Target::Icmp(IcmpSpec { icmp_type, code }))
    }

    fn number(&mut self, expected: &str, range: RangeInclusive<u64>) -> Result<u64, ParseError> {
        if self.peek().kind != TokenKind::Number {
            return Err(self.unexpected(expected));
        }

        match self.peek().number() {
            Some(value) if range.contains(&value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(self.error(ParseErrorKind::InvalidLiteral, expected)),
        }
    }
}

fn invalid_literal(token: &Token, expected: &str) -> ParseError {
    ParseError {
        kind: ParseErrorKind::InvalidLiteral,
        position: token.position,
        expected: expected.to_string(),
        found: token.describe(),
    }
}
