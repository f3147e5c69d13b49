//! Front end for a declarative firewall rule language.
//!
//! ```text
//! FROM (subnet 10.8.0.0/16 OR ip 10.9.0.1) TO all vms ALLOW icmp (type 8 code 0 AND type 9)
//! ```
//!
//! [`parse`] turns one rule into a [`Rule`], whose `Serialize` output is the canonical
//! `{from, to, action, protocol}` structure handed to the rule compiler.

pub mod parser;
pub mod protocol;
pub mod rule;
pub mod rule_file;
pub mod tokenizer;

pub use parser::{parse, ParseError, ParseErrorKind, RuleError};
pub use protocol::Protocol;
pub use rule::{Action, Endpoint, IcmpSpec, ProtocolClause, Rule, Target, Wildcard};
pub use tokenizer::{tokenize, LexError, Token, TokenKind};
