//! Parsed representation of a firewall rule.
//!
//! The `Serialize` implementations produce the canonical structure consumed by the
//! rule compiler: endpoints as `[kind, value]` pairs, TCP/UDP targets as numbers and
//! ICMP targets as `"type"` or `"type:code"` strings. `Display` renders a rule back
//! into rule text that parses to the same value.

use crate::protocol::Protocol;
use crate::tokenizer::{is_word_char, Keyword};
use ipnet::Ipv4Net;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub from: Vec<Endpoint>,
    pub to: Vec<Endpoint>,
    pub action: Action,
    pub protocol: ProtocolClause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Ip(Ipv4Addr),
    Subnet(Ipv4Net),
    Vm(Uuid),
    Tag { name: String, value: Option<String> },
    Wildcard(Wildcard),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    Any,
    AllVms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolClause {
    pub name: Protocol,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    PortNumber(u16),
    AllPorts,
    Icmp(IcmpSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpSpec {
    pub icmp_type: u8,
    pub code: Option<u8>,
}

impl Endpoint {
    /// Kind name used in the canonical structure
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ip(_) => "ip",
            Self::Subnet(_) => "subnet",
            Self::Vm(_) => "vm",
            Self::Tag { .. } => "tag",
            Self::Wildcard(_) => "wildcard",
        }
    }
}

impl Wildcard {
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::AllVms => "vmall",
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(self.kind())?;
        match self {
            Self::Ip(addr) => pair.serialize_element(&addr.to_string())?,
            Self::Subnet(net) => pair.serialize_element(&net.to_string())?,
            Self::Vm(uuid) => pair.serialize_element(&uuid.hyphenated().to_string())?,
            Self::Tag { name, value: None } => pair.serialize_element(name)?,
            Self::Tag {
                name,
                value: Some(value),
            } => pair.serialize_element(&(name, value))?,
            Self::Wildcard(wildcard) => pair.serialize_element(wildcard.canonical_name())?,
        }
        pair.end()
    }
}

impl Serialize for Target {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::PortNumber(port) => serializer.serialize_u16(*port),
            Self::AllPorts => serializer.serialize_str("all"),
            Self::Icmp(spec) => serializer.collect_str(spec),
        }
    }
}

/// `type` or `type:code`, as used in the canonical structure
impl fmt::Display for IcmpSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}:{}", self.icmp_type, code),
            None => write!(f, "{}", self.icmp_type),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "{}", Keyword::Allow),
            Self::Block => write!(f, "{}", Keyword::Block),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ip(addr) => write!(f, "{} {}", Keyword::Ip, addr),
            Self::Subnet(net) => write!(f, "{} {}", Keyword::Subnet, net),
            Self::Vm(uuid) => write!(f, "{} {}", Keyword::Vm, uuid.hyphenated()),
            Self::Tag { name, value: None } => write!(f, "{} {}", Keyword::Tag, Quoted(name)),
            Self::Tag {
                name,
                value: Some(value),
            } => write!(f, "{} {} = {}", Keyword::Tag, Quoted(name), Quoted(value)),
            Self::Wildcard(Wildcard::Any) => write!(f, "{}", Keyword::Any),
            Self::Wildcard(Wildcard::AllVms) => write!(f, "{} {}", Keyword::All, Keyword::Vms),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PortNumber(port) => write!(f, "{} {}", Keyword::Port, port),
            Self::AllPorts => write!(f, "{} {}", Keyword::Port, Keyword::All),
            Self::Icmp(IcmpSpec { icmp_type, code }) => {
                write!(f, "{} {}", Keyword::Type, icmp_type)?;
                if let Some(code) = code {
                    write!(f, " {} {}", Keyword::Code, code)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ProtocolClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ", self.name)?;
        write_list(f, &self.targets, Keyword::And)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ", Keyword::From)?;
        write_list(f, &self.from, Keyword::Or)?;
        write!(f, " {} ", Keyword::To)?;
        write_list(f, &self.to, Keyword::Or)?;
        write!(f, " {} {}", self.action, self.protocol)
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter,
    items: &[T],
    separator: Keyword,
) -> fmt::Result {
    if let [single] = items {
        return write!(f, "{}", single);
    }

    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", separator)?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

/// Tag name or value, quoted unless it reads back as a single identifier
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bare = !self.0.is_empty()
            && self.0.chars().all(is_word_char)
            && !self.0.bytes().all(|b| b.is_ascii_digit())
            && Keyword::lookup(self.0).is_none();

        if bare {
            f.write_str(self.0)
        } else {
            write!(f, "\"{}\"", self.0)
        }
    }
}
