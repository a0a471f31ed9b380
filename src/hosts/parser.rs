//! Matching and rendering of `host <name> { ... }` blocks.
//!
//! Only top-level host blocks with a flat body are recognised: the body runs
//! to the first `}`. Everything outside a matched block is opaque text and is
//! never touched by the editors built on top of this module.

use std::fmt::Write;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::HostRecord;

/// Recognised statements inside a host block, in canonical render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    HardwareEthernet,
    OptionRouters,
    OptionSubnetMask,
    FixedAddress,
    OptionDomainNameServers,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::HardwareEthernet,
        Field::OptionRouters,
        Field::OptionSubnetMask,
        Field::FixedAddress,
        Field::OptionDomainNameServers,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Field::HardwareEthernet => "hardware ethernet",
            Field::OptionRouters => "option routers",
            Field::OptionSubnetMask => "option subnet-mask",
            Field::FixedAddress => "fixed-address",
            Field::OptionDomainNameServers => "option domain-name-servers",
        }
    }
}

/// A matched host block. `span` covers `host` through the closing `}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBlock<'a> {
    pub name: &'a str,
    pub body: &'a str,
    pub span: Range<usize>,
}

impl HostBlock<'_> {
    pub fn record(&self) -> HostRecord {
        let mut record = HostRecord {
            name: self.name.to_string(),
            ..Default::default()
        };
        parse_body(self.body, &mut record);
        record
    }
}

fn block_regex() -> &'static Regex {
    static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    BLOCK_REGEX.get_or_init(|| Regex::new(r"\bhost\s+([^\s{]+)\s*\{([^}]*)\}").unwrap())
}

/// All host blocks in file order.
pub fn blocks(content: &str) -> impl Iterator<Item = HostBlock<'_>> {
    block_regex().captures_iter(content).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(HostBlock {
            name: caps.get(1)?.as_str(),
            body: caps.get(2)?.as_str(),
            span: whole.range(),
        })
    })
}

/// First block whose header name equals `name`.
///
/// Names are compared as literal strings against the same block matches
/// `blocks` yields, so characters such as `.` or `*` carry no pattern meaning.
pub fn find_block<'a>(content: &'a str, name: &str) -> Option<HostBlock<'a>> {
    blocks(content).find(|block| block.name == name)
}

// Drop `#` comments through end of line. A `#` inside double quotes is text.
fn strip_comments(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for line in body.split_inclusive('\n') {
        let mut quoted = false;
        let mut cut = None;
        for (idx, c) in line.char_indices() {
            match c {
                '"' => quoted = !quoted,
                '#' if !quoted => {
                    cut = Some(idx);
                    break;
                }
                _ => {}
            }
        }
        match cut {
            Some(idx) => {
                out.push_str(&line[..idx]);
                if line.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}

/// Fill recognised fields from a block body. Comments are ignored, the
/// first statement for a field wins and unknown statements are skipped.
pub fn parse_body(body: &str, record: &mut HostRecord) {
    let mut seen = [false; Field::ALL.len()];
    let body = strip_comments(body);

    for stmt in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        for (idx, field) in Field::ALL.iter().enumerate() {
            if seen[idx] {
                continue;
            }
            if let Some(value) = strip_keyword(stmt, field.keyword()) {
                *record.field_mut(*field) = value.to_string();
                seen[idx] = true;
                break;
            }
        }
    }
}

// Keyword words may be separated by any run of whitespace, and the keyword
// must end on a word boundary ("option routers-x" is not "option routers").
fn strip_keyword<'a>(stmt: &'a str, keyword: &str) -> Option<&'a str> {
    let mut rest = stmt;
    for word in keyword.split(' ') {
        rest = rest.trim_start().strip_prefix(word)?;
        if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
            return None;
        }
    }
    Some(rest.trim())
}

/// Canonical text for a block, without a trailing newline.
pub fn render_block(record: &HostRecord) -> String {
    let mut out = format!("host {} {{\n", record.name);
    for field in Field::ALL {
        let _ = writeln!(out, "  {} {};", field.keyword(), record.field(field));
    }
    out.push('}');
    out
}

/// Widen a block span to the text a delete removes: trailing blanks and the
/// line break after the block, the indentation before it when the block
/// starts its own line, and one blank separator line above it.
pub fn removal_span(content: &str, span: Range<usize>) -> Range<usize> {
    let bytes = content.as_bytes();

    let mut end = span.end;
    while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }
    let ends_line = if content[end..].starts_with("\r\n") {
        end += 2;
        true
    } else if content[end..].starts_with('\n') {
        end += 1;
        true
    } else {
        end == bytes.len()
    };

    let mut start = span.start;
    let line_start = content[..start].rfind('\n').map_or(0, |i| i + 1);
    if content[line_start..start].trim_matches([' ', '\t']).is_empty() {
        start = line_start;
        if ends_line {
            let before = &content[..start];
            if before.ends_with("\r\n\r\n") {
                start -= 2;
            } else if before.ends_with("\n\n") {
                start -= 1;
            }
        }
    }

    start..end
}

/// Replace `range` of `content` with `replacement`.
pub fn splice(content: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(content.len() - range.len() + replacement.len());
    out.push_str(&content[..range.start]);
    out.push_str(replacement);
    out.push_str(&content[range.end..]);
    out
}

/// Text to append so that `block` follows existing content after one blank line.
pub fn append_block(content: &str, block: &str) -> String {
    let mut out = String::with_capacity(content.len() + block.len() + 3);
    out.push_str(content);
    if !content.is_empty() {
        if !content.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(block);
    out.push('\n');
    out
}
