//! Markup splitting and reassembly.
//!
//! An HTML document is cut into its head element, its body opening tag and
//! the body's inner markup. The inner markup is moved into a script statement
//! that restores it at load time:
//!
//! ```text
//! <head>…</head><body class="a">Hello</body>
//!   => document.body.innerHTML='\u0048\u0065\u006c\u006c\u006f'
//!   => <!DOCTYPE html><html><head>…</head><body class="a"><script …>ENCODED</script></body></html>
//! ```
//!
//! Extraction is a first-match regex heuristic, not an HTML parser. Nested or
//! repeated head/body elements are not understood: the first occurrence of
//! each pair wins, and a `</body>` inside a script or comment ends the body
//! early. Bundler output is trusted to be plain enough for this to hold.

use std::sync::LazyLock;

use regex::Regex;

/// Complete head element, tags included.
static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>[\s\S]*?</head>").unwrap());

/// Body element: opening tag and inner markup.
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(<body(?:\s[^>]*)?>)([\s\S]*?)</body>").unwrap());

const STATEMENT_PREFIX: &str = "document.body.innerHTML='";
const STATEMENT_SUFFIX: &str = "'";

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Reason a markup file is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedMarkup {
    #[error("no head element found")]
    MissingHead,
    #[error("no body element found")]
    MissingBody,
    #[error("body element is empty")]
    EmptyBody,
}

/// Borrowed view of the three parts of a document the rewriter needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupDocument<'a> {
    /// Verbatim head element including its tags.
    pub head_block: &'a str,
    /// Verbatim body opening tag with attributes.
    pub body_open_tag: &'a str,
    /// Markup between the body tags.
    pub body_inner: &'a str,
}

impl<'a> MarkupDocument<'a> {
    /// Split `html` into head element, body opening tag and body content.
    pub fn parse(html: &'a str) -> Result<Self, MalformedMarkup> {
        let head_block = HEAD_RE
            .find(html)
            .ok_or(MalformedMarkup::MissingHead)?
            .as_str();
        let body = BODY_RE.captures(html).ok_or(MalformedMarkup::MissingBody)?;
        let (Some(open), Some(inner)) = (body.get(1), body.get(2)) else {
            return Err(MalformedMarkup::MissingBody);
        };
        if inner.as_str().is_empty() {
            return Err(MalformedMarkup::EmptyBody);
        }

        Ok(Self {
            head_block,
            body_open_tag: open.as_str(),
            body_inner: inner.as_str(),
        })
    }

    /// Script statement that restores the body content when executed.
    #[must_use]
    pub fn body_statement(&self) -> String {
        let mut statement = String::with_capacity(
            STATEMENT_PREFIX.len() + self.body_inner.len() * 6 + STATEMENT_SUFFIX.len(),
        );
        statement.push_str(STATEMENT_PREFIX);
        push_code_unit_escapes(&mut statement, self.body_inner);
        statement.push_str(STATEMENT_SUFFIX);
        statement
    }

    /// Build the replacement document around an encoded body statement.
    #[must_use]
    pub fn assemble(&self, encoded_statement: &str) -> String {
        format!(
            "<!DOCTYPE html><html>{}{}<script type=\"text/javascript\">{}</script></body></html>",
            self.head_block, self.body_open_tag, encoded_statement
        )
    }
}

/// Append one `\uXXXX` escape per UTF-16 code unit of `text`.
///
/// Characters outside the Basic Multilingual Plane become two escapes, one
/// per surrogate half; a script engine joins them back into one character.
/// The output contains only `\`, `u` and hex digits, so it is safe inside
/// any quoted script string literal.
fn push_code_unit_escapes(out: &mut String, text: &str) {
    for unit in text.encode_utf16() {
        out.push_str("\\u");
        for shift in [12, 8, 4, 0] {
            out.push(char::from(HEX[usize::from((unit >> shift) & 0xf)]));
        }
    }
}
