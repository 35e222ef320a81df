/*
 * expander.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Markup expansion collaborator.
//!
//! The processor never parses markup itself. Whenever it needs the expanded
//! form of a citation body or a citation-list body it hands the raw text to a
//! [`MarkupExpander`], which may call back into the processor (through
//! [`CiteHandler`]) for every citation tag it meets.
//!
//! [`TagExpander`] is the smallest useful expander: it recognizes the two
//! citation tags and the templating form `{{#tag:references|...}}`, and
//! passes every other character through untouched. The templating form
//! expands its body *before* handing it to the list handler, which is exactly
//! the speculative evaluation the rollback machinery exists for.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

/// Citation tag entry points, as seen by an expander.
pub trait CiteHandler {
    /// Handle a `<ref>` tag; returns the text that replaces it.
    fn ref_tag(
        &mut self,
        expander: &mut dyn MarkupExpander,
        content: Option<&str>,
        args: &[(String, String)],
    ) -> Result<String>;

    /// Handle a `<references>` tag; returns the rendered list.
    fn references_tag(
        &mut self,
        expander: &mut dyn MarkupExpander,
        content: Option<&str>,
        args: &[(String, String)],
    ) -> Result<String>;
}

pub trait MarkupExpander {
    /// Expand `raw` to its final text, re-entering `handler` for citation tags.
    fn expand(&mut self, handler: &mut dyn CiteHandler, raw: &str) -> Result<String>;
}

/// Leaves text exactly as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityExpander;

impl MarkupExpander for IdentityExpander {
    fn expand(&mut self, _handler: &mut dyn CiteHandler, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}

static TAG_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(?:ref|references)\b|\{\{#tag:references\|").expect("valid tag start pattern")
});

static OPENING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^<(ref|references)\b([^>]*?)(/?)>").expect("valid opening tag pattern")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("valid attribute pattern")
});

static CLOSE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</ref\s*>").expect("valid closing tag pattern"));

static CLOSE_REFERENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</references\s*>").expect("valid closing tag pattern"));

const TEMPLATE_OPEN: &str = "{{#tag:references|";
const TEMPLATE_CLOSE: &str = "}}";

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(source)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_string(), value.to_string())
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
enum TagKind {
    Ref,
    References,
    TemplateReferences,
}

/// A complete tag found at the start of some text.
#[derive(Debug, PartialEq, Eq)]
struct Tag<'a> {
    kind: TagKind,
    args: Vec<(String, String)>,
    content: Option<&'a str>,
    /// Bytes consumed from the start of the text.
    len: usize,
}

fn parse_template(text: &str) -> Option<Tag<'_>> {
    let inner_start = TEMPLATE_OPEN.len();
    let close = text[inner_start..].find(TEMPLATE_CLOSE)? + inner_start;
    let mut parts = text[inner_start..close].split('|');
    let body = parts.next().unwrap_or("");
    let args = parts
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    Some(Tag {
        kind: TagKind::TemplateReferences,
        args,
        content: Some(body),
        len: close + TEMPLATE_CLOSE.len(),
    })
}

fn parse_tag(text: &str) -> Option<Tag<'_>> {
    if text.starts_with(TEMPLATE_OPEN) {
        return parse_template(text);
    }

    let caps = OPENING_TAG.captures(text)?;
    let opening_len = caps.get(0)?.end();
    let kind = if caps[1].eq_ignore_ascii_case("ref") {
        TagKind::Ref
    } else {
        TagKind::References
    };
    let args = parse_attributes(&caps[2]);

    if !caps[3].is_empty() {
        return Some(Tag {
            kind,
            args,
            content: None,
            len: opening_len,
        });
    }

    let closing = match kind {
        TagKind::Ref => &CLOSE_REF,
        _ => &CLOSE_REFERENCES,
    };
    let close = closing.find(&text[opening_len..])?;
    Some(Tag {
        kind,
        args,
        content: Some(&text[opening_len..opening_len + close.start()]),
        len: opening_len + close.end(),
    })
}

/// Minimal expander for citation tags.
///
/// Tags without a closing counterpart are left in the text verbatim, which is
/// how the validator later notices unclosed citations.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagExpander;

impl MarkupExpander for TagExpander {
    fn expand(&mut self, handler: &mut dyn CiteHandler, raw: &str) -> Result<String> {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(start) = TAG_START.find(rest) {
            out.push_str(&rest[..start.start()]);
            let tail = &rest[start.start()..];

            let Some(tag) = parse_tag(tail) else {
                out.push_str(start.as_str());
                rest = &tail[start.len()..];
                continue;
            };

            let replacement = match tag.kind {
                TagKind::Ref => handler.ref_tag(self, tag.content, &tag.args)?,
                TagKind::References => handler.references_tag(self, tag.content, &tag.args)?,
                TagKind::TemplateReferences => {
                    let body = self.expand(handler, tag.content.unwrap_or(""))?;
                    handler.references_tag(self, Some(&body), &tag.args)?
                }
            };
            out.push_str(&replacement);
            rest = &tail[tag.len..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_self_closing_ref() {
        let tag = parse_tag(r#"<ref name="a" group='notes' />rest"#).unwrap();
        assert_eq!(tag.kind, TagKind::Ref);
        assert_eq!(tag.content, None);
        assert_eq!(
            tag.args,
            vec![
                ("name".to_string(), "a".to_string()),
                ("group".to_string(), "notes".to_string()),
            ]
        );
        assert_eq!(&r#"<ref name="a" group='notes' />rest"#[tag.len..], "rest");
    }

    #[test]
    fn test_parse_ref_with_body() {
        let text = "<ref name=smith>Smith, 2020.</ref> after";
        let tag = parse_tag(text).unwrap();
        assert_eq!(tag.content, Some("Smith, 2020."));
        assert_eq!(&text[tag.len..], " after");
    }

    #[test]
    fn test_unclosed_ref_is_not_a_tag() {
        assert_eq!(parse_tag("<ref name=\"a\">never closed"), None);
    }

    #[test]
    fn test_parse_references_and_template() {
        let tag = parse_tag("<references group=\"n\"><ref name=\"a\">A</ref></references>").unwrap();
        assert_eq!(tag.kind, TagKind::References);
        assert_eq!(tag.content, Some("<ref name=\"a\">A</ref>"));

        let tag = parse_tag("{{#tag:references|<ref name=\"a\">A</ref>|group=n}} x").unwrap();
        assert_eq!(tag.kind, TagKind::TemplateReferences);
        assert_eq!(tag.content, Some("<ref name=\"a\">A</ref>"));
        assert_eq!(tag.args, vec![("group".to_string(), "n".to_string())]);
    }
}
