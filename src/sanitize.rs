//! Markdown to safe HTML.
//!
//! Markdown is rendered with `pulldown-cmark` (tables and strikethrough on),
//! then passed through an `ammonia` allow-list. Tags outside the list are
//! unwrapped: the tag goes, its text stays. That includes `<script>` and
//! `<style>`, whose text survives as escaped plain text.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{Options, Parser, html};

/// Tags that survive sanitizing.
pub const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "strong", "em", "u", "strike", "del", "ul",
    "ol", "li", "blockquote", "code", "pre", "a", "img", "table", "thead", "tbody", "tr", "th",
    "td",
];

/// Attributes allowed on any surviving tag.
pub const GENERIC_ATTRIBUTES: &[&str] = &["id", "class"];

const LINK_ATTRIBUTES: &[&str] = &["href", "title"];
const IMAGE_ATTRIBUTES: &[&str] = &["src", "alt", "title", "width", "height"];

/// Render markdown to HTML without any filtering.
pub fn markdown_to_html(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(content, options);
    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Render markdown and strip everything outside the allow-lists.
pub fn sanitize(content: &str) -> String {
    let rendered = markdown_to_html(content);

    let tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::from([
        ("a", LINK_ATTRIBUTES.iter().copied().collect()),
        ("img", IMAGE_ATTRIBUTES.iter().copied().collect()),
    ]);

    ammonia::Builder::default()
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .tag_attributes(tag_attributes)
        .generic_attributes(GENERIC_ATTRIBUTES.iter().copied().collect())
        .clean_content_tags(HashSet::new())
        .link_rel(None)
        .clean(&rendered)
        .to_string()
}
