//! Entry document parsing.

use std::fmt;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::error::{AssetError, AssetResult};

/// `type` values that mark a script as executable.
const SCRIPT_TYPES: &[&str] = &[
    "",
    "module",
    "text/javascript",
    "application/javascript",
    "text/ecmascript",
    "application/ecmascript",
    "application/x-javascript",
];

/// Script or style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Executable script.
    Script,
    /// Stylesheet.
    Style,
}

/// Where an asset's content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Absolute URL, resolved against the entry document.
    External(Url),
    /// Content embedded in the entry document.
    Inline {
        /// Position among inline assets of the same kind, in document order.
        index: usize,
        /// The embedded text.
        content: String,
    },
}

/// A script or style reference extracted from an entry document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Script or style.
    pub kind: AssetKind,
    /// External URL or inline content.
    pub origin: AssetOrigin,
}

impl AssetRef {
    /// The absolute URL, for external assets.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        match &self.origin {
            AssetOrigin::External(url) => Some(url),
            AssetOrigin::Inline { .. } => None,
        }
    }

    /// Whether the content is embedded in the entry document.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.origin, AssetOrigin::Inline { .. })
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            AssetOrigin::External(url) => write!(f, "{url}"),
            AssetOrigin::Inline { index, .. } => write!(f, "inline#{index}"),
        }
    }
}

/// The parts of an entry document.
#[derive(Debug, Clone)]
pub struct EntryAssets {
    /// The entry location.
    pub entry: Url,
    /// Base URL that references were resolved against.
    pub base: Url,
    /// Script references in document order.
    pub scripts: Vec<AssetRef>,
    /// Style references in document order.
    pub styles: Vec<AssetRef>,
    /// Body markup with extracted elements removed.
    pub html_body: String,
    /// Recoverable problems found while parsing.
    pub diagnostics: Vec<AssetError>,
}

/// Parse an entry document.
///
/// Scripts and stylesheets (external and inline) are collected in document
/// order and removed from the markup; everything else in `<body>` becomes
/// [`EntryAssets::html_body`]. External references resolve against
/// `<base href>` when present, otherwise against `entry`. A reference that
/// cannot be resolved is skipped and recorded as a diagnostic.
///
/// # Errors
///
/// Only fails if an internal selector cannot be compiled.
pub fn parse_entry(entry: &Url, html: &str) -> AssetResult<EntryAssets> {
    let source = expand_self_closing_scripts(html);
    let mut document = Html::parse_document(&source);
    let mut diagnostics = Vec::new();

    let base = resolve_base(entry, &document, &mut diagnostics)?;

    let mut scripts = Vec::new();
    let mut styles = Vec::new();
    let mut extracted = Vec::new();
    let mut inline_scripts = 0_usize;
    let mut inline_styles = 0_usize;

    for element in document.select(&selector(entry, "script, style, link")?) {
        let node = element.value();
        match node.name() {
            "script" => {
                if !is_executable(node.attr("type")) {
                    continue;
                }
                extracted.push(element.id());
                if let Some(src) = node.attr("src") {
                    if let Some(url) = join(&base, src, &mut diagnostics) {
                        scripts.push(AssetRef {
                            kind: AssetKind::Script,
                            origin: AssetOrigin::External(url),
                        });
                    }
                } else if let Some(content) = inline_text(element) {
                    scripts.push(AssetRef {
                        kind: AssetKind::Script,
                        origin: AssetOrigin::Inline {
                            index: inline_scripts,
                            content,
                        },
                    });
                    inline_scripts = inline_scripts.saturating_add(1);
                }
            },
            "style" => {
                extracted.push(element.id());
                if let Some(content) = inline_text(element) {
                    styles.push(AssetRef {
                        kind: AssetKind::Style,
                        origin: AssetOrigin::Inline {
                            index: inline_styles,
                            content,
                        },
                    });
                    inline_styles = inline_styles.saturating_add(1);
                }
            },
            _ => {
                let is_stylesheet = node.attr("rel").is_some_and(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                });
                let Some(href) = node.attr("href").filter(|_| is_stylesheet) else {
                    continue;
                };
                extracted.push(element.id());
                if let Some(url) = join(&base, href, &mut diagnostics) {
                    styles.push(AssetRef {
                        kind: AssetKind::Style,
                        origin: AssetOrigin::External(url),
                    });
                }
            },
        }
    }

    for id in extracted {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let html_body = document
        .select(&selector(entry, "body")?)
        .next()
        .map(|body| body.inner_html().trim().to_string())
        .unwrap_or_default();

    debug!(
        entry = %entry,
        scripts = scripts.len(),
        styles = styles.len(),
        diagnostics = diagnostics.len(),
        "Parsed entry document"
    );

    Ok(EntryAssets {
        entry: entry.clone(),
        base,
        scripts,
        styles,
        html_body,
        diagnostics,
    })
}

fn selector(entry: &Url, css: &str) -> AssetResult<Selector> {
    Selector::parse(css).map_err(|e| AssetError::Parse {
        url: entry.to_string(),
        reason: format!("invalid selector '{css}': {e}"),
    })
}

fn resolve_base(
    entry: &Url,
    document: &Html,
    diagnostics: &mut Vec<AssetError>,
) -> AssetResult<Url> {
    let href = document
        .select(&selector(entry, "base[href]")?)
        .next()
        .and_then(|base| base.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());
    Ok(href
        .and_then(|href| join(entry, href, diagnostics))
        .unwrap_or_else(|| entry.clone()))
}

fn join(base: &Url, reference: &str, diagnostics: &mut Vec<AssetError>) -> Option<Url> {
    match base.join(reference.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(base = %base, reference, error = %e, "Skipping unresolvable reference");
            diagnostics.push(AssetError::Parse {
                url: base.to_string(),
                reason: format!("cannot resolve '{reference}': {e}"),
            });
            None
        },
    }
}

fn is_executable(script_type: Option<&str>) -> bool {
    let script_type = script_type.unwrap_or_default().trim().to_ascii_lowercase();
    SCRIPT_TYPES.contains(&script_type.as_str())
}

fn inline_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element.text().collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Elements whose content the HTML tokenizer reads as raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Rewrite `<script .../>` as `<script ...></script>`.
///
/// HTML parsers ignore the self-closing slash on `<script>`, which would
/// swallow the following markup as script text. Only tags in markup are
/// rewritten: comments and raw-text element content are copied as is.
fn expand_self_closing_scripts(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut copied = 0_usize;
    let mut cursor = 0_usize;

    while let Some(offset) = lower.get(cursor..).and_then(|rest| rest.find('<')) {
        let start = cursor.saturating_add(offset);
        let rest = lower.get(start..).unwrap_or_default();

        if rest.starts_with("<!--") {
            cursor = rest
                .get(4..)
                .and_then(|body| body.find("-->"))
                .map_or(html.len(), |end| start.saturating_add(end).saturating_add(7));
            continue;
        }
        let Some(name) = start_tag_name(rest) else {
            cursor = start.saturating_add(1);
            continue;
        };
        let Some(end) = tag_end(html, start) else {
            break;
        };

        let tag = html.get(start..end).unwrap_or_default();
        let before_close = tag.get(..tag.len().saturating_sub(1)).unwrap_or_default();
        if name == "script"
            && let Some(open) = before_close.trim_end().strip_suffix('/')
        {
            out.push_str(html.get(copied..start).unwrap_or_default());
            out.push_str(open.trim_end());
            out.push_str("></script>");
            copied = end;
            cursor = end;
        } else if RAW_TEXT_ELEMENTS.contains(&name) {
            cursor = raw_text_end(&lower, end, name);
        } else {
            cursor = end;
        }
    }
    out.push_str(html.get(copied..).unwrap_or_default());
    out
}

/// Lowercased name of the start tag opening `rest`, if it is one.
fn start_tag_name(rest: &str) -> Option<&str> {
    let body = rest.strip_prefix('<')?;
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let len = body
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(body.len());
    body.get(..len)
}

/// Index of the end tag closing raw-text element `name`, searching from
/// `from`, or the end of input.
fn raw_text_end(lower: &str, from: usize, name: &str) -> usize {
    let needle = format!("</{name}");
    let mut search = from;
    while let Some(offset) = lower.get(search..).and_then(|rest| rest.find(&needle)) {
        let at = search.saturating_add(offset);
        let after = at.saturating_add(needle.len());
        let boundary = lower
            .get(after..)
            .and_then(|rest| rest.chars().next())
            .is_none_or(|c| c.is_ascii_whitespace() || c == '/' || c == '>');
        if boundary {
            return at;
        }
        search = after;
    }
    lower.len()
}

/// Index just past the `>` closing the tag opened at `start`.
fn tag_end(html: &str, start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in html.bytes().enumerate().skip(start) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {},
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i.saturating_add(1)),
            None => {},
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Url {
        Url::parse("http://x/a/index.html").unwrap()
    }

    fn external(asset: &AssetRef) -> &str {
        asset.url().unwrap().as_str()
    }

    #[test]
    fn test_scripts_in_document_order() {
        let html = r#"<html><head>
            <script src="vendor.js"></script>
        </head><body>
            <div id="root"></div>
            <script>window.boot = true;</script>
            <script src="/static/app.js"></script>
        </body></html>"#;
        let parsed = parse_entry(&entry(), html).unwrap();

        assert_eq!(parsed.scripts.len(), 3);
        assert_eq!(external(&parsed.scripts[0]), "http://x/a/vendor.js");
        assert_eq!(
            parsed.scripts[1].origin,
            AssetOrigin::Inline {
                index: 0,
                content: "window.boot = true;".into()
            }
        );
        assert_eq!(external(&parsed.scripts[2]), "http://x/static/app.js");
        assert_eq!(parsed.html_body, r#"<div id="root"></div>"#);
    }

    #[test]
    fn test_attribute_order_and_self_closing() {
        let html = r#"<body>
            <script type="text/javascript" src="one.js"/>
            <script src='two.js' defer type="module"></script>
            <SCRIPT>inline()</SCRIPT>
        </body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();

        assert_eq!(parsed.scripts.len(), 3);
        assert_eq!(external(&parsed.scripts[0]), "http://x/a/one.js");
        assert_eq!(external(&parsed.scripts[1]), "http://x/a/two.js");
        assert!(parsed.scripts[2].is_inline());
        assert!(parsed.html_body.is_empty());
    }

    #[test]
    fn test_styles_in_document_order() {
        let html = r#"<head>
            <link href="theme.css" rel="stylesheet">
            <link rel="icon" href="favicon.ico">
            <style>.title { color: blue; }</style>
        </head><body><h1 class="title">Hi</h1></body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();

        assert_eq!(parsed.styles.len(), 2);
        assert_eq!(external(&parsed.styles[0]), "http://x/a/theme.css");
        assert_eq!(parsed.styles[1].to_string(), "inline#0");
        assert_eq!(parsed.styles[1].kind, AssetKind::Style);
        assert_eq!(parsed.html_body, r#"<h1 class="title">Hi</h1>"#);
    }

    #[test]
    fn test_non_executable_scripts_stay_in_markup() {
        let html = r#"<body><script type="text/template"><p>row</p></script></body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();
        assert!(parsed.scripts.is_empty());
        assert!(parsed.html_body.contains("text/template"));
    }

    #[test]
    fn test_base_href() {
        let html = r#"<head><base href="https://cdn.example/app/"></head>
            <body><script src="main.js"></script></body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();
        assert_eq!(parsed.base.as_str(), "https://cdn.example/app/");
        assert_eq!(external(&parsed.scripts[0]), "https://cdn.example/app/main.js");
    }

    #[test]
    fn test_unresolvable_reference_is_diagnostic() {
        let html = r#"<body><script src="http://[bad"></script><script src="ok.js"></script></body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();
        assert_eq!(parsed.scripts.len(), 1);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(matches!(parsed.diagnostics[0], AssetError::Parse { .. }));
    }

    #[test]
    fn test_fragment_without_sections() {
        let parsed = parse_entry(&entry(), "just text").unwrap();
        assert!(parsed.scripts.is_empty());
        assert!(parsed.styles.is_empty());
        assert_eq!(parsed.html_body, "just text");
    }

    #[test]
    fn test_expand_self_closing() {
        assert_eq!(
            expand_self_closing_scripts(r#"<script src="a.js" /><p>x</p>"#),
            r#"<script src="a.js"></script><p>x</p>"#
        );
        assert_eq!(
            expand_self_closing_scripts(r#"<script data-x="/>">y</script>"#),
            r#"<script data-x="/>">y</script>"#
        );
        assert_eq!(
            expand_self_closing_scripts("<script-loader/><!-- <script src=c.js/> -->"),
            "<script-loader/><!-- <script src=c.js/> -->"
        );
        assert_eq!(
            expand_self_closing_scripts("<style>a::after { content: '<script/>' }</style>"),
            "<style>a::after { content: '<script/>' }</style>"
        );
    }

    #[test]
    fn test_script_markup_inside_inline_script_kept() {
        let html = r#"<body><div id="root"></div><script>var t = '<script src="x.js"/>'; boot();</script></body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();

        assert_eq!(parsed.scripts.len(), 1);
        assert_eq!(
            parsed.scripts[0].origin,
            AssetOrigin::Inline {
                index: 0,
                content: r#"var t = '<script src="x.js"/>'; boot();"#.into()
            }
        );
        assert_eq!(parsed.html_body, r#"<div id="root"></div>"#);
    }

    #[test]
    fn test_self_closing_after_inline_script() {
        let html = r#"<body><script>let a = "</scripts>";</script><script src="b.js"/><p>x</p></body>"#;
        let parsed = parse_entry(&entry(), html).unwrap();

        assert_eq!(parsed.scripts.len(), 2);
        assert_eq!(external(&parsed.scripts[1]), "http://x/a/b.js");
        assert_eq!(parsed.html_body, "<p>x</p>");
    }
}
