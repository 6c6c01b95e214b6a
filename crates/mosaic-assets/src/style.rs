//! Style rule namespacing.

use cssparser::{ParseError, Parser, ParserInput, Token};

/// Selectors that name the document root and are replaced by the namespace
/// class itself.
const ROOT_SELECTORS: &[&str] = &["html", "body", ":root"];

/// Scope every top-level style rule in `css` under the class `namespace`.
///
/// `.btn { color: red; }` becomes `.app-a .btn { color: red; }`. Selector
/// lists are scoped element by element, and root selectors (`html`, `body`,
/// `:root`) become the namespace class. At-rules, whether statements like
/// `@import` or blocks like `@media` and `@keyframes`, pass through
/// unchanged, as do comments. Declaration blocks are never touched.
///
/// ```rust
/// use mosaic_assets::scope_css;
///
/// assert_eq!(
///     scope_css(".btn { color: red; }", "app-a"),
///     ".app-a .btn { color: red; }"
/// );
/// ```
#[must_use]
pub fn scope_css(css: &str, namespace: &str) -> String {
    let mut out = String::with_capacity(css.len().saturating_add(64));
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    loop {
        let start = parser.position();
        let Ok(kind) = parser
            .next_including_whitespace_and_comments()
            .map(TokenKind::of)
        else {
            break;
        };

        match kind {
            TokenKind::Trivia | TokenKind::Semicolon => {},
            TokenKind::Block => skip_block(&mut parser),
            TokenKind::AtKeyword => skip_at_rule(&mut parser),
            TokenKind::Other => {
                if let Some(brace) = seek_block(&mut parser) {
                    skip_block(&mut parser);
                    let prelude = css.get(start.byte_index()..brace).unwrap_or_default();
                    out.push_str(&scope_prelude(prelude, namespace));
                    out.push_str(css.get(brace..parser.position().byte_index()).unwrap_or_default());
                    continue;
                }
                // Trailing text without a block.
            },
        }
        out.push_str(parser.slice_from(start));
    }
    out
}

/// Top-level token classes the scoper cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Trivia,
    Semicolon,
    AtKeyword,
    Block,
    Other,
}

impl TokenKind {
    fn of(token: &Token<'_>) -> Self {
        match token {
            Token::WhiteSpace(_)
            | Token::Comment(_)
            | Token::CDO
            | Token::CDC
            | Token::CloseCurlyBracket => Self::Trivia,
            Token::Semicolon => Self::Semicolon,
            Token::AtKeyword(_) => Self::AtKeyword,
            Token::CurlyBracketBlock => Self::Block,
            _ => Self::Other,
        }
    }
}

/// Consume the contents of the `{}` block just returned by the parser.
fn skip_block(parser: &mut Parser<'_, '_>) {
    let _ = parser.parse_nested_block(|block| {
        while block.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, ParseError<'_, ()>>(())
    });
}

/// Consume an at-rule up to its `;` or through its block.
fn skip_at_rule(parser: &mut Parser<'_, '_>) {
    loop {
        match parser
            .next_including_whitespace_and_comments()
            .map(TokenKind::of)
        {
            Ok(TokenKind::Block) => {
                skip_block(parser);
                return;
            },
            Ok(TokenKind::Semicolon) | Err(_) => return,
            Ok(_) => {},
        }
    }
}

/// Advance past the next top-level `{`, returning its byte offset.
fn seek_block(parser: &mut Parser<'_, '_>) -> Option<usize> {
    loop {
        match parser
            .next_including_whitespace_and_comments()
            .map(TokenKind::of)
        {
            Ok(TokenKind::Block) => {
                return Some(parser.position().byte_index().saturating_sub(1));
            },
            Ok(_) => {},
            Err(_) => return None,
        }
    }
}

/// Scope a selector list, keeping the whitespace that precedes `{`.
fn scope_prelude(prelude: &str, namespace: &str) -> String {
    let selectors = prelude.trim_end();
    let trailing = prelude.get(selectors.len()..).unwrap_or_default();
    let mut input = ParserInput::new(selectors);
    let mut parser = Parser::new(&mut input);
    let parts = parser
        .parse_comma_separated(|item| {
            let start = item.position();
            while item.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, ParseError<'_, ()>>(item.slice_from(start))
        })
        .unwrap_or_else(|_| vec![selectors]);
    let scoped: Vec<String> = parts
        .into_iter()
        .map(|selector| scope_selector(selector.trim(), namespace))
        .collect();
    format!("{}{trailing}", scoped.join(", "))
}

fn scope_selector(selector: &str, namespace: &str) -> String {
    if selector.is_empty() {
        return String::new();
    }
    for root in ROOT_SELECTORS {
        if let Some(rest) = strip_prefix_ignore_case(selector, root)
            && rest
                .chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '-' || c == '_'))
        {
            return format!(".{namespace}{rest}");
        }
    }
    format!(".{namespace} {selector}")
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_rule() {
        assert_eq!(
            scope_css(".btn { color: red; }", "app-a"),
            ".app-a .btn { color: red; }"
        );
    }

    #[test]
    fn test_selector_list_and_combinators() {
        assert_eq!(
            scope_css("h1,h2 > span, a[href^=\"x,y\"] {margin:0}", "ns"),
            ".ns h1, .ns h2 > span, .ns a[href^=\"x,y\"] {margin:0}"
        );
    }

    #[test]
    fn test_root_selectors() {
        assert_eq!(
            scope_css("body { margin: 0 }\nhtml.dark p { color: white }\n:root { --x: 1 }", "ns"),
            ".ns { margin: 0 }\n.ns.dark p { color: white }\n.ns { --x: 1 }"
        );
        assert_eq!(scope_css("bodyguard {}", "ns"), ".ns bodyguard {}");
    }

    #[test]
    fn test_media_block_passes_through() {
        let media = "@media (max-width: 600px) {\n  .btn { color: blue; }\n}";
        let css = format!("{media}\n.btn {{ color: red; }}");
        let scoped = scope_css(&css, "app-a");
        assert!(scoped.starts_with(media));
        assert!(scoped.ends_with(".app-a .btn { color: red; }"));
    }

    #[test]
    fn test_keyframes_and_statements_pass_through() {
        let css = "@import url(\"base.css\");\n@keyframes spin { from { opacity: 0 } to { opacity: 1 } }\n";
        assert_eq!(scope_css(css, "ns"), css);
    }

    #[test]
    fn test_comments_preserved() {
        assert_eq!(
            scope_css("/* header { } */\n.a { b: c } /* tail", "ns"),
            "/* header { } */\n.ns .a { b: c } /* tail"
        );
    }

    #[test]
    fn test_declarations_untouched() {
        let css = ".a { background: url(\"x{y}.png\"); content: \"}\" }\n.b { color: red }";
        assert_eq!(
            scope_css(css, "ns"),
            ".ns .a { background: url(\"x{y}.png\"); content: \"}\" }\n.ns .b { color: red }"
        );
    }

    #[test]
    fn test_nested_at_rules_byte_identical() {
        let css = "@supports (display: grid) {\n  @media screen { .g { display: grid } }\n}\n@font-face { font-family: \"X\"; src: url(x.woff) }";
        assert_eq!(scope_css(css, "ns"), css);
    }

    #[test]
    fn test_functional_pseudo_class_not_split() {
        assert_eq!(
            scope_css(":is(h1, h2) span, p::before { margin: 0 }", "ns"),
            ".ns :is(h1, h2) span, .ns p::before { margin: 0 }"
        );
    }

    #[test]
    fn test_unterminated_input() {
        assert_eq!(scope_css(".a { color: red", "ns"), ".ns .a { color: red");
        assert_eq!(scope_css("stray text", "ns"), "stray text");
        assert_eq!(scope_css("", "ns"), "");
    }
}
