// src/pipeline/css_scan.rs

//! Just enough CSS tokenizing to find declarations in source text.
//!
//! Strings, comments and parentheses are skipped so that `;`, `{` and `}`
//! inside them do not split anything. Only blocks opened by a selector
//! (style rules, nested rules, keyframe steps) yield declarations;
//! at-rule blocks such as `@media` are descended into, and descriptor
//! blocks such as `@font-face` are ignored.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Style,
    AtRule,
}

/// Byte ranges of every declaration inside a style rule, trimmed of
/// surrounding whitespace, in source order.
pub(crate) fn declaration_spans(css: &str) -> Vec<Range<usize>> {
    let bytes = css.as_bytes();
    let mut spans = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();
    let mut segment_start = 0;
    let mut parens = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = css[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| i + 2 + end + 2);
                continue;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'\\' => i += 1,
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b'{' if parens == 0 => {
                let prelude = css[segment_start..i].trim_start();
                blocks.push(if prelude.starts_with('@') {
                    Block::AtRule
                } else {
                    Block::Style
                });
                segment_start = i + 1;
            }
            b';' | b'}' if parens == 0 => {
                if blocks.last() == Some(&Block::Style) {
                    if let Some(span) = trim(css, segment_start..i) {
                        if css[span.clone()].contains(':') {
                            spans.push(span);
                        }
                    }
                }
                if bytes[i] == b'}' {
                    blocks.pop();
                    parens = 0;
                }
                segment_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    spans
}

fn trim(css: &str, range: Range<usize>) -> Option<Range<usize>> {
    let text = &css[range.clone()];
    let start = range.start + (text.len() - text.trim_start().len());
    let end = range.end - (text.len() - text.trim_end().len());
    (start < end).then_some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declarations(css: &str) -> Vec<&str> {
        declaration_spans(css).into_iter().map(|r| &css[r]).collect()
    }

    #[test]
    fn compressed_rules() {
        assert_eq!(
            declarations("body{color:red;margin:0 0 0 0}.b{color:red}"),
            vec!["color:red", "margin:0 0 0 0", "color:red"]
        );
    }

    #[test]
    fn expanded_rules_are_trimmed() {
        let css = "a:hover {\n  color: red;\n  user-select: none !important;\n}\n";
        assert_eq!(
            declarations(css),
            vec!["color: red", "user-select: none !important"]
        );
    }

    #[test]
    fn media_blocks_are_entered_and_descriptors_skipped() {
        let css = "@import url(x.css);@font-face{font-family:x;src:url(a.woff)}\
                   @media (min-width:10px){.a{display:flex}}\
                   @keyframes k{from{opacity:0}to{opacity:1}}";
        assert_eq!(
            declarations(css),
            vec!["display:flex", "opacity:0", "opacity:1"]
        );
    }

    #[test]
    fn strings_comments_and_urls_do_not_split() {
        let css = r#".a{content:"};{";background:url(data:image/png;base64,AA==)/*;}*/;color:red}"#;
        assert_eq!(
            declarations(css),
            vec![
                r#"content:"};{""#,
                "background:url(data:image/png;base64,AA==)/*;}*/",
                "color:red"
            ]
        );
    }

    #[test]
    fn nested_rules() {
        assert_eq!(
            declarations(".a{color:red;&:hover{color:blue}}"),
            vec!["color:red", "color:blue"]
        );
    }
}
