use std::borrow::Cow;
use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Display width of a string in terminal columns (CJK and emoji count as 2).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate `s` to at most `max_width` columns, appending "..." when cut.
///
/// Returns the input borrowed when it already fits. Widths of 3 or less get
/// a hard cut without ellipsis.
///
/// ```
/// use feedboard::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width <= ELLIPSIS.len() {
        (max_width, "")
    } else {
        (max_width - ELLIPSIS.len(), ELLIPSIS)
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Labels are scraped from arbitrary websites; rendering them raw would let a
/// feed move the cursor or retitle the terminal. Keeps `\t`, `\n` and `\r`.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| c == '\u{1b}' || c == '\u{7f}' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'));
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            match chars.peek() {
                // CSI: ESC [ params... final byte in 0x40..=0x7e
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: ESC ] ... terminated by BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\u{07}' {
                            break;
                        }
                        if n == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_unsafe(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Reduce an HTML snippet to plain text for the terminal.
///
/// Tags are dropped, block-level tags become line breaks, `<script>` and
/// `<style>` bodies are skipped, and the common entities are decoded. Runs of
/// blank lines collapse to one.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut skip_until: Option<&str> = None;

    while let Some(lt) = rest.find('<') {
        if skip_until.is_none() {
            push_decoded(&mut out, &rest[..lt]);
        }
        let Some(gt) = rest[lt..].find('>') else {
            rest = &rest[lt..];
            break;
        };
        let tag = rest[lt + 1..lt + gt].trim().to_ascii_lowercase();
        rest = &rest[lt + gt + 1..];

        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();

        if let Some(end) = skip_until {
            if tag.starts_with('/') && name == end {
                skip_until = None;
            }
            continue;
        }
        match name.as_str() {
            "script" if !tag.starts_with('/') => skip_until = Some("script"),
            "style" if !tag.starts_with('/') => skip_until = Some("style"),
            "br" | "p" | "div" | "li" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            | "blockquote" | "pre" | "ul" | "ol" | "table" => out.push('\n'),
            _ => {}
        }
    }
    if skip_until.is_none() {
        push_decoded(&mut out, rest);
    }

    let mut text = String::with_capacity(out.len());
    let mut blank_run = 0;
    for line in out.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || text.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        text.push_str(&line);
        text.push('\n');
    }
    text.trim_end().to_string()
}

fn push_decoded(out: &mut String, s: &str) {
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
}

/// Case-sensitive, locale-style string order.
///
/// Letters compare ignoring accents and case first, then accents, then case
/// with lowercase before uppercase, then by code point. So `apple < Apple <
/// banana < Zebra`, where a plain `str` compare puts every uppercase letter
/// first.
pub fn collate(a: &str, b: &str) -> Ordering {
    fn base(s: &str) -> impl Iterator<Item = char> + '_ {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
    }
    fn accented(s: &str) -> impl Iterator<Item = char> + '_ {
        s.nfd().flat_map(char::to_lowercase)
    }
    fn case(s: &str) -> impl Iterator<Item = bool> + '_ {
        s.chars()
            .filter(|c| c.is_alphabetic())
            .map(char::is_uppercase)
    }

    base(a)
        .cmp(base(b))
        .then_with(|| accented(a).cmp(accented(b)))
        .then_with(|| case(a).cmp(case(b)))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Short", 10), "Short");
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
    }

    #[test]
    fn test_cjk_truncation() {
        // 4 chars x 2 columns = 8; budget 7 - 3 = 4 columns
        assert_eq!(truncate_to_width("你好世界", 7), "你好...");
        assert_eq!(display_width("你好"), 4);
    }

    #[test]
    fn test_borrowed_when_fits() {
        assert!(matches!(truncate_to_width("fits", 4), Cow::Borrowed(_)));
        assert!(matches!(strip_control_chars("clean\ttext\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strips_ansi_sequences() {
        assert_eq!(strip_control_chars("a\x1b[31mred\x1b[0m b"), "ared b");
        assert_eq!(strip_control_chars("\x1b]0;title\x07x"), "x");
        assert_eq!(strip_control_chars("\x1b]0;title\x1b\\y"), "y");
        assert_eq!(strip_control_chars("bell\x07 del\x7f"), "bell del");
    }

    #[test]
    fn test_html_to_text() {
        let html = "<p>Hello &amp; <b>welcome</b></p><script>alert(1)</script><p>Line&#39;s two&nbsp;ok</p>";
        assert_eq!(html_to_text(html), "Hello & welcome\n\nLine's two ok");
    }

    #[test]
    fn test_html_to_text_keeps_unknown_entities() {
        assert_eq!(html_to_text("a &bogus; b & c"), "a &bogus; b & c");
        assert_eq!(html_to_text("x&#x41;y"), "xAy");
    }

    #[test]
    fn test_collate_orders_case_and_accents() {
        let mut words = vec!["banana", "Apple", "apple", "Zebra", "\u{e9}clair", "eclair"];
        words.sort_by(|a, b| collate(a, b));
        assert_eq!(
            words,
            vec!["apple", "Apple", "banana", "eclair", "\u{e9}clair", "Zebra"]
        );
        assert_eq!(collate("same", "same"), Ordering::Equal);
    }
}
