//! Typewriter: re-types a window's rich text one character at a time

use crate::entity::EntityId;

/// Elements that never have children
const VOID_ELEMENTS: [&str; 8] = ["br", "img", "hr", "input", "meta", "link", "wbr", "source"];

/// Rich text flattened to characters plus a per-character bold flag
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatText {
    chars: Vec<char>,
    bold: Vec<bool>,
}

impl FlatText {
    /// Number of characters, line breaks included
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Check if there are no characters at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Check if there is nothing but whitespace to type
    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    /// Flattened characters
    #[inline]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Bold flag per character
    #[inline]
    pub fn bold_map(&self) -> &[bool] {
        &self.bold
    }

    fn push(&mut self, c: char, bold: bool) {
        self.chars.push(c);
        self.bold.push(bold);
    }
}

/// Decode one character reference body (the part between `&` and `;`)
fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Byte offset of the `>` closing the tag at the start of `rest`, skipping quoted attribute values
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Flatten markup into characters and a bold map
///
/// A character is bold only when its direct parent element is `<b>`;
/// every `<br>` contributes a non-bold `'\n'`. Comments are dropped and
/// unknown entities are kept literally.
pub fn flatten_markup(markup: &str) -> FlatText {
    let mut text = FlatText::default();
    let mut stack: Vec<String> = Vec::new();
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        match c {
            '<' => {
                if let Some(body) = rest.strip_prefix("<!--") {
                    rest = body.find("-->").map_or("", |end| &body[end + 3..]);
                    continue;
                }
                let Some(end) = tag_end(rest) else {
                    // Unterminated tag: treat the rest as text
                    for ch in rest.chars() {
                        text.push(ch, stack.last().is_some_and(|t| t == "b"));
                    }
                    break;
                };
                let tag = rest[1..end].trim();
                rest = &rest[end + 1..];

                if let Some(closing) = tag.strip_prefix('/') {
                    let name = closing.trim().to_ascii_lowercase();
                    if let Some(pos) = stack.iter().rposition(|t| *t == name) {
                        stack.truncate(pos);
                    }
                    continue;
                }
                if tag.starts_with('!') || tag.starts_with('?') {
                    continue;
                }

                let name: String = tag
                    .split(|ch: char| ch.is_whitespace() || ch == '/')
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                if name == "br" {
                    text.push('\n', false);
                }
                let self_closing = tag.ends_with('/') || VOID_ELEMENTS.contains(&name.as_str());
                if !self_closing && !name.is_empty() {
                    stack.push(name);
                }
            }
            '&' => {
                let decoded = rest
                    .find(';')
                    .filter(|end| *end <= 10)
                    .and_then(|end| decode_entity(&rest[1..end]).map(|ch| (ch, end)));
                let bold = stack.last().is_some_and(|t| t == "b");
                match decoded {
                    Some((ch, end)) => {
                        text.push(ch, bold);
                        rest = &rest[end + 1..];
                    }
                    None => {
                        text.push('&', bold);
                        rest = &rest[1..];
                    }
                }
            }
            _ => {
                text.push(c, stack.last().is_some_and(|t| t == "b"));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    text
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '\u{a0}' => out.push_str("&nbsp;"),
        _ => out.push(c),
    }
}

/// Markup for the first `count` characters, with bold runs re-opened and closed
pub fn render_prefix(text: &FlatText, count: usize) -> String {
    let mut out = String::new();
    let mut in_bold = false;

    for (&c, &bold) in text.chars.iter().zip(&text.bold).take(count) {
        if bold && !in_bold {
            out.push_str("<b>");
            in_bold = true;
        }
        if !bold && in_bold {
            out.push_str("</b>");
            in_bold = false;
        }
        if c == '\n' {
            out.push_str(if in_bold { "</b><br><b>" } else { "<br>" });
        } else {
            push_escaped(&mut out, c);
        }
    }
    if in_bold {
        out.push_str("</b>");
    }
    out
}

/// Result of one typing step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeStep {
    /// Markup to show, caret still visible
    Partial(String),
    /// Typing finished: the original markup, caret removed
    Done(String),
}

/// Typing state for one window
#[derive(Clone, Debug)]
pub struct Typewriter {
    entity: EntityId,
    original: String,
    text: FlatText,
    typed: usize,
}

impl Typewriter {
    /// Prepare to re-type `markup`
    pub fn new(entity: EntityId, markup: &str) -> Self {
        Self {
            entity,
            original: markup.to_string(),
            text: flatten_markup(markup),
            typed: 0,
        }
    }

    /// Entity being typed
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Markup restored when typing finishes
    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Flattened text
    #[inline]
    pub fn text(&self) -> &FlatText {
        &self.text
    }

    /// Check if there is nothing worth typing
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.text.is_blank()
    }

    /// Type the next character, or finish
    pub fn step(&mut self) -> TypeStep {
        if self.typed >= self.text.len() {
            return TypeStep::Done(self.original.clone());
        }
        self.typed += 1;
        TypeStep::Partial(render_prefix(&self.text, self.typed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_bold_map() {
        let text = flatten_markup("A<b>BC</b>D");
        assert_eq!(text.chars(), &['A', 'B', 'C', 'D']);
        assert_eq!(text.bold_map(), &[false, true, true, false]);
    }

    #[test]
    fn test_flatten_direct_parent_only() {
        let text = flatten_markup("<b><a href=\"/x\">x</a>y</b>");
        assert_eq!(text.chars(), &['x', 'y']);
        assert_eq!(text.bold_map(), &[false, true]);
    }

    #[test]
    fn test_flatten_quoted_angle_in_attribute() {
        let text = flatten_markup("<p><a title=\"x>y\" data-k='a>b'>go</a> <b class=\"c\">now</b></p>");
        let s: String = text.chars().iter().collect();
        assert_eq!(s, "go now");
        assert_eq!(text.bold_map(), &[false, false, false, true, true, true]);
    }

    #[test]
    fn test_flatten_line_breaks_and_entities() {
        let text = flatten_markup("<p>Hi&nbsp;there<br/>me &amp; you &bogus;</p><!-- note -->");
        let s: String = text.chars().iter().collect();
        assert_eq!(s, "Hi\u{a0}there\nme & you &bogus;");
        let newline = s.chars().position(|c| c == '\n').unwrap();
        assert!(!text.bold_map()[newline]);
    }

    #[test]
    fn test_flatten_numeric_entities() {
        let text = flatten_markup("&#65;&#x42;");
        assert_eq!(text.chars(), &['A', 'B']);
    }

    #[test]
    fn test_render_prefix_closes_bold() {
        let text = flatten_markup("A<b>BC</b>D");
        assert_eq!(render_prefix(&text, 1), "A");
        assert_eq!(render_prefix(&text, 2), "A<b>B</b>");
        assert_eq!(render_prefix(&text, 4), "A<b>BC</b>D");
    }

    #[test]
    fn test_render_prefix_break_inside_bold_run() {
        let text = flatten_markup("<b>x<br>y</b>");
        assert_eq!(text.bold_map(), &[true, false, true]);
        assert_eq!(render_prefix(&text, 3), "<b>x</b><br><b>y</b>");
    }

    #[test]
    fn test_render_prefix_escapes() {
        let text = flatten_markup("a &lt; b");
        assert_eq!(render_prefix(&text, 5), "a &lt; b");
    }

    #[test]
    fn test_typewriter_restores_original_exactly() {
        let markup = "<p>Hello <b>world</b></p>\n<p>bye<br></p>";
        let mut tw = Typewriter::new(EntityId::About, markup);
        let mut steps = 0;
        let done = loop {
            match tw.step() {
                TypeStep::Partial(_) => steps += 1,
                TypeStep::Done(html) => break html,
            }
        };
        assert_eq!(steps, tw.text().len());
        assert_eq!(done, markup);
    }

    #[test]
    fn test_blank_text() {
        assert!(Typewriter::new(EntityId::Contact, "  <p> </p>\n").is_blank());
        assert!(!Typewriter::new(EntityId::Contact, "<p>x</p>").is_blank());
        assert!(flatten_markup("").is_empty());
    }
}
