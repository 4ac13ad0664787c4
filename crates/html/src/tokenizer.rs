//! Permissive pull tokenizer producing the events the tree builder consumes.
//!
//! Tag-name and attribute-name characters (ASCII only): `[A-Za-z0-9:_-]`, both
//! folded to lowercase.
//!
//! Known limitations:
//! - Not an HTML5 tokenizer: no parse-error reporting, no character-reference
//!   table beyond the handful in `entities`.
//! - A `<` that is not followed by a letter, `/`, `!` or `?` is plain text.
//! - `<?...>` and `<!...>` declarations other than comments, CDATA and doctype
//!   are skipped.
//! - Rawtext close tags accept only ASCII whitespace before `>`.
use crate::attributes::Attributes;
use crate::entities::decode_entities;
use crate::types::{Token, is_rawtext_element, is_void_element};
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";
const DOCTYPE_START: &[u8] = b"<!doctype";
const BOM: char = '\u{feff}';

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack
        .get(start..start + needle.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(needle))
}

fn opens_markup(bytes: &[u8], i: usize) -> bool {
    bytes
        .get(i + 1)
        .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

// Matches only start at ASCII `<`, which never occurs inside a UTF-8
// continuation byte, so the returned offsets are char boundaries.
fn find_rawtext_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let hay = haystack.as_bytes();
    let name = name.as_bytes();
    let len = hay.len();
    let mut i = 0;
    while i < len {
        i += memchr(b'<', &hay[i..])?;
        if hay.get(i + 1) == Some(&b'/') && starts_with_ignore_ascii_case_at(hay, i + 2, name) {
            let mut k = i + 2 + name.len();
            while k < len && hay[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && hay[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

/// Iterator over the tokens of one input string.
///
/// Slice endpoints are only ever taken at ASCII structural bytes or at the end
/// of input, so every slice stays on a UTF-8 boundary.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    rawtext: Option<String>,
    pending: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    /// A leading byte-order mark is dropped.
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.strip_prefix(BOM).unwrap_or(input),
            pos: 0,
            rawtext: None,
            pending: None,
        }
    }

    /// Byte offset of the next unread input.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn text(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        // bytes[start] is either text or a `<` that does not open markup.
        let mut i = start + 1;
        loop {
            match memchr(b'<', &bytes[i..]) {
                Some(rel) if opens_markup(bytes, i + rel) => {
                    i += rel;
                    break;
                }
                Some(rel) => i += rel + 1,
                None => {
                    i = bytes.len();
                    break;
                }
            }
        }
        self.pos = i;
        Token::Text(decode_entities(&self.input[start..i]).into_owned())
    }

    fn markup(&mut self) -> Option<Token> {
        let input = self.input;
        let bytes = input.as_bytes();
        let at = self.pos;
        let rest = &input[at..];

        if rest.starts_with(COMMENT_START) {
            let body_start = at + COMMENT_START.len();
            let (body_end, next) = match input[body_start..].find(COMMENT_END) {
                Some(rel) => (body_start + rel, body_start + rel + COMMENT_END.len()),
                None => (input.len(), input.len()),
            };
            self.pos = next;
            return Some(Token::Comment(input[body_start..body_end].to_string()));
        }
        if rest.starts_with(CDATA_START) {
            let body_start = at + CDATA_START.len();
            let (body_end, next) = match input[body_start..].find(CDATA_END) {
                Some(rel) => (body_start + rel, body_start + rel + CDATA_END.len()),
                None => (input.len(), input.len()),
            };
            self.pos = next;
            let body = &input[body_start..body_end];
            return (!body.is_empty()).then(|| Token::Text(body.to_string()));
        }
        if starts_with_ignore_ascii_case_at(bytes, at, DOCTYPE_START) {
            let body_start = at + DOCTYPE_START.len();
            let body_end = memchr(b'>', &bytes[body_start..]).map_or(bytes.len(), |r| body_start + r);
            self.pos = (body_end + 1).min(bytes.len());
            return Some(Token::Doctype(input[body_start..body_end].trim().to_string()));
        }
        match bytes[at + 1] {
            b'!' | b'?' => {
                self.pos = memchr(b'>', &bytes[at..]).map_or(bytes.len(), |r| at + r + 1);
                None
            }
            b'/' => self.end_tag(),
            _ => Some(self.start_tag()),
        }
    }

    fn end_tag(&mut self) -> Option<Token> {
        let bytes = self.input.as_bytes();
        let start = self.pos + 2;
        let mut j = start;
        while j < bytes.len() && is_name_char(bytes[j]) {
            j += 1;
        }
        let name = self.input[start..j].to_ascii_lowercase();
        self.pos = memchr(b'>', &bytes[j..]).map_or(bytes.len(), |r| j + r + 1);
        (!name.is_empty()).then_some(Token::EndTag(name))
    }

    fn start_tag(&mut self) -> Token {
        let input = self.input;
        let bytes = input.as_bytes();
        let len = bytes.len();
        let start = self.pos + 1;
        let mut k = start;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        let name = input[start..k].to_ascii_lowercase();
        let mut attributes = Attributes::new();
        let mut self_closing = false;

        let skip_whitespace = |k: &mut usize| {
            while *k < len && bytes[*k].is_ascii_whitespace() {
                *k += 1;
            }
        };

        loop {
            skip_whitespace(&mut k);
            if k >= len {
                break;
            }
            match bytes[k] {
                b'>' => {
                    k += 1;
                    break;
                }
                b'/' if bytes.get(k + 1) == Some(&b'>') => {
                    self_closing = true;
                    k += 2;
                    break;
                }
                b'/' => {
                    k += 1;
                    continue;
                }
                _ => {}
            }
            let name_start = k;
            while k < len && is_name_char(bytes[k]) {
                k += 1;
            }
            if name_start == k {
                k += 1;
                continue;
            }
            let attr_name = input[name_start..k].to_ascii_lowercase();

            skip_whitespace(&mut k);
            let value = if k < len && bytes[k] == b'=' {
                k += 1;
                skip_whitespace(&mut k);
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    k += 1;
                    let value_start = k;
                    k = memchr(quote, &bytes[k..]).map_or(len, |r| k + r);
                    let raw = &input[value_start..k];
                    if k < len {
                        k += 1;
                    }
                    decode_entities(raw).into_owned()
                } else {
                    let value_start = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        if bytes[k] == b'/' && bytes.get(k + 1) == Some(&b'>') {
                            break;
                        }
                        k += 1;
                    }
                    decode_entities(&input[value_start..k]).into_owned()
                }
            } else {
                String::new()
            };
            attributes.insert_if_absent(attr_name, value);
        }

        if is_void_element(&name) {
            self_closing = true;
        }
        self.pos = k;
        if !self_closing && is_rawtext_element(&name) {
            self.rawtext = Some(name.clone());
        }
        Token::StartTag {
            name,
            attributes,
            self_closing,
        }
    }

    /// Body of `<script>`/`<style>`. A missing close tag ends the element at
    /// end of input.
    fn rawtext_body(&mut self, name: String) -> Token {
        let (body_end, resume) = match find_rawtext_close_tag(&self.input[self.pos..], &name) {
            Some((start, end)) => (self.pos + start, self.pos + end),
            None => (self.input.len(), self.input.len()),
        };
        let body = &self.input[self.pos..body_end];
        self.pos = resume;
        let end = Token::EndTag(name);
        if body.is_empty() {
            end
        } else {
            self.pending = Some(end);
            Token::Text(body.to_string())
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        if let Some(name) = self.rawtext.take() {
            return Some(self.rawtext_body(name));
        }
        while self.pos < self.input.len() {
            if self.input.as_bytes()[self.pos] == b'<' && opens_markup(self.input.as_bytes(), self.pos) {
                if let Some(token) = self.markup() {
                    return Some(token);
                }
                continue;
            }
            return Some(self.text());
        }
        None
    }
}

pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}
