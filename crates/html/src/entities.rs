use memchr::memchr;
use std::borrow::Cow;

/// Decode the small entity subset the tokenizer understands.
///
/// - Named: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
/// - Numeric, semicolon-terminated only: `&#169;` and `&#xA9;`.
///
/// Anything else (unknown names, missing `;`, surrogates, out-of-range
/// scalars) is copied through verbatim. Input without `&` is borrowed.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut i = first;
    while i < bytes.len() {
        let Some(rel) = memchr(b'&', &bytes[i..]) else {
            out.push_str(&s[i..]);
            break;
        };
        let amp = i + rel;
        out.push_str(&s[i..amp]);
        match decode_one(&s[amp + 1..]) {
            Some((ch, consumed)) => {
                out.push(ch);
                i = amp + 1 + consumed;
            }
            None => {
                out.push('&');
                i = amp + 1;
            }
        }
    }
    Cow::Owned(out)
}

const MAX_DEC_DIGITS: usize = 7; // 1114111
const MAX_HEX_DIGITS: usize = 6; // 10FFFF

/// Decodes the entity body following a `&`; returns the character and the
/// number of bytes consumed including the terminating `;`.
fn decode_one(rest: &str) -> Option<(char, usize)> {
    if let Some(numeric) = rest.strip_prefix('#') {
        let (digits, radix, prefix) = match numeric.as_bytes().first() {
            Some(b'x' | b'X') => (&numeric[1..], 16, 2),
            _ => (numeric, 10, 1),
        };
        let max = if radix == 16 { MAX_HEX_DIGITS } else { MAX_DEC_DIGITS };
        let end = digits
            .bytes()
            .take(max + 1)
            .position(|b| b == b';')?;
        let digits = &digits[..end];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let value = u32::from_str_radix(digits, radix).ok()?;
        let ch = char::from_u32(value)?;
        return Some((ch, prefix + end + 1));
    }

    const NAMED: [(&str, char); 6] = [
        ("amp;", '&'),
        ("lt;", '<'),
        ("gt;", '>'),
        ("quot;", '"'),
        ("apos;", '\''),
        ("nbsp;", '\u{a0}'),
    ];
    NAMED
        .iter()
        .find(|(name, _)| rest.starts_with(name))
        .map(|&(name, ch)| (ch, name.len()))
}

#[cfg(test)]
mod tests {
    use super::decode_entities;
    use std::borrow::Cow;

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(decode_entities("no entities"), Cow::Borrowed(_)));
    }

    #[test]
    fn decodes_named_and_numeric() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&quot;q&quot; &apos;"), "\"q\" '");
        assert_eq!(decode_entities("&#169; &#xA9; &#XA9;"), "\u{a9} \u{a9} \u{a9}");
        assert_eq!(decode_entities("x&nbsp;y"), "x\u{a0}y");
    }

    #[test]
    fn malformed_entities_pass_through() {
        assert_eq!(decode_entities("&amp"), "&amp");
        assert_eq!(decode_entities("&copy;"), "&copy;");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("&#12345678;"), "&#12345678;");
        assert_eq!(decode_entities("AT&T &"), "AT&T &");
    }
}
