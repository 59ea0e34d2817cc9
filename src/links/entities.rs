// src/links/entities.rs
// =============================================================================
// HTML entity decoding for attribute values.
//
// Reference strings in markup are often entity-encoded, the classic case being
// query strings: src="thumb.php?w=10&amp;h=20". Before such a string can be
// resolved and fetched it has to be turned back into plain text.
//
// Only the handful of named entities that show up in URLs are known; numeric
// references (&#38; / &#x26;) are decoded generically. Anything unrecognized
// is left exactly as written.
// =============================================================================

/// Decodes HTML entities in `input`.
///
/// Example: "a.php?x=1&amp;y=2" -> "a.php?x=1&y=2"
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(rel_amp) = input[cursor..].find('&') {
        let amp = cursor + rel_amp;
        out.push_str(&input[cursor..amp]);

        // Entities are short; don't let a lone '&' swallow a far-away ';'
        let rest = &input[amp + 1..];
        let semi = rest
            .char_indices()
            .take(10)
            .find(|&(_, c)| c == ';')
            .map(|(i, _)| i);

        match semi.and_then(|semi| decode_entity(&rest[..semi]).map(|c| (semi, c))) {
            Some((semi, decoded)) => {
                out.push(decoded);
                cursor = amp + 1 + semi + 1;
            }
            None => {
                out.push('&');
                cursor = amp + 1;
            }
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let value = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        assert_eq!(decode_entities("a.php?x=1&amp;y=2"), "a.php?x=1&y=2");
        assert_eq!(decode_entities("&lt;&gt;&quot;&apos;"), "<>\"'");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("a&#38;b&#x26;c"), "a&b&c");
    }

    #[test]
    fn test_unknown_entities_are_kept() {
        assert_eq!(decode_entities("a&bogus;b"), "a&bogus;b");
        assert_eq!(decode_entities("fish & chips; tasty"), "fish & chips; tasty");
        assert_eq!(decode_entities("trailing&"), "trailing&");
    }
}
