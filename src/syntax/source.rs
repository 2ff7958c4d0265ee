//! Locating dfn definitions in an APL source file.

use super::span::{Span, Spanned};

/// A top-level `name←{…}` definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dfn {
    pub name: String,
    /// The whole definition, `name←{…}`.
    pub source: String,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '∆' | '⍙')
}

/// Find every top-level dfn definition with balanced braces, in order.
///
/// Braces inside character literals and comments do not count. Definitions
/// nested inside another dfn are part of the enclosing one.
pub fn extract_dfns(text: &str) -> Vec<Spanned<Dfn>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut found = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].1 == '⍝' {
            i = skip_comment(&chars, i);
            continue;
        }
        if chars[i].1 == '\'' {
            i = skip_string(&chars, i);
            continue;
        }
        let starts_name = is_name_char(chars[i].1) && (i == 0 || !is_name_char(chars[i - 1].1));
        if !starts_name {
            i += 1;
            continue;
        }
        let name_end = i + chars[i..].iter().take_while(|(_, c)| is_name_char(*c)).count();
        match definition_end(&chars, name_end) {
            Some(end) => {
                let start_byte = chars[i].0;
                let end_byte = chars.get(end).map_or(text.len(), |(b, _)| *b);
                let name: String = chars[i..name_end].iter().map(|(_, c)| c).collect();
                found.push(Spanned::new(
                    Dfn {
                        name,
                        source: text[start_byte..end_byte].to_string(),
                    },
                    Span::new(start_byte as u32, end_byte as u32),
                ));
                i = end;
            }
            None => i = name_end,
        }
    }
    found
}

/// If `←{` follows position `i` (spaces allowed), the index just past the
/// matching `}`.
fn definition_end(chars: &[(usize, char)], mut i: usize) -> Option<usize> {
    let skip_spaces = |mut i: usize| {
        while i < chars.len() && chars[i].1 == ' ' {
            i += 1;
        }
        i
    };
    i = skip_spaces(i);
    if chars.get(i)?.1 != '←' {
        return None;
    }
    i = skip_spaces(i + 1);
    if chars.get(i)?.1 != '{' {
        return None;
    }
    let mut depth = 0usize;
    while i < chars.len() {
        match chars[i].1 {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            '\'' => {
                i = skip_string(chars, i);
                continue;
            }
            '⍝' => {
                i = skip_comment(chars, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past a `'…'` literal starting at `i` (`''` escapes a quote).
fn skip_string(chars: &[(usize, char)], i: usize) -> usize {
    let mut j = i + 1;
    while j < chars.len() {
        if chars[j].1 == '\'' {
            if chars.get(j + 1).map(|(_, c)| *c) == Some('\'') {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    j
}

fn skip_comment(chars: &[(usize, char)], i: usize) -> usize {
    let mut j = i;
    while j < chars.len() && chars[j].1 != '\n' {
        j += 1;
    }
    j
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        extract_dfns(text).into_iter().map(|d| d.node.name).collect()
    }

    #[test]
    fn test_extracts_definitions_in_order() {
        let text = "f←{2×⍵}\n\ngrad←{⍺+⍵}\n";
        let dfns = extract_dfns(text);
        assert_eq!(dfns.len(), 2);
        assert_eq!(dfns[0].node.name, "f");
        assert_eq!(dfns[0].node.source, "f←{2×⍵}");
        assert_eq!(dfns[1].node.source, "grad←{⍺+⍵}");
        assert_eq!(&text[dfns[1].span.range()], "grad←{⍺+⍵}");
    }

    #[test]
    fn test_nested_braces_stay_with_the_outer_dfn() {
        let text = "outer←{inner←{⍵} ⋄ inner ⍵}";
        let dfns = extract_dfns(text);
        assert_eq!(dfns.len(), 1);
        assert_eq!(dfns[0].node.source, text);
    }

    #[test]
    fn test_ignores_non_dfn_assignments_and_comments() {
        let text = "x←3\n⍝ g←{⍵}\nh←{⍵×''}'}'\n";
        assert_eq!(names(text), vec!["h".to_string()]);
    }

    #[test]
    fn test_braces_in_strings_do_not_count() {
        let text = "s←{'}'⍴⍵}";
        assert_eq!(extract_dfns(text)[0].node.source, text);
    }

    #[test]
    fn test_unbalanced_definition_is_skipped() {
        assert!(extract_dfns("f←{⍵+1").is_empty());
    }

    #[test]
    fn test_name_must_start_at_word_boundary() {
        assert_eq!(names("sum∆2←{+/⍵}"), vec!["sum∆2".to_string()]);
    }
}
