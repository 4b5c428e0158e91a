//! Naming conventions: type names -> snake_case columns, plural forms and dasherized slugs.

/// Convert an identifier from camelCase or PascalCase to snake_case.
/// e.g. "userId" -> "user_id", "OrderItem" -> "order_item"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower_or_digit = false;
        } else if c == '-' || c == ' ' {
            out.push('_');
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Convert an identifier to kebab-case (URL-safe).
/// e.g. "OrderItems" -> "order-items", "pending_invitations" -> "pending-invitations"
pub fn to_kebab_case(s: &str) -> String {
    to_snake_case(s).replace('_', "-")
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

/// English plural of the last word in a (Pascal-cased) type name.
/// e.g. "Category" -> "Categories", "Address" -> "Addresses", "Person" -> "People"
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let split = last_word_start(word);
    let (head, last) = word.split_at(split);
    let lower = last.to_lowercase();

    for (singular, plural) in IRREGULAR {
        if lower == *singular {
            return format!("{}{}", head, match_capitalization(last, plural));
        }
    }

    let plural_tail = if lower.ends_with("ss")
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("us")
    {
        format!("{}es", last)
    } else if lower.ends_with('s') {
        last.to_string()
    } else if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        format!("{}ies", &last[..last.len() - 1])
    } else {
        format!("{}s", last)
    };
    format!("{}{}", head, plural_tail)
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

/// Byte index where the last PascalCase/snake_case word begins.
fn last_word_start(word: &str) -> usize {
    let mut start = 0;
    for (i, c) in word.char_indices() {
        if i > 0 && c.is_uppercase() {
            start = i;
        } else if c == '_' || c == '-' || c == ' ' {
            start = i + c.len_utf8();
        }
    }
    start
}

fn match_capitalization(original: &str, replacement: &str) -> String {
    if original.chars().next().map(char::is_uppercase).unwrap_or(false) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}
