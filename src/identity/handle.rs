use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Unicode category Cf (format characters): bidi embeddings/marks, zero-width joiners, etc.
    static ref CF_CONTROL_REGEX: Regex = Regex::new(r"\p{Cf}").unwrap();
}

/// Canonicalizes a raw sender handle for cross-channel matching (§3, §4.B).
///
/// Phones become `tel:+<digits>` (bare 10-digit numbers get a `+1` prefix);
/// emails become `mailto:<lowercase>`. Idempotent: `f(f(x)) == f(x)`.
pub fn normalize_handle_for_matching(raw: &str) -> String {
    let stripped = CF_CONTROL_REGEX.replace_all(raw, "").to_string();
    let trimmed = stripped.trim();

    let lower = trimmed.to_lowercase();
    if lower.starts_with("mailto:") {
        return format!("mailto:{}", lower["mailto:".len()..].trim());
    }
    if trimmed.contains('@') {
        return format!("mailto:{}", lower);
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let has_plus = trimmed.contains('+');
    let with_prefix = if has_plus {
        digits
    } else if digits.len() == 10 {
        format!("1{}", digits)
    } else {
        digits
    };
    format!("tel:+{}", with_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_with_punctuation_and_country_code() {
        assert_eq!(normalize_handle_for_matching("+1 (410)925-6693"), "tel:+14109256693");
    }

    #[test]
    fn bare_ten_digit_phone_gets_plus_one() {
        assert_eq!(normalize_handle_for_matching("4109256693"), "tel:+14109256693");
    }

    #[test]
    fn email_is_lowercased_with_mailto_scheme() {
        assert_eq!(normalize_handle_for_matching("User@Example.COM"), "mailto:user@example.com");
    }

    #[test]
    fn existing_mailto_prefix_is_preserved_and_lowered() {
        assert_eq!(normalize_handle_for_matching("MAILTO:User@Example.com"), "mailto:user@example.com");
    }

    #[test]
    fn bidi_control_characters_are_stripped() {
        let with_controls = "+\u{202a}13169921361\u{202c}";
        let plain = "+13169921361";
        assert_eq!(normalize_handle_for_matching(with_controls), normalize_handle_for_matching(plain));
    }

    #[test]
    fn is_idempotent() {
        for raw in ["+1 (410)925-6693", "User@Example.COM", "4109256693", "tel:+14109256693"] {
            let once = normalize_handle_for_matching(raw);
            let twice = normalize_handle_for_matching(&once);
            assert_eq!(once, twice);
        }
    }
}
