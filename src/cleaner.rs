use crate::constants::constants;

/// Normalize raw review text: line-break markup becomes a space, surrounding
/// whitespace is trimmed, missing text becomes an empty string.
pub fn clean_comment(raw: Option<&str>) -> String {
    let mut text = raw.unwrap_or("").to_string();

    // Repeat until stable so fragments like "<br<br>>" cannot reassemble markup
    loop {
        let replaced = constants::LINE_BREAK_MARKUP
            .iter()
            .fold(text.clone(), |acc, markup| acc.replace(markup, " "));
        if replaced == text {
            break;
        }
        text = replaced;
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_line_breaks() {
        assert_eq!(
            clean_comment(Some("Great place, very clean!<br/>Loved it.")),
            "Great place, very clean! Loved it."
        );
        assert_eq!(clean_comment(Some("a<br>b<br />c")), "a b c");
    }

    #[test]
    fn test_missing_and_blank() {
        assert_eq!(clean_comment(None), "");
        assert_eq!(clean_comment(Some("  <br/>  ")), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "  Nice host<br/><br/>",
            "<br<br>>",
            "<br<br>/>",
            "<br<br/> />tail",
            "\tplain text\n",
            "",
        ];
        for input in inputs {
            let once = clean_comment(Some(input));
            assert_eq!(clean_comment(Some(&once)), once, "input: {:?}", input);
        }
    }
}
