/// Misspellings and foreign keywords, checked in this order
pub const FIGLANG_HINTS: &[(&str, &str)] = &[
    ("saay", "say"),
    ("iff", "if"),
    ("iss", "is"),
    ("sayy", "say"),
    ("otherewise", "otherwise"),
    ("otherwisse", "otherwise"),
    ("repeet", "repeat"),
    ("tmes", "times"),
    ("timees", "times"),
    ("wheneever", "whenever"),
    ("untill", "until"),
    ("assk", "ask"),
    ("mor than", "is above"),
    ("more than", "is above"),
    ("less than", "is below"),
    ("greater than", "is above"),
    ("same as", "is"),
    ("equals", "is"),
    ("equal to", "is"),
    ("otherwise if", "but if"),
    ("else if", "but if"),
    ("else", "otherwise"),
    ("elif", "but if"),
    ("print", "say"),
    ("echo", "say"),
    ("input", "ask"),
    ("var", "just write: name is value"),
    ("let", "just write: name is value"),
    ("const", "just write: name is value"),
    ("def ", "zone called"),
    ("function", "zone called"),
    ("return", "give back"),
    ("while", "until"),
    ("for ", "for each"),
    ("foreach", "for each"),
];

/// Suggestions for every line containing a known slip
///
/// Matching is by substring on the trimmed, lower-cased line, so one line
/// may produce several suggestions.
pub fn suggest(source: &str) -> Vec<String> {
    let mut suggestions = Vec::new();
    for (number, line) in source.split('\n').enumerate() {
        let line = line.trim().to_lowercase();
        for (wrong, correct) in FIGLANG_HINTS {
            if line.contains(wrong) {
                suggestions.push(format!(
                    "  line {}: did you mean '{}' instead of '{}'?",
                    number + 1,
                    correct,
                    wrong
                ));
            }
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggests_in_order() {
        let hints = suggest("x is 1\nprint x");
        assert_eq!(hints, vec!["  line 2: did you mean 'say' instead of 'print'?"]);
    }

    #[test]
    fn test_one_line_many_hints() {
        let hints = suggest("ELSE IF x");
        assert_eq!(
            hints,
            vec![
                "  line 1: did you mean 'but if' instead of 'else if'?",
                "  line 1: did you mean 'otherwise' instead of 'else'?",
            ]
        );
    }

    #[test]
    fn test_clean_source_has_no_hints() {
        assert!(suggest("say \"hello\"\nrepeat 3 times: say it").is_empty());
    }
}
