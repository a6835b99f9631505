//! Text folding for comparisons that must ignore case, diacritics and spacing.

/// Fold a string for comparison: lowercase, strip Polish diacritics and
/// collapse runs of whitespace into single spaces.
///
/// `"  Straszny  DWÓR "` and `"straszny dwor"` fold to the same value.
pub fn fold(s: &str) -> String {
    let lowered: String = s.to_lowercase().chars().map(strip_diacritic).collect();
    collapse_whitespace(&lowered)
}

/// Collapse whitespace runs (including non-breaking spaces) and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_diacritic(c: char) -> char {
    match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        'á' | 'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'ě' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ú' | 'ù' | 'û' | 'ü' | 'ů' => 'u',
        'ö' | 'ô' | 'ò' => 'o',
        'č' => 'c',
        'š' => 's',
        'ž' => 'z',
        'ř' => 'r',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_removes_polish_diacritics() {
        assert_eq!(fold("Straszny Dwór"), "straszny dwor");
        assert_eq!(fold("ŁÓDŹ"), "lodz");
        assert_eq!(fold("Opera Śląska"), "opera slaska");
    }

    #[test]
    fn test_fold_collapses_whitespace() {
        assert_eq!(fold("  HALKA \n\t premiera "), "halka premiera");
        assert_eq!(fold("Halka\u{a0}-\u{a0}opera"), "halka - opera");
    }

    #[test]
    fn test_collapse_whitespace_keeps_case() {
        assert_eq!(collapse_whitespace(" 7  maja,\nCz "), "7 maja, Cz");
    }
}
