//! Fuzzy matching for "did you mean" hints and rule id shape checks.

/// Closest candidate by edit distance, compared case-insensitively.
///
/// Candidates further than half the longer string's length are too
/// dissimilar to be worth suggesting. Ties keep the first candidate.
pub(crate) fn fuzzy_match<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = input.to_lowercase();
    candidates
        .into_iter()
        .map(|c| (c, levenshtein(&needle, &c.to_lowercase())))
        .fold(None, |best: Option<(&'a str, usize)>, (c, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((c, d)),
        })
        .filter(|(c, d)| *d <= input.len().max(c.len()) / 2)
        .map(|(c, _)| c)
}

/// Edit distance (insertions, deletions, substitutions) over chars.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    // row[j] = distance between the processed prefix of `a` and b[..j]
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[b.len()]
}

/// `^[a-z0-9]+(-[a-z0-9]+)*$`
fn is_kebab_case(s: &str) -> bool {
    s.split('-').all(|part| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

/// A rule id is two or more kebab-case segments joined by dots.
pub(crate) fn is_dotted_rule_id(id: &str) -> bool {
    id.split('.').count() >= 2 && id.split('.').all(is_kebab_case)
}
