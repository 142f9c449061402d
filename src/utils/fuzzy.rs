// Fuzzy matching for "did you mean" suggestions on field names

/// Levenshtein distance between two strings (single-character insertions,
/// deletions and substitutions)
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    // Two rolling rows are enough
    let mut prev: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut curr = vec![0; s2_chars.len() + 1];

    for (i, c1) in s1_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[s2_chars.len()]
}

/// Find candidates close to `search` (case-insensitive).
///
/// A candidate matches when its edit distance is within `max_distance`, or
/// when it contains the search text (scored by how many extra characters it
/// has). Returns up to 5 matches, closest first.
pub fn find_near_matches<S: AsRef<str>>(
    search: &str,
    candidates: &[S],
    max_distance: usize,
) -> Vec<(String, usize)> {
    let search_lower = search.to_lowercase();
    let mut matches: Vec<(String, usize)> = Vec::new();

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let candidate_lower = candidate.to_lowercase();

        let distance = levenshtein_distance(&search_lower, &candidate_lower);
        if distance <= max_distance {
            matches.push((candidate.to_string(), distance));
            continue;
        }

        if !search_lower.is_empty()
            && search_lower.len() < candidate_lower.len()
            && candidate_lower.contains(&search_lower)
        {
            let extra = candidate_lower.len() - search_lower.len();
            let substring_distance = if candidate_lower.starts_with(&search_lower) {
                extra
            } else {
                extra + 1
            };
            if substring_distance <= max_distance + 2 {
                matches.push((candidate.to_string(), substring_distance.min(max_distance)));
            }
        }
    }

    matches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    matches.into_iter().take(5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("same", "same"), 0);
        assert_eq!(levenshtein_distance("due-date", "duedate"), 1);
    }

    #[test]
    fn test_find_near_matches() {
        let keys = vec![
            "projects/Research.md".to_string(),
            "projects/Design.md".to_string(),
            "role.start".to_string(),
        ];

        let matches = find_near_matches("role.strat", &keys, 3);
        assert_eq!(matches[0].0, "role.start");

        let matches = find_near_matches("projects/reserch.md", &keys, 3);
        assert_eq!(matches[0].0, "projects/Research.md");

        // Prefix of a slightly longer key
        let matches = find_near_matches("projects/Design", &keys, 1);
        assert_eq!(matches[0].0, "projects/Design.md");

        assert!(find_near_matches("zzzzzzzz", &keys, 2).is_empty());
    }
}
