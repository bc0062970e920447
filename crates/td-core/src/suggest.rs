//! "Did you mean" suggestions for mistyped topic names.

/// Known names that look like `target`, best match first.
///
/// A name matches when it is within a small edit distance of `target`
/// (case-insensitive) or starts with it. Ties are broken by name.
pub fn similar(names: &[String], target: &str) -> Vec<String> {
    let wanted = target.to_lowercase();
    let budget = (wanted.chars().count() / 3).max(2);

    let mut scored: Vec<(usize, &String)> = names
        .iter()
        .filter_map(|name| {
            let candidate = name.to_lowercase();
            let distance = levenshtein(&wanted, &candidate);
            if distance <= budget || (!wanted.is_empty() && candidate.starts_with(&wanted)) {
                Some((distance, name))
            } else {
                None
            }
        })
        .collect();

    scored.sort();
    scored.into_iter().map(|(_, name)| name.clone()).collect()
}

/// Edit distance between two strings, counted in chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}
