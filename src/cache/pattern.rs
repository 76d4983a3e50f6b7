//! Key Pattern Module
//!
//! Glob matching with the same rules the Redis server applies to `KEYS` and
//! `SCAN MATCH`, so the in-process tiers agree with the distributed sweep.

/// Builds the unanchored sweep pattern `*<pattern>*`.
pub fn sweep_pattern(pattern: &str) -> String {
    format!("*{}*", pattern)
}

/// Matches `text` against a Redis-style glob.
///
/// Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes. Runs in
/// O(pattern * text) time whatever the number of stars.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_chars(&pattern, &text)
}

fn match_chars(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern index after the most recent star and the text index it resumes at
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        if pattern.get(p) == Some(&'*') {
            p += 1;
            resume = Some((p, t));
            continue;
        }
        if let Some(next) = match_token(pattern, p, text[t]) {
            p = next;
            t += 1;
            continue;
        }
        // Let the last star absorb one more character and retry
        match resume {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                resume = Some((star_p, t));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches `ch` against the single-character token at `pattern[p]`.
///
/// Returns the pattern index after the token, `None` on mismatch or at the
/// end of the pattern.
fn match_token(pattern: &[char], p: usize, ch: char) -> Option<usize> {
    match *pattern.get(p)? {
        '?' => Some(p + 1),
        '[' => {
            let (matched, rest) = match_class(&pattern[p + 1..], ch);
            matched.then(|| pattern.len() - rest.len())
        }
        '\\' if p + 1 < pattern.len() => (pattern[p + 1] == ch).then_some(p + 2),
        literal => (literal == ch).then_some(p + 1),
    }
}

/// Evaluates a character class starting just after `[`.
///
/// Returns whether `ch` matched and the pattern remaining after `]`.
/// An unterminated class consumes the rest of the pattern, as Redis does.
fn match_class(mut p: &[char], ch: char) -> (bool, &[char]) {
    let negate = p.first() == Some(&'^');
    if negate {
        p = &p[1..];
    }

    let mut matched = false;
    loop {
        match p {
            [] => break,
            [']', rest @ ..] => {
                p = rest;
                break;
            }
            ['\\', escaped, rest @ ..] => {
                matched |= *escaped == ch;
                p = rest;
            }
            [lo, '-', hi, rest @ ..] if *hi != ']' => {
                let (lo, hi) = if lo <= hi { (*lo, *hi) } else { (*hi, *lo) };
                matched |= lo <= ch && ch <= hi;
                p = rest;
            }
            [c, rest @ ..] => {
                matched |= *c == ch;
                p = rest;
            }
        }
    }

    (matched != negate, p)
}
