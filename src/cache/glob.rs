//! Redis-compatible glob matching for the in-process backend.
//!
//! Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes with the
//! same semantics as `KEYS`/`SCAN MATCH`.

pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && pattern[pi] == '*' {
            while pi < pattern.len() && pattern[pi] == '*' {
                pi += 1;
            }
            if pi == pattern.len() {
                return true;
            }
            backtrack = Some((pi, ti));
            continue;
        }

        if pi < pattern.len() {
            let (matched, width) = match_token(&pattern, pi, text[ti]);
            if matched {
                pi += width;
                ti += 1;
                continue;
            }
        }

        match backtrack.as_mut() {
            Some((star_pi, star_ti)) => {
                *star_ti += 1;
                pi = *star_pi;
                ti = *star_ti;
            }
            None => return false,
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}

/// Match one pattern token at `pi` against `c`, returning the token width.
fn match_token(pattern: &[char], pi: usize, c: char) -> (bool, usize) {
    match pattern[pi] {
        '?' => (true, 1),
        '\\' if pi + 1 < pattern.len() => (pattern[pi + 1] == c, 2),
        '[' => match_class(pattern, pi, c),
        literal => (literal == c, 1),
    }
}

fn match_class(pattern: &[char], start: usize, c: char) -> (bool, usize) {
    let mut idx = start + 1;
    let negate = idx < pattern.len() && pattern[idx] == '^';
    if negate {
        idx += 1;
    }

    let mut matched = false;
    while idx < pattern.len() && pattern[idx] != ']' {
        if pattern[idx] == '\\' && idx + 1 < pattern.len() {
            matched |= pattern[idx + 1] == c;
            idx += 2;
        } else if idx + 2 < pattern.len() && pattern[idx + 1] == '-' && pattern[idx + 2] != ']' {
            let (mut low, mut high) = (pattern[idx], pattern[idx + 2]);
            if low > high {
                std::mem::swap(&mut low, &mut high);
            }
            matched |= (low..=high).contains(&c);
            idx += 3;
        } else {
            matched |= pattern[idx] == c;
            idx += 1;
        }
    }

    // An unterminated class runs to the end of the pattern.
    let width = if idx < pattern.len() {
        idx + 1 - start
    } else {
        pattern.len() - start
    };
    (matched != negate, width)
}
