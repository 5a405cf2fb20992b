//! Character class matching for Lua patterns (spec.md §4.8).
//!
//! Operates on bytes, not `char`, since Lua patterns match byte strings
//! (`#s` and pattern matching are explicitly byte-level per spec.md §3).
//! Grounded on the teacher's `stdlib/string/pattern/class.rs` structure
//! (lowercase class letter = match, uppercase = inverted), re-targeted from
//! `char`/Unicode predicates to ASCII byte predicates matching C Lua's
//! `ctype.c` tables under the default locale.

#[inline]
pub fn match_class(c: u8, cl: u8) -> bool {
    let res = match cl.to_ascii_lowercase() {
        b'a' => c.is_ascii_alphabetic(),
        b'c' => c.is_ascii_control(),
        b'd' => c.is_ascii_digit(),
        b'g' => c.is_ascii_graphic(),
        b'l' => c.is_ascii_lowercase(),
        b'p' => c.is_ascii_punctuation(),
        b's' => c.is_ascii_whitespace() || c == 0x0b,
        b'u' => c.is_ascii_uppercase(),
        b'w' => c.is_ascii_alphanumeric(),
        b'x' => c.is_ascii_hexdigit(),
        _ => return c == cl,
    };
    if cl.is_ascii_uppercase() {
        !res
    } else {
        res
    }
}

fn is_class_letter(cl: u8) -> bool {
    matches!(cl.to_ascii_lowercase(), b'a' | b'c' | b'd' | b'g' | b'l' | b'p' | b's' | b'u' | b'w' | b'x')
}

/// Match `[set]` at `pat[start]` (start points at the `[`) against `c`.
pub fn match_set(c: u8, pat: &[u8], start: usize, end: usize) -> bool {
    let mut i = start + 1;
    let mut negate = false;
    if i < end && pat[i] == b'^' {
        negate = true;
        i += 1;
    }
    let mut found = false;
    while i < end {
        if pat[i] == b'%' && i + 1 < end {
            if match_class(c, pat[i + 1]) {
                found = true;
            }
            i += 2;
        } else if i + 2 < end && pat[i + 1] == b'-' {
            if pat[i] <= c && c <= pat[i + 2] {
                found = true;
            }
            i += 3;
        } else {
            if pat[i] == c {
                found = true;
            }
            i += 1;
        }
    }
    found != negate
}

/// Index just past the `]` that closes the set opened at `pat[start]`.
pub fn set_end(pat: &[u8], start: usize) -> Option<usize> {
    let len = pat.len();
    let mut i = start + 1;
    if i < len && pat[i] == b'^' {
        i += 1;
    }
    // a ']' right after '[' or '[^' is a literal member, not the closer
    if i < len && pat[i] == b']' {
        i += 1;
    }
    while i < len && pat[i] != b']' {
        if pat[i] == b'%' {
            i += 1;
        }
        i += 1;
    }
    if i >= len {
        None
    } else {
        Some(i + 1)
    }
}

/// Whether `pat[pp]` matches `c`, for a single pattern "item" (`.`, `%x`,
/// `[set]`, or a literal byte).
pub fn single_match(c: u8, pat: &[u8], pp: usize, ep: usize) -> bool {
    match pat[pp] {
        b'.' => true,
        b'%' => match_class(c, pat[pp + 1]),
        b'[' => match_set(c, pat, pp, ep - 1),
        other => other == c,
    }
}

/// Index just past the current single pattern item at `pp` (not consuming a
/// trailing quantifier).
pub fn item_end(pat: &[u8], pp: usize) -> Result<usize, &'static str> {
    match pat.get(pp) {
        None => Err("malformed pattern"),
        Some(b'%') => {
            if pp + 1 >= pat.len() {
                Err("malformed pattern (ends with '%')")
            } else {
                Ok(pp + 2)
            }
        }
        Some(b'[') => set_end(pat, pp).ok_or("malformed pattern (missing ']')"),
        Some(_) => Ok(pp + 1),
    }
}

pub fn is_known_class(cl: u8) -> bool {
    is_class_letter(cl)
}
