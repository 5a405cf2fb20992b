//! Lua pattern matching engine (spec.md §4.8).
//!
//! A direct backtracking interpreter over the pattern bytes, in the
//! tradition of C Lua's `lstrlib.c` `match()`/`MatchState` and the teacher's
//! `stdlib/string/pattern/engine.rs` (`MatchState` + recursive descent with
//! capture slots, no NFA/DFA compilation step). VM-independent already in
//! the teacher, so the port here is close to line-for-line equivalent, just
//! switched from the teacher's `char`-indexed pattern/subject to raw bytes.

mod class;

use class::{item_end, single_match};

pub const MAX_CAPTURES: usize = 32;
const CAP_UNFINISHED: isize = -1;
const CAP_POSITION: isize = -2;
const MAX_RECURSION: u32 = 200;

#[derive(Clone, Copy)]
struct Capture {
    start: usize,
    len: isize,
}

pub struct MatchState<'a> {
    src: &'a [u8],
    pat: &'a [u8],
    captures: Vec<Capture>,
    depth: u32,
}

/// One resolved capture: either a byte range `(start, end)` or a 1-based
/// position capture (`()`), which `resolve` represents via `is_position`.
#[derive(Clone, Copy, Debug)]
pub struct CaptureResult {
    pub start: usize,
    pub end: usize,
    pub is_position: bool,
}

pub struct MatchResult {
    pub start: usize,
    pub end: usize,
    pub captures: Vec<CaptureResult>,
}

/// Try to match `pat` against `src` starting exactly at `init`. Returns the
/// match end and resolved captures, or `None`. Honors a leading `^` anchor
/// (caller is expected to have already stripped it and to only call this
/// once when anchored).
pub fn match_at(src: &[u8], pat: &[u8], init: usize) -> Result<Option<MatchResult>, &'static str> {
    let mut state = MatchState { src, pat, captures: Vec::new(), depth: 0 };
    match state.do_match(init, 0)? {
        Some(end) => Ok(Some(MatchResult { start: init, end, captures: state.resolve(init, end)? })),
        None => Ok(None),
    }
}

/// `string.find`/`string.match`/`gmatch` driver: scan `src` for the first
/// position at or after `init` where `pat` matches. Honors a leading `^`
/// anchor by only trying `init` itself.
pub fn search(src: &[u8], pat: &[u8], init: usize) -> Result<Option<MatchResult>, &'static str> {
    let (anchored, pat) = if pat.first() == Some(&b'^') { (true, &pat[1..]) } else { (false, pat) };
    let mut s = init.min(src.len());
    loop {
        let mut state = MatchState { src, pat, captures: Vec::new(), depth: 0 };
        if let Some(end) = state.do_match(s, 0)? {
            return Ok(Some(MatchResult { start: s, end, captures: state.resolve(s, end)? }));
        }
        if anchored || s >= src.len() {
            return Ok(None);
        }
        s += 1;
    }
}

impl<'a> MatchState<'a> {
    fn do_match(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        self.depth += 1;
        if self.depth > MAX_RECURSION {
            return Err("pattern too complex");
        }
        let result = self.do_match_inner(s, p);
        self.depth -= 1;
        result
    }

    fn do_match_inner(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        if p >= self.pat.len() {
            return Ok(Some(s));
        }
        match self.pat[p] {
            b'(' => {
                if self.pat.get(p + 1) == Some(&b')') {
                    self.start_capture(s, p + 2, CAP_POSITION)
                } else {
                    self.start_capture(s, p + 1, CAP_UNFINISHED)
                }
            }
            b')' => self.end_capture(s, p + 1),
            b'$' if p + 1 == self.pat.len() => {
                Ok(if s == self.src.len() { Some(s) } else { None })
            }
            b'%' if matches!(self.pat.get(p + 1), Some(b'b')) => self.match_balance(s, p + 2),
            b'%' if matches!(self.pat.get(p + 1), Some(b'f')) => self.match_frontier(s, p + 2),
            b'%' if self.pat.get(p + 1).map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                self.match_capture_ref(s, p)
            }
            _ => self.default_match(s, p),
        }
    }

    fn default_match(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        let ep = item_end(self.pat, p)?;
        let matches_here = s < self.src.len() && single_match(self.src[s], self.pat, p, ep);
        match self.pat.get(ep) {
            Some(b'?') => {
                if matches_here {
                    if let Some(r) = self.do_match(s + 1, ep + 1)? {
                        return Ok(Some(r));
                    }
                }
                self.do_match(s, ep + 1)
            }
            Some(b'*') => self.max_expand(s, p, ep),
            Some(b'+') => {
                if matches_here {
                    self.max_expand(s + 1, p, ep)
                } else {
                    Ok(None)
                }
            }
            Some(b'-') => self.min_expand(s, p, ep),
            _ => {
                if matches_here {
                    self.do_match(s + 1, ep)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn max_expand(&mut self, s: usize, p: usize, ep: usize) -> Result<Option<usize>, &'static str> {
        let mut count = 0usize;
        while s + count < self.src.len() && single_match(self.src[s + count], self.pat, p, ep) {
            count += 1;
        }
        loop {
            if let Some(r) = self.do_match(s + count, ep + 1)? {
                return Ok(Some(r));
            }
            if count == 0 {
                return Ok(None);
            }
            count -= 1;
        }
    }

    fn min_expand(&mut self, mut s: usize, p: usize, ep: usize) -> Result<Option<usize>, &'static str> {
        loop {
            if let Some(r) = self.do_match(s, ep + 1)? {
                return Ok(Some(r));
            }
            if s < self.src.len() && single_match(self.src[s], self.pat, p, ep) {
                s += 1;
            } else {
                return Ok(None);
            }
        }
    }

    fn start_capture(&mut self, s: usize, p: usize, what: isize) -> Result<Option<usize>, &'static str> {
        if self.captures.len() >= MAX_CAPTURES {
            return Err("too many captures");
        }
        self.captures.push(Capture { start: s, len: what });
        let res = self.do_match(s, p)?;
        if res.is_none() {
            self.captures.pop();
        }
        Ok(res)
    }

    fn end_capture(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        let idx = self
            .captures
            .iter()
            .rposition(|c| c.len == CAP_UNFINISHED)
            .ok_or("invalid pattern capture")?;
        self.captures[idx].len = (s - self.captures[idx].start) as isize;
        let res = self.do_match(s, p)?;
        if res.is_none() {
            self.captures[idx].len = CAP_UNFINISHED;
        }
        Ok(res)
    }

    fn match_capture_ref(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        let idx = (self.pat[p + 1] - b'1') as usize;
        let cap = self.captures.get(idx).ok_or("invalid capture index")?;
        if cap.len < 0 {
            return Err("invalid capture index");
        }
        let (start, len) = (cap.start, cap.len as usize);
        if s + len <= self.src.len() && self.src[s..s + len] == self.src[start..start + len] {
            self.do_match(s + len, p + 2)
        } else {
            Ok(None)
        }
    }

    fn match_balance(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        if p + 1 >= self.pat.len() {
            return Err("missing arguments to '%b'");
        }
        let (open, close) = (self.pat[p], self.pat[p + 1]);
        if s >= self.src.len() || self.src[s] != open {
            return Ok(None);
        }
        let mut depth = 1i32;
        let mut i = s + 1;
        while i < self.src.len() {
            if self.src[i] == close {
                depth -= 1;
                if depth == 0 {
                    return self.do_match(i + 1, p + 2);
                }
            } else if self.src[i] == open {
                depth += 1;
            }
            i += 1;
        }
        Ok(None)
    }

    fn match_frontier(&mut self, s: usize, p: usize) -> Result<Option<usize>, &'static str> {
        if self.pat.get(p) != Some(&b'[') {
            return Err("missing '[' after '%f' in pattern");
        }
        let ep = item_end(self.pat, p)?;
        let prev = if s == 0 { 0u8 } else { self.src[s - 1] };
        let cur = if s < self.src.len() { self.src[s] } else { 0u8 };
        if !single_match(prev, self.pat, p, ep) && single_match(cur, self.pat, p, ep) {
            self.do_match(s, ep)
        } else {
            Ok(None)
        }
    }

    fn resolve(&self, whole_start: usize, whole_end: usize) -> Result<Vec<CaptureResult>, &'static str> {
        if self.captures.is_empty() {
            // No explicit captures: the whole match is capture 0, handled by
            // callers that special-case an empty capture list.
            let _ = (whole_start, whole_end);
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(self.captures.len());
        for cap in &self.captures {
            if cap.len == CAP_UNFINISHED {
                return Err("unfinished capture");
            }
            if cap.len == CAP_POSITION {
                out.push(CaptureResult { start: cap.start, end: cap.start, is_position: true });
            } else {
                out.push(CaptureResult { start: cap.start, end: cap.start + cap.len as usize, is_position: false });
            }
        }
        Ok(out)
    }
}
