//! Source scrubbing helpers shared by the dialect analyzers.
//!
//! Scrubbing blanks out comments and string literals while preserving line
//! structure, so the structural patterns the analyzers run never match
//! inside literals. Fragments reported to users always come from the raw
//! content, not the scrubbed copy.

/// Blank comments and string literals in C-like source (PHP, JavaScript).
///
/// Handles `//`, `#` and `/* */` comments, single/double quoted strings
/// with backslash escapes, and leaves PHP 8 `#[` attributes intact.
pub fn scrub_c_like(content: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Single,
        Double,
    }

    let mut out = String::with_capacity(content.len());
    let mut state = State::Code;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            if state == State::LineComment {
                state = State::Code;
            }
            out.push('\n');
            continue;
        }
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '#' if chars.peek() != Some(&'[') => {
                    out.push(' ');
                    state = State::LineComment;
                }
                '\'' => {
                    out.push(' ');
                    state = State::Single;
                }
                '"' => {
                    out.push(' ');
                    state = State::Double;
                }
                _ => out.push(c),
            },
            State::LineComment => out.push(' '),
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::Single => {
                if c == '\\' {
                    chars.next();
                    out.push_str("  ");
                } else if c == '\'' {
                    out.push(' ');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::Double => {
                if c == '\\' {
                    chars.next();
                    out.push_str("  ");
                } else if c == '"' {
                    out.push(' ');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
        }
    }

    out
}

/// Blank `/* */` comments and quoted strings in CSS source
pub fn scrub_css(content: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        BlockComment,
        Single,
        Double,
    }

    let mut out = String::with_capacity(content.len());
    let mut state = State::Code;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            out.push('\n');
            continue;
        }
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '\'' => {
                    out.push(c);
                    state = State::Single;
                }
                '"' => {
                    out.push(c);
                    state = State::Double;
                }
                _ => out.push(c),
            },
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::Single => {
                out.push(c);
                if c == '\'' {
                    state = State::Code;
                }
            }
            State::Double => {
                out.push(c);
                if c == '"' {
                    state = State::Code;
                }
            }
        }
    }

    out
}

/// Blank Blade (`{{-- --}}`) and HTML (`<!-- -->`) comments
pub fn scrub_blade(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let bytes: Vec<char> = content.chars().collect();
    let mut i = 0;

    while i < bytes.len() {
        if content_starts_with(&bytes, i, "{{--") {
            i = blank_until(&bytes, i, "--}}", &mut out);
        } else if content_starts_with(&bytes, i, "<!--") {
            i = blank_until(&bytes, i, "-->", &mut out);
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    out
}

fn content_starts_with(chars: &[char], at: usize, needle: &str) -> bool {
    needle
        .chars()
        .enumerate()
        .all(|(j, c)| chars.get(at + j) == Some(&c))
}

fn blank_until(chars: &[char], mut i: usize, terminator: &str, out: &mut String) -> usize {
    while i < chars.len() && !content_starts_with(chars, i, terminator) {
        out.push(if chars[i] == '\n' { '\n' } else { ' ' });
        i += 1;
    }
    for _ in 0..terminator.len() {
        if i < chars.len() {
            out.push(' ');
            i += 1;
        }
    }
    i
}

/// Check that every `open` has a matching `close` and none closes early
pub fn balanced(scrubbed: &str, open: char, close: char) -> bool {
    let mut depth: i64 = 0;
    for c in scrubbed.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        }
    }
    depth == 0
}

/// Find the 0-indexed line on which the block opened at or after
/// `start_idx` closes. Scans for the first `{` from the start line.
pub fn find_block_end(lines: &[&str], start_idx: usize) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut opened = false;

    for (idx, line) in lines.iter().enumerate().skip(start_idx) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return Some(idx);
        }
        // Declaration never opened a block within a reasonable window
        if !opened && idx > start_idx + 2 {
            return None;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrub_blanks_strings_but_keeps_lines() {
        let src = "$x = 'class Foo';\n// class Bar\n$y = 1;";
        let scrubbed = scrub_c_like(src);
        assert_eq!(scrubbed.lines().count(), 3);
        assert!(!scrubbed.contains("Foo"));
        assert!(!scrubbed.contains("Bar"));
        assert!(scrubbed.contains("$y = 1;"));
    }

    #[test]
    fn scrub_keeps_php_attributes() {
        let scrubbed = scrub_c_like("#[Route('/home')]\n# plain comment");
        assert!(scrubbed.contains("#[Route"));
        assert!(!scrubbed.contains("plain"));
    }

    #[test]
    fn balanced_detects_missing_brace() {
        assert!(balanced("function f() { if (true) { } }", '{', '}'));
        assert!(!balanced("function f() { if (true) { }", '{', '}'));
        assert!(!balanced("} {", '{', '}'));
    }

    #[test]
    fn block_end_matches_nested_braces() {
        let src = "class A {\n  fn() {\n    x\n  }\n}\ntrailing";
        let lines: Vec<&str> = src.lines().collect();
        assert_eq!(find_block_end(&lines, 0), Some(4));
        assert_eq!(find_block_end(&lines, 1), Some(3));
    }
}
