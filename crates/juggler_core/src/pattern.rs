//! Boundary inversion over site patterns.
//!
//! A site pattern captures the variable region of a template with a single
//! group: `a=(\d+);`. Rewriting needs the opposite, the literal context on
//! either side of the region, so that a new value can be spliced between
//! them whatever the file currently holds there. The pattern is lexed into
//! a stream of [`Token`]s and every capturing boundary is flipped, giving
//! `(a=)\d+(;)`.
//!
//! Escapes, character classes and non-capturing groups (`(?:...)`) are
//! carried through as literals, so only real capture groups take part in the
//! inversion. Bare inline flag groups such as `(?m)` are kept as their own
//! tokens: an inline flag lasts until the end of its enclosing group, so
//! inversion has to place them where they keep covering the same text.

use std::fmt::Write;

/// One element of a lexed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening boundary of a capture group
    Open,
    /// Closing boundary of a capture group
    Close,
    /// A bare inline flag group outside any non-capturing group, e.g. `(?im)`
    Flags(String),
    /// Any run of pattern text that is not a capture boundary
    Literal(String),
}

impl Token {
    fn flipped(&self) -> Token {
        match self {
            Token::Open => Token::Close,
            Token::Close => Token::Open,
            other => other.clone(),
        }
    }
}

#[derive(Clone, Copy)]
enum Group {
    Capturing,
    Plain,
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

/// Lex a regex pattern into capture boundaries and literal runs.
#[must_use]
pub fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let end = (i + 2).min(chars.len());
                push_literal(&mut tokens, &chars[i..end].iter().collect::<String>());
                i = end;
            }
            '[' => {
                let end = class_end(&chars, i);
                push_literal(&mut tokens, &chars[i..end].iter().collect::<String>());
                i = end;
            }
            '(' => {
                if chars.get(i + 1) == Some(&'?') {
                    let flags_end = flag_group_end(&chars, i)
                        .filter(|_| groups.iter().all(|g| matches!(g, Group::Capturing)));
                    if let Some(end) = flags_end {
                        tokens.push(Token::Flags(chars[i..end].iter().collect()));
                        i = end;
                    } else if let Some(end) = named_group_end(&chars, i) {
                        groups.push(Group::Capturing);
                        tokens.push(Token::Open);
                        i = end;
                    } else {
                        groups.push(Group::Plain);
                        push_literal(&mut tokens, "(");
                        i += 1;
                    }
                } else {
                    groups.push(Group::Capturing);
                    tokens.push(Token::Open);
                    i += 1;
                }
            }
            ')' => {
                match groups.pop() {
                    Some(Group::Capturing) => tokens.push(Token::Close),
                    Some(Group::Plain) | None => push_literal(&mut tokens, ")"),
                }
                i += 1;
            }
            c => {
                push_literal(&mut tokens, c.encode_utf8(&mut [0; 4]));
                i += 1;
            }
        }
    }

    tokens
}

/// Index one past the `]` closing the class opened at `start`.
fn class_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    if chars.get(i) == Some(&'^') {
        i += 1;
    }
    // a leading `]` is a member of the class
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    let mut depth = 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

/// For `(?P<name>` or `(?<name>` at `start`, index one past the `>`.
fn named_group_end(chars: &[char], start: usize) -> Option<usize> {
    let name_start = match (chars.get(start + 2), chars.get(start + 3)) {
        (Some('P'), Some('<')) => start + 4,
        (Some('<'), _) => start + 3,
        _ => return None,
    };
    chars[name_start..]
        .iter()
        .position(|&c| c == '>')
        .map(|offset| name_start + offset + 1)
}

/// For a bare flag group like `(?i)` or `(?s-m)` at `start`, index one past
/// its `)`.
fn flag_group_end(chars: &[char], start: usize) -> Option<usize> {
    let flags = chars[start + 2..]
        .iter()
        .take_while(|c| c.is_ascii_alphabetic() || **c == '-')
        .count();
    let close = start + 2 + flags;
    (flags > 0 && chars.get(close) == Some(&')')).then_some(close + 1)
}

/// Number of capture groups in a lexed pattern
#[must_use]
pub fn capture_count(tokens: &[Token]) -> usize {
    tokens.iter().filter(|t| **t == Token::Open).count()
}

/// Flip every capture boundary, wrap the result in an outer pair and drop
/// the empty pairs that appear when the variable region touches either end
/// of the pattern.
///
/// For an input with exactly one capture group the output holds up to two
/// groups, the context before the variable region and the context after
/// it. The region itself stays uncaptured between them inside `(?:...)`, so
/// alternations and flags within it do not reach into the context.
///
/// Flags leading the pattern are moved in front of the outer pair. Other
/// top-level flags in the leading context are repeated after it, where the
/// flipped boundary would otherwise end them.
#[must_use]
pub fn invert(tokens: &[Token]) -> Vec<Token> {
    let leading = tokens
        .iter()
        .take_while(|t| matches!(t, Token::Flags(_)))
        .count();
    let (hoisted, body) = tokens.split_at(leading);

    let mut flipped = Vec::with_capacity(tokens.len() + 4);
    flipped.push(Token::Open);
    let mut depth = 0usize;
    let mut context_flags = Vec::new();
    for token in body {
        match token {
            Token::Open => {
                flipped.push(Token::Close);
                if depth == 0 {
                    flipped.extend(context_flags.iter().cloned());
                    flipped.push(Token::Literal("(?:".to_string()));
                }
                depth += 1;
            }
            Token::Close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    flipped.push(Token::Literal(")".to_string()));
                }
                flipped.push(Token::Open);
            }
            Token::Flags(_) if depth == 0 => {
                context_flags.push(token.clone());
                flipped.push(token.clone());
            }
            other => flipped.push(other.flipped()),
        }
    }
    flipped.push(Token::Close);

    let mut inverted: Vec<Token> = hoisted.to_vec();
    for token in flipped {
        if token == Token::Close && inverted.last() == Some(&Token::Open) {
            inverted.pop();
            continue;
        }
        match (inverted.last_mut(), token) {
            (Some(Token::Literal(last)), Token::Literal(text)) => last.push_str(&text),
            (_, token) => inverted.push(token),
        }
    }
    inverted
}

/// Whether inversion keeps a context group before the variable region
#[must_use]
pub fn has_leading_context(tokens: &[Token]) -> bool {
    tokens.iter().find(|t| !matches!(t, Token::Flags(_))) != Some(&Token::Open)
}

/// Render tokens back to pattern text, naming capture groups in order.
#[must_use]
pub fn render(tokens: &[Token], names: &[&str]) -> String {
    let mut out = String::new();
    let mut names = names.iter();
    for token in tokens {
        match token {
            Token::Open => match names.next() {
                Some(name) => {
                    let _ = write!(out, "(?P<{name}>");
                }
                None => out.push('('),
            },
            Token::Close => out.push(')'),
            Token::Flags(text) | Token::Literal(text) => out.push_str(text),
        }
    }
    out
}
