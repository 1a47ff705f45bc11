/// Entry-Point Resolver
///
/// **Responsibility:**
/// Decide which script function the grader invokes, without executing code.
///
/// **Rules:**
/// 1. A top-level `fn main` always wins, wherever it is declared
/// 2. Otherwise the first top-level `fn` in source order
/// 3. No declarations at all -> `NotFound` (the script still runs for side effects)
///
/// Ordering comes from a static scan of the text, never from the engine's
/// function table, whose iteration order is unspecified.
use serde::Serialize;

pub const MAIN_FUNCTION: &str = "main";

/// A declared script function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub name: String,
    /// Number of declared parameters
    pub arity: usize,
    /// 1-based line of the `fn` keyword
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Resolution {
    Found(EntryPoint),
    NotFound,
}

impl Resolution {
    pub fn entry_point(&self) -> Option<&EntryPoint> {
        match self {
            Resolution::Found(entry) => Some(entry),
            Resolution::NotFound => None,
        }
    }
}

/// Resolve the entry point of a submission
pub fn resolve_entry_point(source: &str) -> Resolution {
    let declarations = declared_functions(source);

    if let Some(main) = declarations.iter().find(|d| d.name == MAIN_FUNCTION) {
        return Resolution::Found(main.clone());
    }

    match declarations.into_iter().next() {
        Some(first) => Resolution::Found(first),
        None => Resolution::NotFound,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Punct(char),
}

/// Top-level tokens with their line numbers.
///
/// Comments and literals are skipped entirely, and anything nested inside
/// braces is dropped, so only declarations at depth zero survive.
fn top_level_tokens(source: &str) -> Vec<(Token, usize)> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut line = 1usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                // block comments nest
                let mut level = 0usize;
                while i < chars.len() {
                    if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
                        level += 1;
                        i += 2;
                    } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        level -= 1;
                        i += 2;
                        if level == 0 {
                            break;
                        }
                    } else {
                        if chars[i] == '\n' {
                            line += 1;
                        }
                        i += 1;
                    }
                }
            }
            '"' | '\'' | '`' => {
                i = skip_quoted(&chars, i, c, &mut line);
            }
            '#' if matches!(chars.get(i + 1), Some('"') | Some('#')) => {
                i = skip_raw_string(&chars, i, &mut line);
            }
            '{' => {
                depth += 1;
                i += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if depth == 0 {
                    let ident: String = chars[start..i].iter().collect();
                    tokens.push((Token::Ident(ident), line));
                }
            }
            c if c.is_whitespace() => {
                i += 1;
            }
            other => {
                if depth == 0 {
                    tokens.push((Token::Punct(other), line));
                }
                i += 1;
            }
        }
    }

    tokens
}

/// Skip a quoted literal starting at `start`; returns the index past the
/// closing quote (or the end of input when unterminated)
fn skip_quoted(chars: &[char], start: usize, quote: char, line: &mut usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' => {
                *line += 1;
                i += 1;
            }
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Skip a raw string such as `#"..."#` or `##"..."##`
fn skip_raw_string(chars: &[char], start: usize, line: &mut usize) -> usize {
    let mut i = start;
    let mut hashes = 0usize;
    while i < chars.len() && chars[i] == '#' {
        hashes += 1;
        i += 1;
    }
    if chars.get(i) != Some(&'"') {
        return i;
    }
    i += 1;
    while i < chars.len() {
        if chars[i] == '\n' {
            *line += 1;
        }
        if chars[i] == '"' && (1..=hashes).all(|k| chars.get(i + k) == Some(&'#')) {
            return i + 1 + hashes;
        }
        i += 1;
    }
    chars.len()
}

/// All top-level `fn name(params)` declarations in source order
fn declared_functions(source: &str) -> Vec<EntryPoint> {
    let tokens = top_level_tokens(source);
    let mut found = Vec::new();
    let mut i = 0usize;

    while i < tokens.len() {
        let (token, line) = &tokens[i];
        if *token != Token::Ident("fn".to_string()) {
            i += 1;
            continue;
        }

        let name = match tokens.get(i + 1) {
            Some((Token::Ident(name), _)) => name.clone(),
            _ => {
                i += 1;
                continue;
            }
        };

        // `fn Type.method(..)` declarations are not callable entry points
        if tokens.get(i + 2).map(|(t, _)| t) != Some(&Token::Punct('(')) {
            i += 2;
            continue;
        }

        let mut arity = 0usize;
        let mut j = i + 3;
        let mut closed = false;
        while j < tokens.len() {
            match &tokens[j].0 {
                Token::Punct(')') => {
                    closed = true;
                    break;
                }
                Token::Ident(_) => arity += 1,
                Token::Punct(_) => {}
            }
            j += 1;
        }

        if closed {
            found.push(EntryPoint {
                name,
                arity,
                line: *line,
            });
        }
        i = j + 1;
    }

    found
}
