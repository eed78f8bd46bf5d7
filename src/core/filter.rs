//! # Inclusion Filter Module / 包含过滤模块
//!
//! Shell-style glob matching and the include/exclude filter applied to every
//! discovered test before execution.
//!
//! 提供 shell 风格的通配符匹配，以及在执行前应用于每个被发现测试的包含/排除过滤器。

/// Matches `text` against an fnmatch-style `pattern`.
///
/// Supports `*`, `?`, `[seq]` and `[!seq]`. When `separator_aware` is set,
/// `*` and `?` do not match `/`, which gives path-glob semantics; otherwise
/// every character is matched alike (plain fnmatch).
///
/// 将 `text` 与 fnmatch 风格的 `pattern` 进行匹配。
/// 支持 `*`、`?`、`[seq]` 和 `[!seq]`。设置 `separator_aware` 时，
/// `*` 和 `?` 不匹配 `/`（路径通配语义）。
pub fn glob_match(pattern: &str, text: &str, separator_aware: bool) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let mut pi = 0usize;
    let mut ti = 0usize;
    let mut last_star: Option<usize> = None;
    let mut star_ti = 0usize;

    while ti < t.len() {
        if pi < p.len() {
            match p[pi] {
                '*' => {
                    last_star = Some(pi);
                    pi += 1;
                    star_ti = ti;
                    continue;
                }
                '?' if !(separator_aware && t[ti] == '/') => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next_pi)) = match_class(&p, pi, t[ti]) {
                        if matched && !(separator_aware && t[ti] == '/') {
                            pi = next_pi;
                            ti += 1;
                            continue;
                        }
                    } else if t[ti] == '[' {
                        // Unterminated class: `[` is a literal.
                        pi += 1;
                        ti += 1;
                        continue;
                    }
                }
                c if c != '?' && c == t[ti] => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                _ => {}
            }
        }

        // Backtrack: let the last `*` swallow one more character.
        match last_star {
            Some(star_pi) if !(separator_aware && t[star_ti] == '/') => {
                star_ti += 1;
                ti = star_ti;
                pi = star_pi + 1;
            }
            _ => return false,
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

/// Parses the character class starting at `p[start] == '['` and tests `c`.
/// Returns `(matched, index after the class)`, or `None` if unterminated.
fn match_class(p: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = matches!(p.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < p.len() {
        if p[i] == ']' && !first {
            return Some((matched != negated, i + 1));
        }
        first = false;
        if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            if p[i] <= c && c <= p[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if p[i] == c {
                matched = true;
            }
            i += 1;
        }
    }
    None
}

/// `true` if `pattern` contains any glob metacharacter.
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Include/exclude filter over `<package>/<file>` paths.
///
/// A file is runnable iff it matches at least one include pattern and no
/// exclude pattern. Every pattern is implicitly right-open (`pattern*`), so
/// `demo/test_broken` selects `demo/test_broken.py`.
///
/// 基于 `<package>/<file>` 路径的包含/排除过滤器。
/// 文件可运行当且仅当它至少匹配一个包含模式且不匹配任何排除模式。
/// 每个模式都隐式右开放（`pattern*`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl Default for InclusionFilter {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl InclusionFilter {
    /// Builds a filter; an empty include list means "include everything".
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        let normalize = |patterns: Vec<String>| -> Vec<String> {
            patterns
                .into_iter()
                .map(|p| format!("{}*", p.trim()))
                .collect()
        };
        let includes = if includes.is_empty() {
            vec!["*".to_string()]
        } else {
            normalize(includes)
        };
        Self {
            includes,
            excludes: normalize(excludes),
        }
    }

    pub fn is_included(&self, package: &str, file: &str) -> bool {
        let path = format!("{package}/{file}");
        let included = self.includes.iter().any(|p| glob_match(p, &path, false));
        let excluded = self.excludes.iter().any(|p| glob_match(p, &path, false));
        included && !excluded
    }
}
