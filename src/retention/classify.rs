use crate::retention::policy::CategoryPolicy;

/// The retention category a filename resolved to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    /// Matched a configured category policy.
    Named(String),
    /// Matched nothing; exempt from age and count rules.
    Uncategorized,
}

impl Category {
    /// Stats key for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Named(name) => name,
            Category::Uncategorized => "uncategorized",
        }
    }
}

/// Resolve a filename to its category: first policy whose pattern matches
/// wins, so policy order is significant.
pub fn classify(policies: &[CategoryPolicy], file_name: &str) -> Category {
    for policy in policies {
        if policy.patterns.iter().any(|p| glob_match(p, file_name)) {
            return Category::Named(policy.name.clone());
        }
    }
    Category::Uncategorized
}

/// Filename glob match supporting `*` (any run, including empty) and `?`
/// (exactly one character). Matching is over characters, not bytes, and is
/// case-sensitive.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = name.chars().collect();

    // Iterative matcher with single-level backtracking to the last `*`.
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

#[cfg(test)]
#[path = "../../tests/unit/retention/classify.rs"]
mod tests;
