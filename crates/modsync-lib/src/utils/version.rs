use std::cmp::Ordering;

/// A mod version string ordered token by token.
///
/// The ordering is intentionally weak: tokens are split on `.` and `-`,
/// numeric tokens compare as numbers and anything else falls back to a
/// lexical comparison. Pre-release tags are not ranked below releases, so
/// `1.0.0-beta` sorts *after* `1.0.0`.
#[derive(Debug, Clone)]
pub struct Version(String);

#[derive(Debug, PartialEq, Eq)]
enum Part<'a> {
    Numeric(u64),
    Text(&'a str),
}

const MISSING: Part<'static> = Part::Numeric(0);

impl Part<'_> {
    fn render(&self) -> String {
        match self {
            Part::Numeric(n) => n.to_string(),
            Part::Text(s) => (*s).to_string(),
        }
    }
}

impl Version {
    pub fn new(v: &str) -> Self {
        Version(v.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split_parts(s: &str) -> Vec<Part<'_>> {
        s.split(['.', '-'])
            .map(|token| {
                if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                    // Digits that do not fit a u64 are compared as text
                    match token.parse() {
                        Ok(n) => Part::Numeric(n),
                        Err(_) => Part::Text(token),
                    }
                } else {
                    Part::Text(token)
                }
            })
            .collect()
    }

    fn cmp_parts(a: &Part<'_>, b: &Part<'_>) -> Ordering {
        match (a, b) {
            (Part::Numeric(x), Part::Numeric(y)) => x.cmp(y),
            _ => a.render().cmp(&b.render()),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let a_parts = Self::split_parts(&self.0);
        let b_parts = Self::split_parts(&other.0);
        let len = a_parts.len().max(b_parts.len());

        for i in 0..len {
            let ap = a_parts.get(i).unwrap_or(&MISSING);
            let bp = b_parts.get(i).unwrap_or(&MISSING);
            match Self::cmp_parts(ap, bp) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::new(a).cmp(&Version::new(b))
}

/// True when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}
