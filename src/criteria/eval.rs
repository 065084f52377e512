use super::ast::{CompareOp, Criterion, TimeField};
use crate::entity::{final_component, Entity};

/// Knobs applied at evaluation time. Name patterns ignore case unless
/// switched off; everything else compares exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_insensitive: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

/// Total and free of I/O: every criterion yields a boolean for every
/// entity, so evaluation can never fail after construction.
pub(super) fn matches(entity: &Entity, criterion: &Criterion, opts: MatchOptions) -> bool {
    match criterion {
        Criterion::And(lhs, rhs) => matches(entity, lhs, opts) && matches(entity, rhs, opts),
        Criterion::Or(lhs, rhs) => matches(entity, lhs, opts) || matches(entity, rhs, opts),
        Criterion::Name { op, pattern } => {
            let hit = match_name(&entity.name, pattern, opts);
            if *op == CompareOp::Ne {
                !hit
            } else {
                hit
            }
        }
        Criterion::Size { op, bytes } => {
            let size = i64::try_from(entity.size).unwrap_or(i64::MAX);
            op.compare(size, *bytes)
        }
        Criterion::Time { field, op, when } => {
            let stamp = match field {
                TimeField::Modified => entity.modified,
                TimeField::Created => entity.created,
                TimeField::Accessed => entity.accessed,
            };
            op.compare(stamp, *when)
        }
        Criterion::Attr { op, flag } => {
            let hit = entity.attributes.contains(*flag);
            if *op == CompareOp::Ne {
                !hit
            } else {
                hit
            }
        }
    }
}

// A pattern with a separator is matched against the whole slash-normalized
// name; a plain pattern only against the final component. This is what lets
// `dirA/*.*` select one archive subtree while `*.txt` works everywhere.
fn match_name(name: &str, pattern: &str, opts: MatchOptions) -> bool {
    let pattern = pattern.replace('\\', "/");
    let subject = if pattern.contains('/') {
        name.replace('\\', "/")
    } else {
        final_component(name).to_string()
    };
    if opts.case_insensitive {
        wildcard_match(&subject.to_lowercase(), &pattern.to_lowercase())
    } else {
        wildcard_match(&subject, &pattern)
    }
}

fn wildcard_match(value: &str, pattern: &str) -> bool {
    let s: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut si, mut pi) = (0usize, 0usize);
    let (mut star_idx, mut match_idx) = (None::<usize>, 0usize);

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            si += 1;
            pi += 1;
            continue;
        }
        if pi < p.len() && p[pi] == '*' {
            star_idx = Some(pi);
            match_idx = si;
            pi += 1;
            continue;
        }
        if let Some(star) = star_idx {
            pi = star + 1;
            match_idx += 1;
            si = match_idx;
            continue;
        }
        return false;
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
