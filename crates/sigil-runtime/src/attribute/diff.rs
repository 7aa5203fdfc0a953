//! Structural diff between two values.
//!
//! The result is a list of entries that, applied in order to the previous
//! value, produce the next one. Arrays use an LCS edit script while the
//! `n * m` table fits `limit`; larger arrays trim the common prefix and
//! suffix and treat the rest as one replaced block. Moves are not detected.

use serde_json::Value;

use super::change::Change;

/// Entries turning `previous` into `next`.
pub fn diff(previous: &Value, next: &Value, limit: usize) -> Vec<Change> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    diff_at(previous, next, &mut path, limit, &mut out);
    out
}

fn diff_at(previous: &Value, next: &Value, path: &mut Vec<String>, limit: usize, out: &mut Vec<Change>) {
    if previous == next {
        return;
    }
    match (previous, next) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, old) in before {
                path.push(key.clone());
                match after.get(key) {
                    Some(new) => diff_at(old, new, path, limit, out),
                    None => out.push(Change::remove(path.clone(), old.clone())),
                }
                path.pop();
            }
            for (key, new) in after {
                if !before.contains_key(key) {
                    path.push(key.clone());
                    out.push(Change::add(path.clone(), new.clone()));
                    path.pop();
                }
            }
        }
        (Value::Array(before), Value::Array(after)) => diff_arrays(before, after, path, limit, out),
        _ => out.push(Change::change(path.clone(), next.clone(), previous.clone())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Edit {
    Keep,
    Delete(usize),
    Insert(usize),
}

fn diff_arrays(before: &[Value], after: &[Value], path: &mut Vec<String>, limit: usize, out: &mut Vec<Change>) {
    let script = match before.len().checked_mul(after.len()) {
        Some(cells) if cells <= limit => lcs_script(before, after),
        _ => trimmed_script(before, after),
    };

    // Walk the script; `pos` is the index in the array as edited so far
    let mut pos = 0;
    let mut i = 0;
    while i < script.len() {
        if script[i] == Edit::Keep {
            pos += 1;
            i += 1;
            continue;
        }
        let mut deleted = Vec::new();
        let mut inserted = Vec::new();
        while i < script.len() {
            match script[i] {
                Edit::Delete(d) => deleted.push(&before[d]),
                Edit::Insert(n) => inserted.push(&after[n]),
                Edit::Keep => break,
            }
            i += 1;
        }

        let paired = deleted.len().min(inserted.len());
        for t in 0..paired {
            path.push((pos + t).to_string());
            let (old, new) = (deleted[t], inserted[t]);
            if is_container(old) && is_container(new) && kind_eq(old, new) {
                diff_at(old, new, path, limit, out);
            } else {
                out.push(Change::change(path.clone(), new.clone(), old.clone()));
            }
            path.pop();
        }
        path.push((pos + paired).to_string());
        for old in &deleted[paired..] {
            out.push(Change::remove(path.clone(), (*old).clone()));
        }
        path.pop();
        for (r, new) in inserted[paired..].iter().enumerate() {
            path.push((pos + paired + r).to_string());
            out.push(Change::add(path.clone(), (*new).clone()));
            path.pop();
        }
        pos += inserted.len();
    }
}

fn is_container(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

fn kind_eq(a: &Value, b: &Value) -> bool {
    a.is_array() == b.is_array()
}

/// Edit script from a suffix LCS table.
fn lcs_script(before: &[Value], after: &[Value]) -> Vec<Edit> {
    let (n, m) = (before.len(), after.len());
    let width = m + 1;
    let mut table = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if before[i] == after[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut script = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if before[i] == after[j] {
            script.push(Edit::Keep);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            script.push(Edit::Delete(i));
            i += 1;
        } else {
            script.push(Edit::Insert(j));
            j += 1;
        }
    }
    script.extend((i..n).map(Edit::Delete));
    script.extend((j..m).map(Edit::Insert));
    script
}

/// Edit script keeping the common prefix and suffix only.
fn trimmed_script(before: &[Value], after: &[Value]) -> Vec<Edit> {
    let prefix = before.iter().zip(after).take_while(|(a, b)| a == b).count();
    let suffix = before[prefix..]
        .iter()
        .rev()
        .zip(after[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut script = vec![Edit::Keep; prefix];
    script.extend((prefix..before.len() - suffix).map(Edit::Delete));
    script.extend((prefix..after.len() - suffix).map(Edit::Insert));
    script.extend(std::iter::repeat(Edit::Keep).take(suffix));
    script
}
