//! Parser guards to prevent infinite loops and stack overflow

use super::ParseError;
use crate::parser::token::Span;

/// Maximum iterations for any parser loop
const MAX_LOOP_ITERATIONS: usize = 10_000;

/// Maximum nesting depth before rejecting parse
///
/// Declaration sources nest shallowly (a few levels of generics or object
/// types), so 30 leaves plenty of room while staying far from the stack
/// limit of test threads in debug builds.
pub const MAX_PARSE_DEPTH: usize = 30;

/// Guard against infinite loops in parser
///
/// Tracks iteration count and returns error if exceeded.
///
/// # Example
///
/// ```ignore
/// let mut guard = LoopGuard::new("class_members");
/// while !done {
///     guard.check()?;
///     // ... parse something ...
/// }
/// ```
pub struct LoopGuard {
    name: &'static str,
    count: usize,
    max: usize,
}

impl LoopGuard {
    /// Create a new loop guard with default limit
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            count: 0,
            max: MAX_LOOP_ITERATIONS,
        }
    }

    /// Create a loop guard with custom limit
    #[inline]
    pub fn with_limit(name: &'static str, max: usize) -> Self {
        Self { name, count: 0, max }
    }

    /// Check iteration count, return error if exceeded
    #[inline]
    pub fn check(&mut self) -> Result<(), ParseError> {
        self.count += 1;
        if self.count > self.max {
            return Err(ParseError::parser_limit_exceeded(
                format!("Loop '{}' exceeded {} iterations", self.name, self.max),
                Span::new(0, 0, 0, 0),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_guard_under_limit() {
        let mut guard = LoopGuard::with_limit("members", 10);
        for _ in 0..10 {
            assert!(guard.check().is_ok());
        }
    }

    #[test]
    fn test_loop_guard_exceeds_limit() {
        let mut guard = LoopGuard::with_limit("members", 10);
        for _ in 0..10 {
            let _ = guard.check();
        }
        let err = guard.check().unwrap_err();
        assert!(err.message.contains("members"));
    }
}
