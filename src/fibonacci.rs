use thiserror::Error as ThisError;

/// Largest index whose value fits in a `u64`.
pub const MAX_SUPPORTED_INDEX: u64 = 92;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum FibError {
    #[error("fibonacci({index}) does not fit in 64 bits")]
    Overflow { index: u64 },
}

/// Fibonacci sequence seeded with fib(0) = fib(1) = 1.
pub fn fibonacci(index: u64) -> Result<u64, FibError> {
    let (mut prev, mut curr) = (1u64, 1u64);
    for _ in 1..index {
        let next = prev
            .checked_add(curr)
            .ok_or(FibError::Overflow { index })?;
        prev = curr;
        curr = next;
    }
    Ok(curr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(index: u64) -> u64 {
        if index < 2 {
            return 1;
        }
        reference(index - 1) + reference(index - 2)
    }

    #[test]
    fn test_matches_recursive_definition() {
        for index in 0..=30 {
            assert_eq!(fibonacci(index), Ok(reference(index)), "index {}", index);
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(fibonacci(0), Ok(1));
        assert_eq!(fibonacci(1), Ok(1));
        assert_eq!(fibonacci(2), Ok(2));
        assert_eq!(fibonacci(5), Ok(8));
        assert_eq!(fibonacci(10), Ok(89));
        assert_eq!(fibonacci(30), Ok(1346269));
    }

    #[test]
    fn test_largest_supported_index() {
        assert_eq!(
            fibonacci(MAX_SUPPORTED_INDEX),
            Ok(12200160415121876738)
        );
        assert_eq!(
            fibonacci(MAX_SUPPORTED_INDEX + 1),
            Err(FibError::Overflow {
                index: MAX_SUPPORTED_INDEX + 1
            })
        );
        assert!(fibonacci(u64::MAX).is_err());
    }
}
