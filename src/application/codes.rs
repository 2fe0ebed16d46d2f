//! Human-readable unique codes for bookings and payments

use std::future::Future;

use rand::Rng;
use tracing::debug;

use crate::domain::{DomainError, DomainResult};

pub const BOOKING_CODE_PREFIX: &str = "BK";
pub const TRANSACTION_CODE_PREFIX: &str = "TX";

/// Default number of candidates tried before giving up
pub const DEFAULT_CODE_ATTEMPTS: u32 = 10;

/// `prefix` followed by six random digits, e.g. `BK483920`.
pub fn random_code(prefix: &str) -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("{}{}", prefix, n)
}

/// Draw codes until `exists` reports one as free.
///
/// The check is only a fast path: the store's unique constraint is the
/// final word, so callers still handle `DomainError::Duplicate` on insert.
pub async fn generate_unique_code<F, Fut>(
    prefix: &str,
    kind: &'static str,
    max_attempts: u32,
    mut exists: F,
) -> DomainResult<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = DomainResult<bool>>,
{
    for attempt in 1..=max_attempts {
        let candidate = random_code(prefix);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        debug!(kind, attempt, code = %candidate, "Generated code already taken");
    }
    Err(DomainError::CodeSpaceExhausted(kind, max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[test]
    fn code_has_prefix_and_six_digits() {
        let code = random_code(BOOKING_CODE_PREFIX);
        assert_eq!(code.len(), 8);
        assert!(code.starts_with("BK"));
        assert!(code[2..].chars().all(|c| c.is_ascii_digit()));
        assert_ne!(&code[2..3], "0");
    }

    #[tokio::test]
    async fn ten_thousand_codes_are_unique_against_a_store() {
        let taken: Arc<Mutex<HashSet<String>>> = Arc::default();
        for _ in 0..10_000 {
            let store = taken.clone();
            let code = generate_unique_code(TRANSACTION_CODE_PREFIX, "transaction code", 50, |c| {
                let hit = store.lock().unwrap().contains(&c);
                async move { Ok(hit) }
            })
            .await
            .unwrap();
            assert!(taken.lock().unwrap().insert(code));
        }
        assert_eq!(taken.lock().unwrap().len(), 10_000);
    }

    #[tokio::test]
    async fn always_taken_store_exhausts() {
        let err = generate_unique_code(BOOKING_CODE_PREFIX, "booking code", 3, |_| async {
            Ok(true)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::CodeSpaceExhausted("booking code", 3)));
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let err = generate_unique_code(BOOKING_CODE_PREFIX, "booking code", 3, |_| async {
            Err(DomainError::Storage("down".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }
}
