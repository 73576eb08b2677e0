//! Custom assertion macros and utilities
//!
//! Provides enhanced assertion macros for better test output and
//! more descriptive error messages.

/// Assert that a result is ok and return the value
///
/// This macro unwraps a Result, providing a better error message
/// if the result is an error.
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a result is an error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {{
        assert!($result.is_err(), "Expected Err, got Ok");
    }};
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}

/// Assert that a string contains a substring
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {{
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    }};
}

/// Assert that a download state settles within a deadline
#[macro_export]
macro_rules! assert_settles {
    ($receiver:expr, $pattern:pat) => {
        $crate::assert_settles!($receiver, $pattern, std::time::Duration::from_secs(5))
    };
    ($receiver:expr, $pattern:pat, $timeout:expr) => {{
        let settled = tokio::time::timeout($timeout, $receiver.wait_for(|s| matches!(s, $pattern)))
            .await
            .map(|result| result.map(|state| (*state).clone()));
        match settled {
            Ok(Ok(state)) => state,
            Ok(Err(_)) => panic!("Download state channel closed"),
            Err(_) => panic!(
                "State did not reach {} within {:?}, last: {:?}",
                stringify!($pattern),
                $timeout,
                *$receiver.borrow()
            ),
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assertions_work_in_match_arms() {
        let reason: Result<&str, String> = Ok("upload quota exceeded");
        match reason {
            Ok(text) => assert_contains!(text, "quota"),
            Err(e) => panic!("Unexpected error: {}", e),
        }

        let failed: Result<(), String> = Err("disk".to_string());
        match Some(failed) {
            Some(result) => assert_err!(result),
            None => unreachable!(),
        }
    }
}
