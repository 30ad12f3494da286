//! Retry combinator for fallible key generation

/// Run `op` until it succeeds
///
/// `op` receives the zero-based attempt number. With `max_attempts` set, the
/// error of the last attempt is returned once the limit is reached; with
/// `None` the loop only ends on success. Anything secret an attempt creates
/// must be dropped (and zeroized) inside `op` before it returns an error.
pub fn retry_until_ok<T, E, F>(max_attempts: Option<u32>, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt = attempt.saturating_add(1);
                if max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(e);
                }
                tracing::debug!(attempt, error = %e, "Retrying");
            }
        }
    }
}
