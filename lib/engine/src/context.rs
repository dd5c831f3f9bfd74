use crate::sparql::error::QueryEvaluationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A handle that allows aborting a running query evaluation from another thread.
///
/// Clones share the same signal. Cancelling any clone cancels all evaluations that use the token.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals all evaluations that use this token to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// State that is shared by all operators of a single evaluation.
///
/// Every operator checks the context whenever it produces a solution such that long-running
/// joins or path closures stop promptly.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl ExecutionContext {
    /// Creates a new context. The timeout starts counting immediately.
    pub fn new(cancellation: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            cancellation,
            deadline: timeout.map(|timeout| (Instant::now() + timeout, timeout)),
        }
    }

    /// Returns an error if the evaluation has been cancelled or ran out of time.
    pub fn check(&self) -> Result<(), QueryEvaluationError> {
        if self.cancellation.is_cancelled() {
            return Err(QueryEvaluationError::Cancelled);
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(QueryEvaluationError::Timeout(timeout));
            }
        }
        Ok(())
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(CancellationToken::new(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let context = ExecutionContext::new(token.clone(), None);
        assert!(context.check().is_ok());

        token.clone().cancel();
        assert!(matches!(
            context.check(),
            Err(QueryEvaluationError::Cancelled)
        ));
    }

    #[test]
    fn zero_timeout_expires() {
        let context = ExecutionContext::new(CancellationToken::new(), Some(Duration::ZERO));
        assert!(matches!(
            context.check(),
            Err(QueryEvaluationError::Timeout(_))
        ));
    }
}
