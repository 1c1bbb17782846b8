//! Closure-backed preprocessor for ad-hoc transformations

use std::fmt;

use aer_types::Signal;

use crate::error::PipelineResult;
use crate::preprocessor::SignalPreprocessor;

type SignalFn = dyn Fn(Signal) -> PipelineResult<Signal> + Send + Sync;

/// Wraps a closure as a [`SignalPreprocessor`].
///
/// The closure must behave as a pure function of its input.
pub struct FnPreprocessor {
    name: &'static str,
    func: Box<SignalFn>,
}

impl FnPreprocessor {
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(Signal) -> PipelineResult<Signal> + Send + Sync + 'static,
    {
        Self {
            name,
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnPreprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPreprocessor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SignalPreprocessor for FnPreprocessor {
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal> {
        (self.func)(signal)
    }

    fn preprocessor_type(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_closure_is_applied() {
        let square = FnPreprocessor::new("square", |s: Signal| Ok(s.mapv(|v| v * v)));
        assert_eq!(square.preprocessor_type(), "square");
        assert_eq!(
            square.process_signal(array![[2.0, -3.0]]).unwrap(),
            array![[4.0, 9.0]]
        );
    }
}
