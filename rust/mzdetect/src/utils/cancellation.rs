use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};

/// Cooperative cancellation flag shared between a caller and batch workers.
///
/// Workers check it between units of work (spectra, rows), never inside one,
/// so a cancelled batch leaves every unit either fully processed or untouched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
