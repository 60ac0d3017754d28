/// Location and spread of the last `window_size` values pushed.
///
/// Keeps the window sorted (insertion step on every push) so that the
/// median and the min/max are available without re-sorting.
#[derive(Debug, Clone)]
pub struct RollingWindowStats {
    window_size: usize,
    // (value, insertion index), sorted by value
    data: Vec<(f64, usize)>,
    index: usize,
}

impl RollingWindowStats {
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "Window size must be positive");
        Self {
            window_size,
            data: Vec::with_capacity(window_size + 1),
            index: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.data.len() >= self.window_size {
            let min_index_keep = (self.index + 1) - self.window_size;
            self.data.retain(|x| x.1 >= min_index_keep);
        }
        let mut pos = self.data.len();
        while pos > 0 && value < self.data[pos - 1].0 {
            pos -= 1;
        }
        self.data.insert(pos, (value, self.index));
        self.index += 1;
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.window_size
    }

    pub fn mean(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        let sum: f64 = self.data.iter().map(|x| x.0).sum();
        Some(sum / self.data.len() as f64)
    }

    pub fn median(&self) -> Option<f64> {
        let n = self.data.len();
        if n == 0 {
            return None;
        }
        let mid = n / 2;
        if n % 2 == 1 {
            Some(self.data[mid].0)
        } else {
            Some((self.data[mid - 1].0 + self.data[mid].0) / 2.0)
        }
    }

    /// Population standard deviation.
    ///
    /// A window of identical values returns exactly `0.0`, independent of
    /// rounding in the mean.
    pub fn std_dev(&self) -> Option<f64> {
        let first = self.data.first()?.0;
        let last = self.data.last()?.0;
        if first == last {
            return Some(0.0);
        }
        let mean = self.mean()?;
        let ss: f64 = self.data.iter().map(|x| (x.0 - mean).powi(2)).sum();
        Some((ss / self.data.len() as f64).sqrt())
    }
}
