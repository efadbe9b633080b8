/// Single-tick progress estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// 0..=100
    pub percent: u8,
    /// 1-based index of the task that reported
    pub current_file: usize,
}

/// Aggregated progress of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Equal-weight mean of per-task completion, 0..=100, never decreasing
    pub percent: u8,
    /// Advisory: 1-based index of whichever task reported last
    pub current_file: usize,
    /// Tasks whose upload response has arrived
    pub completed: usize,
    pub total_files: usize,
}

/// Fraction of one task, 0 when the total is unknown
pub fn task_fraction(bytes_sent: u64, bytes_total: u64) -> f64 {
    if bytes_total > 0 {
        (bytes_sent as f64 / bytes_total as f64).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `round(100 * (task_index + sent/total) / batch_size)`, clamped to `[0, 100]`
pub fn overall_progress(
    task_index: usize,
    bytes_sent: u64,
    bytes_total: u64,
    batch_size: usize,
) -> ProgressSnapshot {
    let percent = if batch_size > 0 {
        let raw = 100.0 * (task_index as f64 + task_fraction(bytes_sent, bytes_total)) / batch_size as f64;
        raw.round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    ProgressSnapshot {
        percent,
        current_file: task_index + 1,
    }
}

/// Per-batch progress state, fed by every transport tick
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    fractions: Vec<f64>,
    completed: Vec<bool>,
    current_file: usize,
    last_percent: u8,
}

impl ProgressAggregator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            fractions: vec![0.0; batch_size],
            completed: vec![false; batch_size],
            current_file: 0,
            last_percent: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.fractions.len()
    }

    /// Apply one tick. Ticks for unknown tasks are ignored.
    pub fn record(&mut self, index: usize, bytes_sent: u64, bytes_total: u64) -> Option<BatchProgress> {
        let fraction = self.fractions.get_mut(index)?;

        // a task never goes backwards
        *fraction = fraction.max(task_fraction(bytes_sent, bytes_total));
        self.current_file = index + 1;

        Some(self.snapshot())
    }

    /// The media host answered for this task
    pub fn mark_complete(&mut self, index: usize) -> Option<BatchProgress> {
        let fraction = self.fractions.get_mut(index)?;
        *fraction = 1.0;
        self.completed[index] = true;

        Some(self.snapshot())
    }

    pub fn completed(&self) -> usize {
        self.completed.iter().filter(|done| **done).count()
    }

    pub fn snapshot(&mut self) -> BatchProgress {
        let total_files = self.batch_size();
        let percent = if total_files > 0 {
            let sum: f64 = self.fractions.iter().sum();
            (100.0 * sum / total_files as f64).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        self.last_percent = self.last_percent.max(percent);

        BatchProgress {
            percent: self.last_percent,
            current_file: self.current_file,
            completed: self.completed(),
            total_files,
        }
    }
}
