// =============================================================================
// Rolling-window primitives
// =============================================================================
//
// Every operation here uses `min_periods = 1` semantics: a window that has
// not filled up yet computes over however many points exist instead of
// yielding a hole at the start of history. Sample statistics on a single
// point are pinned to 0.0.
//
// Inputs are expected to be finite — callers coerce undefined values through
// the policy helpers in `series` before aggregating.
// =============================================================================

use std::collections::VecDeque;

/// Sliding window that keeps its contents in sorted order so that percentile
/// rank queries are a binary search instead of a full window scan.
///
/// Insertion and eviction shift at most `W` elements; rank lookup is
/// O(log W). `W` is bounded (30–180 here) so the shifts stay cheap.
pub struct RankWindow {
    capacity: usize,
    ordered: Vec<f64>,
    arrival: VecDeque<f64>,
}

impl RankWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ordered: Vec::with_capacity(capacity.max(1)),
            arrival: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Push a value, evicting the oldest once the window is full, and return
    /// the percentile rank of the pushed value within the window: the
    /// fraction of window values ≤ it. The value always counts itself, so a
    /// single-point window ranks at exactly 1.0.
    pub fn push_and_rank(&mut self, value: f64) -> f64 {
        if self.arrival.len() == self.capacity {
            if let Some(oldest) = self.arrival.pop_front() {
                let pos = self
                    .ordered
                    .partition_point(|v| *v < oldest)
                    .min(self.ordered.len().saturating_sub(1));
                self.ordered.remove(pos);
            }
        }

        let insert_at = self.ordered.partition_point(|v| *v < value);
        self.ordered.insert(insert_at, value);
        self.arrival.push_back(value);

        let le = self.ordered.partition_point(|v| *v <= value);
        le as f64 / self.ordered.len() as f64
    }
}

/// Rolling percentile rank of each point within its trailing window.
pub fn rolling_percentile_rank(values: &[f64], window: usize) -> Vec<f64> {
    let mut win = RankWindow::new(window);
    values.iter().map(|&v| win.push_and_rank(v)).collect()
}

/// Rolling arithmetic mean over the trailing `window` points.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

/// Rolling median over the trailing `window` points.
pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut ordered: Vec<f64> = Vec::with_capacity(window);
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i >= window {
            let evicted = values[i - window];
            let pos = ordered
                .partition_point(|v| *v < evicted)
                .min(ordered.len().saturating_sub(1));
            ordered.remove(pos);
        }
        let v = values[i];
        let insert_at = ordered.partition_point(|x| *x < v);
        ordered.insert(insert_at, v);

        let n = ordered.len();
        let median = if n % 2 == 1 {
            ordered[n / 2]
        } else {
            (ordered[n / 2 - 1] + ordered[n / 2]) / 2.0
        };
        out.push(median);
    }
    out
}

/// Rolling sample standard deviation (ddof = 1) over the trailing `window`
/// points. A single-point window is defined as 0.0, and non-finite values in
/// the window are skipped rather than poisoning the statistic.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let slice: Vec<f64> = values[start..=i].iter().copied().filter(|v| v.is_finite()).collect();
        out.push(sample_std(&slice));
    }
    out
}

/// Sample standard deviation of a slice; 0.0 for fewer than two points.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Exponentially weighted moving average with `alpha = 2 / (span + 1)`,
/// seeded with the first value (no adjust correction) — the full history to
/// date contributes with geometrically decaying weight.
pub fn ewma(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Pearson correlation of two equal-length slices.
///
/// Returns `None` when fewer than two points remain or either side has zero
/// variance (a flat series correlates with nothing).
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}
