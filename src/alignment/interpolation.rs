use itertools::Itertools;

/// Piecewise linear curve through (x, y) points with strictly increasing x.
///
/// Values outside the sampled domain are extrapolated from the first or last
/// segment.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearCurve {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearCurve {
    /// Build a curve from unordered points. Non-finite points are dropped and
    /// repeated x positions keep their first value. Returns `None` when fewer
    /// than two distinct x positions remain.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .dedup_by(|a, b| a.0 == b.0)
            .unzip();
        if xs.len() < 2 {
            return None;
        }
        Some(Self { xs, ys })
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        let upper = self.xs.partition_point(|v| *v < x).clamp(1, last);
        let (x0, x1) = (self.xs[upper - 1], self.xs[upper]);
        let (y0, y1) = (self.ys[upper - 1], self.ys[upper]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    pub fn resample(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|x| self.evaluate(*x)).collect()
    }
}
