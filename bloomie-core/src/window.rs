//! Most-recent-first windowing of reactor series.

/// Parses a user-entered count, falling back to 1.
///
/// Empty, malformed, zero or negative input all yield 1 so that the window
/// always keeps at least one point and the stride is never zero.
pub fn parse_count(text: &str) -> usize {
    match text.trim().parse::<i64>() {
        Ok(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => 1,
    }
}

/// Stride and point cap used when plotting a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    downsample: usize,
    max_points: usize,
}

impl WindowSpec {
    /// Creates a window; values below 1 are raised to 1.
    pub fn new(downsample: usize, max_points: usize) -> Self {
        Self {
            downsample: downsample.max(1),
            max_points: max_points.max(1),
        }
    }

    /// Creates a window from the text of the two input fields.
    pub fn parse(downsample: &str, max_points: &str) -> Self {
        Self::new(parse_count(downsample), parse_count(max_points))
    }

    pub fn downsample(&self) -> usize {
        self.downsample
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Indices kept from a series of length `len`, most recent first.
    pub fn indices(&self, len: usize) -> impl Iterator<Item = usize> {
        (0..len).rev().step_by(self.downsample).take(self.max_points)
    }

    /// Applies the window to a series, returning points most recent first.
    pub fn apply<T: Clone>(&self, series: &[T]) -> Vec<T> {
        self.indices(series.len())
            .map(|i| series[i].clone())
            .collect()
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::new(1, 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_from_end() {
        let series: Vec<i32> = (0..20).collect();
        let spec = WindowSpec::new(3, 4);
        assert_eq!(spec.apply(&series), vec![19, 16, 13, 10]);
    }

    #[test]
    fn test_window_is_pure() {
        let series: Vec<f64> = (0..57).map(f64::from).collect();
        let spec = WindowSpec::new(4, 9);
        assert_eq!(spec.apply(&series), spec.apply(&series));
    }

    #[test]
    fn test_exhausts_short_series() {
        let series = [1, 2, 3, 4, 5];
        assert_eq!(WindowSpec::new(2, 100).apply(&series), vec![5, 3, 1]);
        assert!(WindowSpec::new(1, 10).apply::<i32>(&[]).is_empty());
    }

    #[test]
    fn test_parse_count_guards() {
        assert_eq!(parse_count("0"), 1);
        assert_eq!(parse_count("-1"), 1);
        assert_eq!(parse_count(""), 1);
        assert_eq!(parse_count("abc"), 1);
        assert_eq!(parse_count(" 25 "), 25);
        assert_eq!(WindowSpec::new(0, 0), WindowSpec::new(1, 1));
        assert_eq!(WindowSpec::parse("-1", ""), WindowSpec::new(1, 1));
    }
}
