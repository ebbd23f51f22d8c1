use std::time::Duration;

/// Timing pair collected from one successful trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialResult {
    pub total_time: f64, // client-measured round trip in seconds
    pub server_time: f64, // seconds reported by the x-process-time header (0 when absent)
}

#[derive(Debug, Clone)]
pub struct Report {
    pub requested: usize, // number of trials the batch was asked to run

    pub duration: Duration, // total duration of the batch

    // Indexed by trial id; None marks a failed or still pending trial.
    // Keeping the slot per id means successes always enumerate in trial
    // id order, regardless of completion order.
    pub results: Vec<Option<TrialResult>>,
}

impl Report {
    pub fn new(requested: usize) -> Self {
        Report {
            requested,
            duration: Duration::from_secs(0),
            results: vec![None; requested],
        }
    }

    /// Successful trials, in trial id order.
    pub fn successes(&self) -> Vec<TrialResult> {
        self.results.iter().flatten().copied().collect()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().flatten().count()
    }
}

/// Aggregate statistics over one numeric series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl StatsSummary {
    /// Compute statistics for a series, or None for an empty one.
    ///
    /// The median is the lower median: the element at index
    /// floor(len / 2) of the ascending-sorted series, not the averaged
    /// middle pair.
    pub fn from_series(series: &[f64]) -> Option<StatsSummary> {
        if series.is_empty() {
            return None;
        }

        let mut sorted = series.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        Some(StatsSummary {
            average: sorted.iter().sum::<f64>() / (sorted.len() as f64),
            median: sorted[sorted.len() / 2],
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_median_of_even_length_series() {
        let stats = StatsSummary::from_series(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        // element at index 2, not the 2.5 an averaged-middle-pair median would give
        assert_eq!(stats.median, 3.0);
    }

    #[test]
    fn median_of_odd_length_series() {
        let stats = StatsSummary::from_series(&[9.0, 1.0, 5.0]).unwrap();
        assert_eq!(stats.median, 5.0);
    }

    #[test]
    fn summary_over_unsorted_series() {
        let stats = StatsSummary::from_series(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.average, 2.5);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn empty_series_has_no_summary() {
        assert_eq!(StatsSummary::from_series(&[]), None);
    }

    #[test]
    fn constant_series_collapses_to_one_value() {
        let stats = StatsSummary::from_series(&[1.5, 1.5, 1.5]).unwrap();
        assert_eq!(stats.average, 1.5);
        assert_eq!(stats.median, 1.5);
        assert_eq!(stats.min, 1.5);
        assert_eq!(stats.max, 1.5);
    }

    #[test]
    fn successes_keep_trial_id_order_and_skip_failures() {
        let mut report = Report::new(4);
        report.results[3] = Some(TrialResult { total_time: 4.0, server_time: 0.4 });
        report.results[0] = Some(TrialResult { total_time: 1.0, server_time: 0.1 });
        // trials 1 and 2 failed

        let successes = report.successes();
        assert_eq!(report.success_count(), 2);
        assert_eq!(successes[0].total_time, 1.0);
        assert_eq!(successes[1].total_time, 4.0);
    }
}
