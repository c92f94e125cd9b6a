use serde::{Deserialize, Serialize};

/// Default band edges in milliseconds.
pub const DEFAULT_EDGES_MS: [f64; 5] = [100.0, 500.0, 1_000.0, 5_000.0, 10_000.0];

/// A latency band covering `[min, max)`; `max: None` is open upward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatencyBand {
    pub label: String,
    pub min: f64,
    pub max: Option<f64>,
}

impl LatencyBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value < max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistogramBucket {
    pub label: String,
    pub min: f64,
    pub max: Option<f64>,
    pub count: usize,
}

/// `<100ms, 100-500ms, 500ms-1s, 1-5s, 5-10s, >10s`
pub fn default_bands() -> Vec<LatencyBand> {
    bands_from_edges(&DEFAULT_EDGES_MS)
}

/// Builds contiguous bands from millisecond edges. The first band starts at
/// zero and the last is open-ended. Edges are sorted and de-duplicated;
/// non-finite or non-positive edges are ignored.
pub fn bands_from_edges(edges_ms: &[f64]) -> Vec<LatencyBand> {
    let mut edges: Vec<f64> = edges_ms
        .iter()
        .copied()
        .filter(|e| e.is_finite() && *e > 0.0)
        .collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup();

    let (Some(&first), Some(&last)) = (edges.first(), edges.last()) else {
        return vec![LatencyBand {
            label: "all".to_string(),
            min: 0.0,
            max: None,
        }];
    };

    let mut bands = Vec::with_capacity(edges.len() + 1);
    bands.push(LatencyBand {
        label: format!("<{}", format_ms(first)),
        min: 0.0,
        max: Some(first),
    });
    for pair in edges.windows(2) {
        bands.push(LatencyBand {
            label: range_label(pair[0], pair[1]),
            min: pair[0],
            max: Some(pair[1]),
        });
    }
    bands.push(LatencyBand {
        label: format!(">{}", format_ms(last)),
        min: last,
        max: None,
    });
    bands
}

/// Counts each duration into the first band containing it. Negative and NaN
/// durations are not counted.
pub fn build_histogram(durations_ms: &[f64], bands: &[LatencyBand]) -> Vec<HistogramBucket> {
    let mut counts = vec![0usize; bands.len()];
    let mut skipped = 0usize;
    for &d in durations_ms {
        match bands.iter().position(|b| b.contains(d)) {
            Some(i) => counts[i] += 1,
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "durations outside every latency band");
    }

    bands
        .iter()
        .zip(counts)
        .map(|(band, count)| HistogramBucket {
            label: band.label.clone(),
            min: band.min,
            max: band.max,
            count,
        })
        .collect()
}

fn whole_seconds(ms: f64) -> bool {
    ms >= 1_000.0 && ms % 1_000.0 == 0.0
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn format_ms(ms: f64) -> String {
    if whole_seconds(ms) {
        format!("{}s", format_number(ms / 1_000.0))
    } else {
        format!("{}ms", format_number(ms))
    }
}

fn range_label(lo: f64, hi: f64) -> String {
    match (whole_seconds(lo), whole_seconds(hi)) {
        (true, true) => format!(
            "{}-{}s",
            format_number(lo / 1_000.0),
            format_number(hi / 1_000.0)
        ),
        (false, false) => format!("{}-{}ms", format_number(lo), format_number(hi)),
        _ => format!("{}-{}", format_ms(lo), format_ms(hi)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(buckets: &[HistogramBucket]) -> Vec<usize> {
        buckets.iter().map(|b| b.count).collect()
    }

    #[test]
    fn default_labels() {
        let labels: Vec<_> = default_bands().into_iter().map(|b| b.label).collect();
        assert_eq!(
            labels,
            vec!["<100ms", "100-500ms", "500ms-1s", "1-5s", "5-10s", ">10s"]
        );
    }

    #[test]
    fn one_duration_per_default_band() {
        let buckets = build_histogram(
            &[50.0, 150.0, 600.0, 2_000.0, 7_000.0, 15_000.0],
            &default_bands(),
        );
        assert_eq!(counts(&buckets), vec![1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn band_edges_are_half_open() {
        let buckets = build_histogram(&[0.0, 100.0, 500.0, 9_999.9, 10_000.0], &default_bands());
        assert_eq!(counts(&buckets), vec![1, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn last_band_is_open_ended() {
        let bands = default_bands();
        let last = bands.last().unwrap();
        assert_eq!(last.min, 10_000.0);
        assert_eq!(last.max, None);
        assert!(last.contains(1e12));
    }

    #[test]
    fn negative_and_nan_are_not_counted() {
        let buckets = build_histogram(&[-5.0, f64::NAN, 10.0], &default_bands());
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 1);
    }

    #[test]
    fn custom_edges_are_sorted_and_deduped() {
        let bands = bands_from_edges(&[2_000.0, 250.0, 2_000.0, -1.0]);
        let labels: Vec<_> = bands.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["<250ms", "250ms-2s", ">2s"]);

        let buckets = build_histogram(&[10.0, 300.0, 1_999.0, 2_000.0], &bands);
        assert_eq!(counts(&buckets), vec![1, 2, 1]);
    }

    #[test]
    fn no_edges_gives_single_band() {
        let bands = bands_from_edges(&[]);
        assert_eq!(bands.len(), 1);
        assert_eq!(counts(&build_histogram(&[1.0, 1e6], &bands)), vec![2]);
    }

    #[test]
    fn empty_durations_give_zero_counts() {
        let buckets = build_histogram(&[], &default_bands());
        assert_eq!(buckets.len(), 6);
        assert!(buckets.iter().all(|b| b.count == 0));
    }

    #[test]
    fn fractional_seconds_label_in_millis() {
        let labels: Vec<_> = bands_from_edges(&[1_500.0, 2_500.0])
            .into_iter()
            .map(|b| b.label)
            .collect();
        assert_eq!(labels, vec!["<1500ms", "1500-2500ms", ">2500ms"]);
    }
}
