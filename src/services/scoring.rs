use serde::Serialize;

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scales raw marks onto the quiz's declared total. An attempt that answered
/// nothing scores zero instead of dividing by zero.
pub(crate) fn finalize_score(raw_score: i64, max_raw_score: i64, total_marks: i32) -> f64 {
    if max_raw_score <= 0 {
        return 0.0;
    }
    round2(raw_score as f64 / max_raw_score as f64 * f64::from(total_marks))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreEntry {
    pub(crate) learner_id: String,
    pub(crate) score: f64,
}

/// 1-based position of `learner_id` among `entries` by descending score.
///
/// `entries` must be in read order (attempt start time, then attempt id); the
/// sort is stable, so equal scores keep that order.
pub(crate) fn rank(entries: &[ScoreEntry], learner_id: &str) -> Option<usize> {
    let mut ranked: Vec<&ScoreEntry> = entries.iter().collect();
    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));
    ranked.iter().position(|entry| entry.learner_id == learner_id).map(|index| index + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct SummaryStatistics {
    pub(crate) count: usize,
    pub(crate) mean: f64,
    pub(crate) median: f64,
    pub(crate) max: f64,
    pub(crate) min: f64,
}

/// The median is the element at `n / 2` of the ascending scores, i.e. the upper
/// middle for an even count rather than the average of the two middles.
pub(crate) fn summary_statistics(scores: &[f64]) -> SummaryStatistics {
    if scores.is_empty() {
        return SummaryStatistics { count: 0, mean: 0.0, median: 0.0, max: 0.0, min: 0.0 };
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;

    SummaryStatistics {
        count,
        mean: round2(mean),
        median: round2(sorted[count / 2]),
        max: sorted[count - 1],
        min: sorted[0],
    }
}
