//! Grouping of analysis records into ordered count buckets
//!
//! Pure functions only. Bucket order is first-occurrence order in the input,
//! and the chart and its legend both index into that one sequence.

use lca_common::models::{is_truthy, value_text, CLAUSE_TYPE_PATH, RISK_LEVEL_PATH, UNKNOWN_BUCKET};
use lca_common::{ChartBucket, Clause};
use std::collections::HashMap;

/// Chart colours, assigned to buckets by index (wrapping)
pub const PALETTE: [&str; 16] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#A28CF0", "#FF6699", "#33CC99", "#9966FF",
    "#FF4444", "#FFCC00", "#66CCFF", "#99FF99", "#FF9966", "#CC99FF", "#66FFCC", "#FF66B2",
];

/// Count `records` by the value found at the dot-delimited `path`
///
/// A record whose path is absent, passes through a non-object, or ends in a
/// falsy value counts toward [`UNKNOWN_BUCKET`]. Every record lands in
/// exactly one bucket.
pub fn buckets_by_path(records: &[Clause], path: &str) -> Vec<ChartBucket> {
    let mut buckets: Vec<ChartBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let name = record
            .get_path(path)
            .filter(|v| is_truthy(v))
            .map(value_text)
            .unwrap_or_else(|| UNKNOWN_BUCKET.to_string());

        match index.get(&name) {
            Some(&i) => buckets[i].value += 1,
            None => {
                index.insert(name.clone(), buckets.len());
                buckets.push(ChartBucket::new(name, 1));
            }
        }
    }

    buckets
}

/// Colour for the bucket at `index`
pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// One legend row: the bucket and its colour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry<'a> {
    pub bucket: &'a ChartBucket,
    pub color: &'static str,
}

/// Legend rows in chart order
pub fn legend(buckets: &[ChartBucket]) -> Vec<LegendEntry<'_>> {
    buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| LegendEntry {
            bucket,
            color: color_for(i),
        })
        .collect()
}

/// One pie slice: the bucket, its colour and its share of the total
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<'a> {
    pub bucket: &'a ChartBucket,
    pub color: &'static str,
    pub share: f64,
}

/// Pie slices in chart order; shares sum to 1 for non-empty input
pub fn slices(buckets: &[ChartBucket]) -> Vec<Slice<'_>> {
    let total: u64 = buckets.iter().map(|b| b.value).sum();
    buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| Slice {
            bucket,
            color: color_for(i),
            share: if total == 0 {
                0.0
            } else {
                bucket.value as f64 / total as f64
            },
        })
        .collect()
}

/// The two chart views derived from one result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSet {
    pub clause_types: Vec<ChartBucket>,
    pub risk_levels: Vec<ChartBucket>,
}

impl ChartSet {
    pub fn from_results(results: &[Clause]) -> Self {
        Self {
            clause_types: buckets_by_path(results, CLAUSE_TYPE_PATH),
            risk_levels: buckets_by_path(results, RISK_LEVEL_PATH),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clause_types.is_empty() && self.risk_levels.is_empty()
    }
}
