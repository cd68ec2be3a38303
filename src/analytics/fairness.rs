//! Demographic fairness breakdown.
//!
//! Each metadata record is routed independently along three dimensions.
//! A record missing the field for one dimension still counts in the others.

use crate::analytics::primitives::percent;
use crate::models::{HivStatus, PatientMetadataRecord, Sex};
use serde::Serialize;
use std::collections::BTreeMap;

/// Positive-prediction tally for one demographic bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub total: usize,
    pub positive_count: usize,
}

impl BucketCount {
    fn record(&mut self, positive: bool) {
        self.total += 1;
        if positive {
            self.positive_count += 1;
        }
    }

    /// Positive rate as a percentage, `None` for an empty bucket.
    pub fn positive_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| percent(self.positive_count, self.total))
    }
}

/// Age bands with half-open boundaries at 19, 41 and 66.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeBand {
    #[serde(rename = "0-18")]
    Child,
    #[serde(rename = "19-40")]
    YoungAdult,
    #[serde(rename = "41-65")]
    Adult,
    #[serde(rename = "65+")]
    Senior,
}

impl AgeBand {
    pub const ALL: [AgeBand; 4] = [
        AgeBand::Child,
        AgeBand::YoungAdult,
        AgeBand::Adult,
        AgeBand::Senior,
    ];

    /// Band for an age in whole years.
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=18 => AgeBand::Child,
            19..=40 => AgeBand::YoungAdult,
            41..=65 => AgeBand::Adult,
            _ => AgeBand::Senior,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Child => "0-18",
            AgeBand::YoungAdult => "19-40",
            AgeBand::Adult => "41-65",
            AgeBand::Senior => "65+",
        }
    }
}

/// Fairness buckets along gender, age band and HIV status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessBreakdown {
    /// `male` and `female` only.
    pub by_gender: BTreeMap<Sex, BucketCount>,
    pub by_age: BTreeMap<AgeBand, BucketCount>,
    /// `positive` and `negative` only; `unknown` is excluded.
    pub by_hiv: BTreeMap<HivStatus, BucketCount>,
}

impl Default for FairnessBreakdown {
    fn default() -> Self {
        let by_gender = [Sex::Male, Sex::Female]
            .into_iter()
            .map(|s| (s, BucketCount::default()))
            .collect();
        let by_age = AgeBand::ALL
            .into_iter()
            .map(|b| (b, BucketCount::default()))
            .collect();
        let by_hiv = [HivStatus::Positive, HivStatus::Negative]
            .into_iter()
            .map(|h| (h, BucketCount::default()))
            .collect();

        Self {
            by_gender,
            by_age,
            by_hiv,
        }
    }
}

impl FairnessBreakdown {
    pub fn gender(&self, sex: &Sex) -> BucketCount {
        self.by_gender.get(sex).copied().unwrap_or_default()
    }

    pub fn age(&self, band: AgeBand) -> BucketCount {
        self.by_age.get(&band).copied().unwrap_or_default()
    }

    pub fn hiv(&self, status: &HivStatus) -> BucketCount {
        self.by_hiv.get(status).copied().unwrap_or_default()
    }
}

/// Partition metadata records into fairness buckets.
///
/// Records with no owning prediction label are skipped entirely.
pub fn fairness_breakdown(metadata: &[PatientMetadataRecord]) -> FairnessBreakdown {
    let mut breakdown = FairnessBreakdown::default();

    for m in metadata {
        let Some(label) = m.owner_label() else {
            continue;
        };
        let positive = label.is_positive();

        if let Some(ref sex) = m.sex {
            // Only pre-seeded buckets exist; other values fall through.
            if let Some(bucket) = breakdown.by_gender.get_mut(sex) {
                bucket.record(positive);
            }
        }

        if let Some(age) = m.age {
            if let Some(bucket) = breakdown.by_age.get_mut(&AgeBand::for_age(age)) {
                bucket.record(positive);
            }
        }

        if let Some(ref status) = m.hiv_status {
            if let Some(bucket) = breakdown.by_hiv.get_mut(status) {
                bucket.record(positive);
            }
        }
    }

    breakdown
}
