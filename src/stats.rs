use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::privacy::{safe_count, SafeCount};
use crate::store::StoredRecord;

/// Width of an age histogram bin in years
const AGE_BIN_WIDTH: i64 = 10;

/// Welford's online algorithm for mean and variance in O(1) memory
#[derive(Debug, Clone, Default)]
pub struct WelfordStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl WelfordStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn std_dev(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

/// Occurrence counter reporting labels most frequent first
#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    counts: HashMap<String, u64>,
}

impl FrequencyCounter {
    pub fn add(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Labels sorted by count descending, then label ascending
    pub fn sorted(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> =
            self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

/// Count for one label in a distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: SafeCount,
}

/// Summary of age values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgeSummary {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Aggregate view over every stored record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub total_records: SafeCount,
    pub total_clinics: usize,
    pub unique_diagnoses: usize,
    pub age: AgeSummary,
    pub age_distribution: Vec<LabelCount>,
    pub diagnosis_distribution: Vec<LabelCount>,
    pub clinic_distribution: Vec<LabelCount>,
    pub bucketed: bool,
}

impl AnalyticsReport {
    pub fn from_records(records: &[StoredRecord], bucket_counts: bool) -> Self {
        let mut ages = WelfordStats::new();
        let mut age_bins: HashMap<i64, u64> = HashMap::new();
        let mut diagnoses = FrequencyCounter::default();
        let mut clinics = FrequencyCounter::default();

        for record in records {
            clinics.add(&record.clinic);

            if let Some(code) = record.diagnosis_code.as_deref() {
                diagnoses.add(code);
            }

            if let Some(age) = record.age {
                ages.update(age as f64);
                *age_bins.entry(age.div_euclid(AGE_BIN_WIDTH)).or_insert(0) += 1;
            }
        }

        let to_counts = |entries: Vec<(String, u64)>| -> Vec<LabelCount> {
            entries
                .into_iter()
                .map(|(label, n)| LabelCount {
                    label,
                    count: safe_count(n, bucket_counts),
                })
                .collect()
        };

        let bins: BTreeSet<i64> = age_bins.keys().copied().collect();
        let age_distribution = bins
            .into_iter()
            .map(|bin| {
                let lo = bin * AGE_BIN_WIDTH;
                LabelCount {
                    label: format!("{}-{}", lo, lo + AGE_BIN_WIDTH - 1),
                    count: safe_count(age_bins[&bin], bucket_counts),
                }
            })
            .collect();

        Self {
            total_records: safe_count(records.len() as u64, bucket_counts),
            total_clinics: clinics.distinct(),
            unique_diagnoses: diagnoses.distinct(),
            age: AgeSummary {
                count: ages.count(),
                mean: ages.mean(),
                std_dev: ages.std_dev(),
                min: ages.min(),
                max: ages.max(),
            },
            age_distribution,
            diagnosis_distribution: to_counts(diagnoses.sorted()),
            clinic_distribution: to_counts(clinics.sorted()),
            bucketed: bucket_counts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clinic_distribution.is_empty()
    }
}
