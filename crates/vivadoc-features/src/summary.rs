use crate::model::Feature;

/// Run statistics for a feature (or an aggregate over several features),
/// surfaced in the documentation summary table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureStats {
    pub scenarios: usize,
    pub steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub duration_nanos: u64,
}

impl FeatureStats {
    pub fn of(feature: &Feature) -> Self {
        let mut stats = Self::default();
        for scenario in feature.scenarios() {
            stats.scenarios += 1;
            for step in &scenario.steps {
                stats.steps += 1;
                let status = step.status();
                if status.is_passed() {
                    stats.passed_steps += 1;
                } else if status.is_failed() {
                    stats.failed_steps += 1;
                } else {
                    stats.skipped_steps += 1;
                }
                stats.duration_nanos += step.duration_nanos();
            }
        }
        stats
    }

    pub fn passed(&self) -> bool {
        self.failed_steps == 0
    }

    fn absorb(&mut self, other: &FeatureStats) {
        self.scenarios += other.scenarios;
        self.steps += other.steps;
        self.passed_steps += other.passed_steps;
        self.failed_steps += other.failed_steps;
        self.skipped_steps += other.skipped_steps;
        self.duration_nanos += other.duration_nanos;
    }
}

/// Aggregate statistics across a whole feature set.
pub fn totals<'a>(features: impl IntoIterator<Item = &'a Feature>) -> FeatureStats {
    let mut total = FeatureStats::default();
    for feature in features {
        total.absorb(&FeatureStats::of(feature));
    }
    total
}
