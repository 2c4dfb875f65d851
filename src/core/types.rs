use crate::core::models::{RecordOutcome, StudentResult};

/// Per-run tally of record outcomes
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStats {
    pub found: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl ProcessStats {
    pub fn add_result(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Found => self.found += 1,
            RecordOutcome::NoData => self.no_data += 1,
            RecordOutcome::Errored => self.failed += 1,
        }
    }

    pub fn tally(results: &[StudentResult]) -> Self {
        results.iter().fold(Self::default(), |mut stats, r| {
            stats.add_result(r.outcome());
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.found + self.no_data + self.failed
    }

    /// Records without an error, matching what the portal-facing summary calls "successful"
    pub fn successful(&self) -> usize {
        self.found + self.no_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RegistrationNumber;

    #[test]
    fn test_tally_counts_each_outcome() {
        let reg = RegistrationNumber::from("21105124001");
        let mut found = StudentResult::empty(reg.clone());
        found.name = "RAVI".into();
        let results = vec![
            found,
            StudentResult::empty(reg.clone()),
            StudentResult::failed(reg, "x"),
        ];
        let stats = ProcessStats::tally(&results);
        assert_eq!(stats, ProcessStats { found: 1, no_data: 1, failed: 1 });
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.successful(), 2);
    }
}
