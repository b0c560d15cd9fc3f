use std::time::Duration;

/// Statistics collected during one batch call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub sentences: usize,
    pub workers: usize,
    pub bytes_written: u64,
    pub locations: usize,
    pub processing_time: Duration,
}

impl BatchStats {
    pub fn sentences_per_second(&self) -> f64 {
        let secs = self.processing_time.as_secs_f64();
        if secs > 0.0 {
            self.sentences as f64 / secs
        } else {
            0.0
        }
    }

    /// One-line summary for logs and `--stats`
    pub fn summary(&self) -> String {
        format!(
            "{} sentences, {} workers, {} locations, {} bytes in {:.3}s ({:.1} sentences/s)",
            self.sentences,
            self.workers,
            self.locations,
            self.bytes_written,
            self.processing_time.as_secs_f64(),
            self.sentences_per_second()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_per_second() {
        let stats = BatchStats {
            sentences: 100,
            processing_time: Duration::from_secs(4),
            ..Default::default()
        };
        assert_eq!(stats.sentences_per_second(), 25.0);
    }

    #[test]
    fn test_zero_time_rate() {
        assert_eq!(BatchStats::default().sentences_per_second(), 0.0);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let stats = BatchStats {
            sentences: 3,
            workers: 2,
            bytes_written: 42,
            locations: 2,
            processing_time: Duration::from_millis(500),
        };
        let summary = stats.summary();
        assert!(summary.starts_with("3 sentences, 2 workers, 2 locations, 42 bytes"));
    }
}
