/// Counters for one pipeline run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub prospects_listed: u32,
    pub sources_fetched: u32,
    pub sources_unchanged: u32,
    pub sources_failed: u32,
    pub sources_malformed: u32,
    pub messages_assembled: u32,
    pub transcripts_built: u32,
    pub transcripts_inconclusive: u32,
    pub targets_found: u32,
    pub ready_now: u32,
    pub waiting: u32,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Outreach Run Complete ===")?;
        writeln!(f, "Prospects listed:      {}", self.prospects_listed)?;
        writeln!(f, "Sources fetched:       {}", self.sources_fetched)?;
        writeln!(f, "Sources unchanged:     {}", self.sources_unchanged)?;
        writeln!(f, "Sources failed:        {}", self.sources_failed)?;
        writeln!(f, "Sources malformed:     {}", self.sources_malformed)?;
        writeln!(f, "Messages assembled:    {}", self.messages_assembled)?;
        writeln!(f, "Transcripts built:     {}", self.transcripts_built)?;
        writeln!(f, "Inconclusive:          {}", self.transcripts_inconclusive)?;
        writeln!(f, "Targets found:         {}", self.targets_found)?;
        writeln!(f, "  Ready now:           {}", self.ready_now)?;
        writeln!(f, "  Waiting:             {}", self.waiting)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_summary_includes_bucket_counts() {
        let stats = RunStats {
            targets_found: 3,
            ready_now: 2,
            waiting: 1,
            ..Default::default()
        };
        let rendered = stats.to_string();
        assert!(rendered.contains("Targets found:         3"));
        assert!(rendered.contains("Ready now:           2"));
        assert!(rendered.contains("Waiting:             1"));
    }
}
