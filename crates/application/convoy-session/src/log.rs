use std::fmt::Write;

/// One failed file operation. Multi-step operations record which
/// sub-steps had completed before the failure.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub operation: &'static str,
    pub source: String,
    pub destination: String,
    pub completed_steps: Vec<&'static str>,
    pub message: String,
}

/// Per-session append-only record of failed file operations. Written
/// to persisted storage only if non-empty at session end.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<LogEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: LogEntry) {
        tracing::error!(
            "{} failed for {} -> {}: {}",
            entry.operation,
            entry.source,
            entry.destination,
            entry.message
        );
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Free-text rendering, one block per failure.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "----- {} error -----", entry.operation);
            let _ = writeln!(out, "Source: {}", entry.source);
            let _ = writeln!(out, "Destination: {}", entry.destination);
            if !entry.completed_steps.is_empty() {
                let _ = writeln!(out, "Completed steps: {}", entry.completed_steps.join(", "));
            }
            let _ = writeln!(out, "Message: {}", entry.message);
            let _ = writeln!(out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_substeps() {
        let mut log = ErrorLog::new();
        log.record(LogEntry {
            operation: "soft_delete",
            source: "docs/a.txt".into(),
            destination: ".convoy/archive/docs/a.txt".into(),
            completed_steps: vec!["download", "delete"],
            message: "upload refused".into(),
        });

        let text = log.render();
        assert!(text.contains("soft_delete"));
        assert!(text.contains("download, delete"));
        assert!(text.contains("upload refused"));
        assert_eq!(log.len(), 1);
    }
}
