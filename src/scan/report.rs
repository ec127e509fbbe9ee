//! Scan Results

/// Outcome of one scanner invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
}

impl ToolResult {
    pub fn new(tool: impl Into<String>, success: bool) -> Self {
        Self {
            tool: tool.into(),
            success,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.success {
            "✓ Success"
        } else {
            "✗ Failed"
        }
    }
}

/// Ordered results of a scan run, one entry per requested tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    results: Vec<ToolResult>,
}

impl ScanReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ToolResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ToolResult] {
        &self.results
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ToolResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// True when every tool succeeded (vacuously true for an empty run)
    pub fn all_succeeded(&self) -> bool {
        self.success_count() == self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = ScanReport::new();
        report.push(ToolResult::new("gitleaks", true));
        report.push(ToolResult::new("trivy", false));
        report.push(ToolResult::new("semgrep", true));

        assert_eq!(report.total(), 3);
        assert_eq!(report.success_count(), 2);
        assert!(!report.all_succeeded());

        let failed: Vec<_> = report.failed().map(|r| r.tool.as_str()).collect();
        assert_eq!(failed, vec!["trivy"]);
    }

    #[test]
    fn test_empty_report() {
        let report = ScanReport::new();
        assert_eq!(report.total(), 0);
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_status_label() {
        assert_eq!(ToolResult::new("a", true).status_label(), "✓ Success");
        assert_eq!(ToolResult::new("a", false).status_label(), "✗ Failed");
    }
}
