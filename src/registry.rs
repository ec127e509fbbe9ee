//! Tool Registry
//!
//! Static table of the scanners xscan knows how to launch. The file globs
//! are informational only; each scanner decides for itself what to read.

use crate::scan::ScanError;

/// A scanner that can be launched through the orchestration CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Service name passed to `run --rm`
    pub name: &'static str,

    /// Human-readable description
    pub description: &'static str,

    /// File patterns the scanner looks at
    pub file_types: &'static [&'static str],
}

/// All known scanners, in the order `--all` runs them
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "semgrep",
        description: "Static code analysis",
        file_types: &[
            "*.py", "*.js", "*.java", "*.go", "*.cpp", "*.c", "*.cs", "*.php", "*.rb", "*.ts",
        ],
    },
    ToolSpec {
        name: "gitleaks",
        description: "Secret scanner",
        file_types: &["*"],
    },
    ToolSpec {
        name: "trivy",
        description: "Vulnerability scanner",
        file_types: &[
            "Dockerfile*",
            "*.yaml",
            "*.yml",
            "package*.json",
            "requirements.txt",
        ],
    },
    ToolSpec {
        name: "checkov",
        description: "IaC scanner",
        file_types: &[
            "*.tf",
            "*.yaml",
            "*.yml",
            "Dockerfile*",
            ".dockerignore",
            "package.json",
        ],
    },
    ToolSpec {
        name: "kubescape",
        description: "Kubernetes scanner",
        file_types: &["*.yaml", "*.yml"],
    },
];

/// Look up a scanner by name
pub fn lookup(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// Names of every registered scanner
pub fn all_names() -> Vec<String> {
    TOOLS.iter().map(|tool| tool.name.to_string()).collect()
}

/// Parse a comma-separated tool list, trimming whitespace around each name
///
/// An empty segment (as in `gitleaks,,trivy`) is an empty name and therefore
/// invalid. Every unknown name is collected into a single
/// [`ScanError::InvalidTools`] so the caller can report them together.
pub fn parse_tool_list(input: &str) -> Result<Vec<String>, ScanError> {
    let tools: Vec<String> = input
        .split(',')
        .map(|name| name.trim().to_string())
        .collect();

    validate_tools(&tools)?;
    Ok(tools)
}

/// Check that every name is a registered scanner
pub fn validate_tools<S: AsRef<str>>(tools: &[S]) -> Result<(), ScanError> {
    let invalid: Vec<String> = tools
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| lookup(name).is_none())
        .map(str::to_string)
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ScanError::InvalidTools(invalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let names = all_names();
        assert_eq!(
            names,
            vec!["semgrep", "gitleaks", "trivy", "checkov", "kubescape"]
        );
    }

    #[test]
    fn test_lookup() {
        let trivy = lookup("trivy").unwrap();
        assert_eq!(trivy.description, "Vulnerability scanner");
        assert!(trivy.file_types.contains(&"requirements.txt"));

        assert!(lookup("nmap").is_none());
        assert!(lookup("Trivy").is_none());
    }

    #[test]
    fn test_parse_tool_list_trims_whitespace() {
        let tools = parse_tool_list(" gitleaks , trivy").unwrap();
        assert_eq!(tools, vec!["gitleaks", "trivy"]);
    }

    #[test]
    fn test_parse_tool_list_keeps_order() {
        let tools = parse_tool_list("kubescape,semgrep,gitleaks").unwrap();
        assert_eq!(tools, vec!["kubescape", "semgrep", "gitleaks"]);
    }

    #[test]
    fn test_parse_tool_list_rejects_empty_segments() {
        let err = parse_tool_list("gitleaks,,trivy").unwrap_err();
        match &err {
            ScanError::InvalidTools(names) => assert_eq!(names, &vec![String::new()]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "Invalid tools: \"\"");

        assert!(parse_tool_list("trivy,").is_err());
    }

    #[test]
    fn test_parse_tool_list_reports_all_invalid() {
        let err = parse_tool_list("gitleaks,nmap,zap").unwrap_err();
        match err {
            ScanError::InvalidTools(names) => assert_eq!(names, vec!["nmap", "zap"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_every_tool_has_file_types() {
        for tool in TOOLS {
            assert!(!tool.file_types.is_empty(), "{} has no file types", tool.name);
            assert!(!tool.description.is_empty());
        }
    }
}
