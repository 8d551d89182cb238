// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — policy.rs
// Governance Kernel: MODE + LANE Tool Matrix
// Governance Tier: LAW
// Invariant: FAIL_CLOSED_TOOLS | SILENT_STRIP
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! Tools available to an identity are a pure function of MODE + LANE.
//! Disallowed tools are STRIPPED from the runtime context (not warned).
//! Unknown modes resolve to the most restrictive read-only set; unknown
//! tool names are denied outright.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

// ═══════════════════════════════════════════════════════════════════════════════
// TOOL CATEGORIES — CLOSED SET
// ═══════════════════════════════════════════════════════════════════════════════

/// Tools recognized by the governance runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolCategory {
    // Read-only
    ReadFile,
    GrepSearch,
    FileSearch,
    ListDir,
    GetErrors,
    ListUsages,
    GitChanges,
    // Write
    WriteFile,
    EditFile,
    DeleteFile,
    CreateDir,
    RunTerminal,
    GetTerminalOutput,
    GitCommit,
    GitPush,
    // External
    FetchWebpage,
    DbQuery,
    // Authority
    CreatePac,
    CreateWrap,
    CreateBer,
    RunSubagent,
}

impl ToolCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::ReadFile => "read_file",
            ToolCategory::GrepSearch => "grep_search",
            ToolCategory::FileSearch => "file_search",
            ToolCategory::ListDir => "list_dir",
            ToolCategory::GetErrors => "get_errors",
            ToolCategory::ListUsages => "list_code_usages",
            ToolCategory::GitChanges => "get_changed_files",
            ToolCategory::WriteFile => "write_file",
            ToolCategory::EditFile => "edit_file",
            ToolCategory::DeleteFile => "delete_file",
            ToolCategory::CreateDir => "create_directory",
            ToolCategory::RunTerminal => "run_in_terminal",
            ToolCategory::GetTerminalOutput => "get_terminal_output",
            ToolCategory::GitCommit => "git_commit",
            ToolCategory::GitPush => "git_push",
            ToolCategory::FetchWebpage => "fetch_webpage",
            ToolCategory::DbQuery => "db_query",
            ToolCategory::CreatePac => "create_pac",
            ToolCategory::CreateWrap => "create_wrap",
            ToolCategory::CreateBer => "create_ber",
            ToolCategory::RunSubagent => "run_subagent",
        }
    }

    /// Parse a tool name. Unknown names return None — the caller denies them.
    pub fn from_name(name: &str) -> Option<ToolCategory> {
        ALL_TOOLS.iter().copied().find(|t| t.as_str() == name)
    }
}

/// Every recognized tool, in declaration order.
pub const ALL_TOOLS: [ToolCategory; 21] = [
    ToolCategory::ReadFile,
    ToolCategory::GrepSearch,
    ToolCategory::FileSearch,
    ToolCategory::ListDir,
    ToolCategory::GetErrors,
    ToolCategory::ListUsages,
    ToolCategory::GitChanges,
    ToolCategory::WriteFile,
    ToolCategory::EditFile,
    ToolCategory::DeleteFile,
    ToolCategory::CreateDir,
    ToolCategory::RunTerminal,
    ToolCategory::GetTerminalOutput,
    ToolCategory::GitCommit,
    ToolCategory::GitPush,
    ToolCategory::FetchWebpage,
    ToolCategory::DbQuery,
    ToolCategory::CreatePac,
    ToolCategory::CreateWrap,
    ToolCategory::CreateBer,
    ToolCategory::RunSubagent,
];

lazy_static! {
    /// Safe in every mode.
    static ref READ_ONLY_TOOLS: BTreeSet<ToolCategory> = [
        ToolCategory::ReadFile,
        ToolCategory::GrepSearch,
        ToolCategory::FileSearch,
        ToolCategory::ListDir,
        ToolCategory::GetErrors,
        ToolCategory::ListUsages,
        ToolCategory::GitChanges,
    ]
    .into_iter()
    .collect();

    /// Mutating tools.
    static ref WRITE_TOOLS: BTreeSet<ToolCategory> = [
        ToolCategory::WriteFile,
        ToolCategory::EditFile,
        ToolCategory::DeleteFile,
        ToolCategory::CreateDir,
        ToolCategory::RunTerminal,
        ToolCategory::GetTerminalOutput,
        ToolCategory::GitCommit,
        ToolCategory::GitPush,
    ]
    .into_iter()
    .collect();

    /// Tools that reach outside the workspace.
    static ref EXTERNAL_TOOLS: BTreeSet<ToolCategory> = [
        ToolCategory::FetchWebpage,
        ToolCategory::DbQuery,
    ]
    .into_iter()
    .collect();

    /// Governance artifact creation — orchestration only.
    static ref AUTHORITY_TOOLS: BTreeSet<ToolCategory> = [
        ToolCategory::CreatePac,
        ToolCategory::CreateWrap,
        ToolCategory::CreateBer,
        ToolCategory::RunSubagent,
    ]
    .into_iter()
    .collect();

    /// Most restrictive fallback: read-only minimum for unrecognized modes
    /// and advisory work.
    static ref MINIMAL_TOOLS: BTreeSet<ToolCategory> = [
        ToolCategory::ReadFile,
        ToolCategory::GrepSearch,
        ToolCategory::ListDir,
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// LANE → PATH PREFIX TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Closed lane table. Lanes outside this table restrict to nothing; the
/// special lanes in `UNRESTRICTED_LANES` lift path restrictions entirely.
const LANE_PATH_PREFIXES: &[(&str, &[&str])] = &[
    ("CORE", &["/core/", "/src/core/"]),
    ("GOVERNANCE", &["/core/governance/", "/governance/"]),
    ("API", &["/api/", "/src/api/"]),
    ("BACKEND", &["/src/", "/core/", "/api/"]),
    ("FRONTEND", &["/frontend/", "/ui/"]),
    ("TESTING", &["/tests/", "/test/"]),
    ("DOCS", &["/docs/", "/documentation/"]),
    ("DATA", &["/data/", "/datasets/"]),
    ("ML", &["/ml/", "/models/"]),
    ("INFRA", &["/infra/", "/k8s/", "/manifests/"]),
    ("DEVOPS", &["/infra/", "/scripts/", "/build/"]),
    ("STRATEGIES", &["/strategies/"]),
];

const UNRESTRICTED_LANES: &[&str] = &["ALL", "*", "FULL_ACCESS"];

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of tool matrix evaluation. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed_tools: BTreeSet<ToolCategory>,
    pub denied_tools: BTreeSet<ToolCategory>,
    /// None means the lane imposes no path restriction.
    pub path_prefixes: Option<Vec<String>>,
    pub mode: String,
    pub lane: String,
}

impl PolicyDecision {
    pub fn is_restricted(&self) -> bool {
        !self.denied_tools.is_empty()
    }

    pub fn has_path_restrictions(&self) -> bool {
        self.path_prefixes.is_some()
    }
}

fn tools_for_mode(mode: &str) -> BTreeSet<ToolCategory> {
    match mode.to_uppercase().as_str() {
        "ORCHESTRATION" | "GOVERNANCE" => READ_ONLY_TOOLS
            .union(&WRITE_TOOLS)
            .chain(EXTERNAL_TOOLS.iter())
            .chain(AUTHORITY_TOOLS.iter())
            .copied()
            .collect(),
        "EXECUTION" | "MAINTENANCE" | "REFACTOR" => READ_ONLY_TOOLS
            .union(&WRITE_TOOLS)
            .chain(EXTERNAL_TOOLS.iter())
            .copied()
            .collect(),
        "SYNTHESIS" | "DOCUMENTATION" | "PLANNING" => {
            let mut tools = READ_ONLY_TOOLS.clone();
            tools.insert(ToolCategory::WriteFile);
            tools.insert(ToolCategory::EditFile);
            tools.insert(ToolCategory::CreateDir);
            tools
        }
        "TESTING" => {
            let mut tools = READ_ONLY_TOOLS.clone();
            tools.insert(ToolCategory::RunTerminal);
            tools.insert(ToolCategory::GetTerminalOutput);
            tools
        }
        "RESEARCH" | "ANALYSIS" => {
            let mut tools = READ_ONLY_TOOLS.clone();
            tools.insert(ToolCategory::FetchWebpage);
            tools
        }
        "DATA_ANALYSIS" => {
            let mut tools = READ_ONLY_TOOLS.clone();
            tools.insert(ToolCategory::DbQuery);
            tools
        }
        "REVIEW" | "AUDIT" => READ_ONLY_TOOLS.clone(),
        "ADVISORY" => MINIMAL_TOOLS.clone(),
        // Unknown mode → most restrictive set
        _ => MINIMAL_TOOLS.clone(),
    }
}

fn path_prefixes_for_lane(lane: &str) -> Option<Vec<String>> {
    let lane_upper = lane.to_uppercase();
    if UNRESTRICTED_LANES.contains(&lane_upper.as_str()) {
        return None;
    }
    LANE_PATH_PREFIXES
        .iter()
        .find(|(name, _)| *name == lane_upper)
        .map(|(_, prefixes)| prefixes.iter().map(|p| p.to_string()).collect())
        // Unknown lane: restrict to nothing rather than everything
        .or_else(|| Some(Vec::new()))
}

/// Evaluate tool availability for MODE + LANE. Pure and stateless.
pub fn evaluate(mode: &str, lane: &str) -> PolicyDecision {
    let allowed = tools_for_mode(mode);
    let denied = ALL_TOOLS
        .iter()
        .copied()
        .filter(|t| !allowed.contains(t))
        .collect();
    PolicyDecision {
        allowed_tools: allowed,
        denied_tools: denied,
        path_prefixes: path_prefixes_for_lane(lane),
        mode: mode.to_string(),
        lane: lane.to_string(),
    }
}

/// Strip disallowed tools from a list of tool names.
///
/// Order-preserving and idempotent. SILENT — stripped tools produce no
/// warning; they are simply invisible to the agent. Unknown names never
/// survive the strip.
pub fn strip(available_tools: &[String], mode: &str, lane: &str) -> Vec<String> {
    let decision = evaluate(mode, lane);
    available_tools
        .iter()
        .filter(|name| {
            ToolCategory::from_name(name)
                .map(|t| decision.allowed_tools.contains(&t))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Assert a tool is permitted. Fails with `ToolDenied`; unknown tool names
/// are denied.
pub fn assert_tool(tool: &str, mode: &str, lane: &str) -> GovernanceResult<()> {
    let allowed = ToolCategory::from_name(tool)
        .map(|t| evaluate(mode, lane).allowed_tools.contains(&t))
        .unwrap_or(false);
    if !allowed {
        return Err(GovernanceError::ToolDenied {
            tool: tool.to_string(),
            mode: mode.to_string(),
            lane: lane.to_string(),
        });
    }
    Ok(())
}

/// Assert a path is permitted for the lane. Fails with `PathDenied`.
pub fn assert_path(path: &str, lane: &str) -> GovernanceResult<()> {
    match path_prefixes_for_lane(lane) {
        None => Ok(()),
        Some(prefixes) => {
            let path_lower = path.to_lowercase();
            if prefixes.iter().any(|p| path_lower.contains(&p.to_lowercase())) {
                Ok(())
            } else {
                Err(GovernanceError::PathDenied {
                    path: path.to_string(),
                    lane: lane.to_string(),
                })
            }
        }
    }
}

/// Boolean convenience form of `assert_path`.
pub fn is_path_permitted(path: &str, lane: &str) -> bool {
    assert_path(path, lane).is_ok()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tools: &[ToolCategory]) -> Vec<String> {
        tools.iter().map(|t| t.as_str().to_string()).collect()
    }

    #[test]
    fn test_orchestration_gets_authority_tools() {
        let decision = evaluate("ORCHESTRATION", "ALL");
        assert!(decision.allowed_tools.contains(&ToolCategory::CreateBer));
        assert!(decision.allowed_tools.contains(&ToolCategory::WriteFile));
        assert!(!decision.has_path_restrictions());
    }

    #[test]
    fn test_execution_lacks_authority_tools() {
        let decision = evaluate("EXECUTION", "CORE");
        assert!(decision.allowed_tools.contains(&ToolCategory::WriteFile));
        assert!(decision.denied_tools.contains(&ToolCategory::CreateBer));
        assert!(decision.denied_tools.contains(&ToolCategory::CreatePac));
    }

    #[test]
    fn test_review_and_advisory_are_read_only() {
        for mode in ["REVIEW", "ADVISORY"] {
            let decision = evaluate(mode, "ALL");
            for tool in WRITE_TOOLS.iter().chain(AUTHORITY_TOOLS.iter()) {
                assert!(
                    !decision.allowed_tools.contains(tool),
                    "{mode} must not allow {tool:?}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_mode_is_most_restrictive() {
        let decision = evaluate("SHENANIGANS", "ALL");
        assert_eq!(decision.allowed_tools.len(), MINIMAL_TOOLS.len());
        assert!(decision.allowed_tools.contains(&ToolCategory::ReadFile));
        assert!(!decision.allowed_tools.contains(&ToolCategory::GetErrors));
    }

    #[test]
    fn test_strip_is_silent_and_order_preserving() {
        let available = names(&[
            ToolCategory::WriteFile,
            ToolCategory::ReadFile,
            ToolCategory::CreateBer,
            ToolCategory::ListDir,
        ]);
        let stripped = strip(&available, "REVIEW", "CORE");
        assert_eq!(stripped, names(&[ToolCategory::ReadFile, ToolCategory::ListDir]));
    }

    #[test]
    fn test_strip_is_idempotent() {
        let available = names(&[
            ToolCategory::ReadFile,
            ToolCategory::WriteFile,
            ToolCategory::RunTerminal,
        ]);
        let once = strip(&available, "TESTING", "TESTING");
        let twice = strip(&once, "TESTING", "TESTING");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_tool_names_denied() {
        let available = vec!["read_file".to_string(), "launch_missiles".to_string()];
        let stripped = strip(&available, "ORCHESTRATION", "ALL");
        assert_eq!(stripped, vec!["read_file".to_string()]);

        let err = assert_tool("launch_missiles", "ORCHESTRATION", "ALL").unwrap_err();
        assert!(matches!(err, GovernanceError::ToolDenied { .. }));
    }

    #[test]
    fn test_assert_tool_denied_for_mode() {
        assert!(assert_tool("write_file", "EXECUTION", "CORE").is_ok());
        let err = assert_tool("write_file", "REVIEW", "CORE").unwrap_err();
        assert!(matches!(err, GovernanceError::ToolDenied { .. }));
    }

    #[test]
    fn test_lane_path_restrictions() {
        assert!(is_path_permitted("/core/governance/session.rs", "GOVERNANCE"));
        assert!(!is_path_permitted("/frontend/app.tsx", "GOVERNANCE"));
        // ALL lane carries no restriction
        assert!(is_path_permitted("/anything/at/all", "ALL"));
    }

    #[test]
    fn test_unknown_lane_restricts_everything() {
        let err = assert_path("/core/lib.rs", "MYSTERY_LANE").unwrap_err();
        assert!(matches!(err, GovernanceError::PathDenied { .. }));
    }
}
