/// Default backend API root, including the versioned prefix.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Versioned prefix the backend mounts its routers under.
pub const API_V1_PREFIX: &str = "/api/v1";

/// Default per-request timeout. Matches the backend's own AI call timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Page size used when listing recent reports.
pub const DEFAULT_REPORT_PAGE_SIZE: u32 = 10;

pub const QUERY_REQUIRED_MSG: &str = "Please enter a research query";
pub const ECOSYSTEM_REQUIRED_MSG: &str = "Please select an ecosystem";
pub const SPECIES_REQUIRED_MSG: &str = "Please select a species";

pub const INITIAL_LOAD_FAILED_MSG: &str = "Failed to fetch initial data.";
pub const ANALYSIS_FAILED_MSG: &str = "Failed to generate report.";
