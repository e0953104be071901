use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of target an analysis is run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Ecosystem,
    Species,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Ecosystem => "ecosystem",
            AnalysisType::Species => "species",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analysis type '{0}' (expected 'ecosystem' or 'species')")]
pub struct ParseAnalysisTypeError(pub String);

impl FromStr for AnalysisType {
    type Err = ParseAnalysisTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ecosystem" | "eco" => Ok(AnalysisType::Ecosystem),
            "species" => Ok(AnalysisType::Species),
            other => Err(ParseAnalysisTypeError(other.to_string())),
        }
    }
}

/// Conservation threat level attached to a species option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The selected analysis target. Carrying the selection inside the variant
/// guarantees exactly the field matching the analysis type is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    Ecosystem(String),
    Species(String),
}

impl AnalysisTarget {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            AnalysisTarget::Ecosystem(_) => AnalysisType::Ecosystem,
            AnalysisTarget::Species(_) => AnalysisType::Species,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnalysisTarget::Ecosystem(name) | AnalysisTarget::Species(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("{0} selection is empty")]
    EmptyTarget(AnalysisType),
}

/// A validated research query, built fresh for each submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery {
    query: String,
    target: AnalysisTarget,
}

impl AnalysisQuery {
    /// Build a query; the text is trimmed and must be non-empty, as must the target.
    pub fn new(query: &str, target: AnalysisTarget) -> Result<Self, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        if target.name().trim().is_empty() {
            return Err(QueryError::EmptyTarget(target.analysis_type()));
        }
        Ok(Self {
            query: query.to_string(),
            target,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn target(&self) -> &AnalysisTarget {
        &self.target
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.target.analysis_type()
    }

    pub fn ecosystem(&self) -> Option<&str> {
        match &self.target {
            AnalysisTarget::Ecosystem(id) => Some(id),
            AnalysisTarget::Species(_) => None,
        }
    }

    pub fn species(&self) -> Option<&str> {
        match &self.target {
            AnalysisTarget::Species(id) => Some(id),
            AnalysisTarget::Ecosystem(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_trimmed() {
        let q = AnalysisQuery::new(
            "  threats to arctic \n",
            AnalysisTarget::Ecosystem("arctic-terrestrial".into()),
        )
        .unwrap();
        assert_eq!(q.query(), "threats to arctic");
        assert_eq!(q.analysis_type(), AnalysisType::Ecosystem);
        assert_eq!(q.ecosystem(), Some("arctic-terrestrial"));
        assert_eq!(q.species(), None);
    }

    #[test]
    fn blank_query_or_target_rejected() {
        assert_eq!(
            AnalysisQuery::new("   ", AnalysisTarget::Species("jaguar".into())),
            Err(QueryError::EmptyQuery)
        );
        assert_eq!(
            AnalysisQuery::new("decline", AnalysisTarget::Species(" ".into())),
            Err(QueryError::EmptyTarget(AnalysisType::Species))
        );
    }

    #[test]
    fn analysis_type_parses_case_insensitively() {
        assert_eq!("Species".parse::<AnalysisType>().unwrap(), AnalysisType::Species);
        assert_eq!("eco".parse::<AnalysisType>().unwrap(), AnalysisType::Ecosystem);
        assert!("habitat".parse::<AnalysisType>().is_err());
    }

    #[test]
    fn threat_levels_order_by_severity() {
        assert!(ThreatLevel::Critical > ThreatLevel::High);
        assert!(ThreatLevel::Medium > ThreatLevel::Low);
        assert_eq!(
            serde_json::to_string(&ThreatLevel::Critical).unwrap(),
            "\"critical\""
        );
    }
}
