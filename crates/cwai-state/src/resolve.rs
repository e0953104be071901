//! Resolution of a form selection to the backend's numeric target id.
//!
//! The form works with the bundled catalog's string ids; the backend keys its
//! rows by integer. Matching is exact string equality against either the
//! selected id or its bundled label. No fuzzy matching: an unmatched
//! selection is sent name-only.

use cwai_protocol::{AnalysisTarget, Catalog, Ecosystem, Species};

/// Catalog rows fetched from the backend at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCatalog {
    pub ecosystems: Vec<Ecosystem>,
    pub species: Vec<Species>,
}

impl RemoteCatalog {
    pub fn new(ecosystems: Vec<Ecosystem>, species: Vec<Species>) -> Self {
        Self {
            ecosystems,
            species,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ecosystems.is_empty() && self.species.is_empty()
    }

    /// Backend id for the target, if any row matches exactly.
    pub fn resolve_target_id(&self, target: &AnalysisTarget, catalog: &Catalog) -> Option<i64> {
        match target {
            AnalysisTarget::Ecosystem(selected) => {
                let label = catalog.ecosystem(selected).map(|e| e.label.as_str());
                self.ecosystems
                    .iter()
                    .find(|row| row.name == *selected || Some(row.name.as_str()) == label)
                    .map(|row| row.id)
            }
            AnalysisTarget::Species(selected) => {
                let label = catalog.species_by_id(selected).map(|s| s.label.as_str());
                self.species
                    .iter()
                    .find(|row| {
                        let names = [Some(row.scientific_name.as_str()), row.common_name.as_deref()];
                        names
                            .into_iter()
                            .flatten()
                            .any(|name| name == selected || Some(name) == label)
                    })
                    .map(|row| row.id)
            }
        }
    }
}
