use std::collections::BTreeMap;
use std::fmt;

use cwai_protocol::{
    AnalysisQuery, AnalysisTarget, AnalysisType, Catalog, QueryError, SpeciesOption,
    ECOSYSTEM_REQUIRED_MSG, QUERY_REQUIRED_MSG, SPECIES_REQUIRED_MSG,
};

/// A form field that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Query,
    Ecosystem,
    Species,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::Query => "query",
            Field::Ecosystem => "ecosystem",
            Field::Species => "species",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Field → message. Empty means the form is valid.
pub type FieldErrors = BTreeMap<Field, &'static str>;

/// Validate the raw form values. Pure; an empty map means valid.
pub fn validate(
    query: &str,
    analysis_type: AnalysisType,
    selected_ecosystem: &str,
    selected_species: &str,
) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if query.trim().is_empty() {
        errors.insert(Field::Query, QUERY_REQUIRED_MSG);
    }

    match analysis_type {
        AnalysisType::Ecosystem if selected_ecosystem.trim().is_empty() => {
            errors.insert(Field::Ecosystem, ECOSYSTEM_REQUIRED_MSG);
        }
        AnalysisType::Species if selected_species.trim().is_empty() => {
            errors.insert(Field::Species, SPECIES_REQUIRED_MSG);
        }
        _ => {}
    }

    errors
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("unknown ecosystem '{0}'")]
    UnknownEcosystem(String),
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("select an ecosystem first to see available species")]
    EcosystemRequired,
    #[error("species '{species}' does not live in ecosystem '{ecosystem}'")]
    OutsideEcosystem { species: String, ecosystem: String },
}

/// Editable analysis form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    query: String,
    analysis_type: AnalysisType,
    selected_ecosystem: String,
    selected_species: String,
    errors: FieldErrors,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    pub fn selected_ecosystem(&self) -> &str {
        &self.selected_ecosystem
    }

    pub fn selected_species(&self) -> &str {
        &self.selected_species
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.errors.remove(&Field::Query);
    }

    /// Switch the target type. Errors are cleared; moving to ecosystem
    /// analysis also drops the species selection.
    pub fn set_analysis_type(&mut self, analysis_type: AnalysisType) {
        self.analysis_type = analysis_type;
        self.errors.clear();
        if analysis_type == AnalysisType::Ecosystem {
            self.selected_species.clear();
        }
    }

    /// Select an ecosystem by id. A species selection from another ecosystem is dropped.
    pub fn select_ecosystem(&mut self, catalog: &Catalog, id: &str) -> Result<(), SelectionError> {
        let ecosystem = catalog
            .ecosystem(id)
            .ok_or_else(|| SelectionError::UnknownEcosystem(id.to_string()))?;

        if !self.selected_species.is_empty() {
            let belongs = catalog
                .species_by_id(&self.selected_species)
                .is_some_and(|s| s.ecosystem_id == ecosystem.id);
            if !belongs {
                self.selected_species.clear();
            }
        }

        self.selected_ecosystem = ecosystem.id.clone();
        self.errors.remove(&Field::Ecosystem);
        Ok(())
    }

    /// Select a species; it must belong to the selected ecosystem.
    pub fn select_species(&mut self, catalog: &Catalog, id: &str) -> Result<(), SelectionError> {
        if self.selected_ecosystem.is_empty() {
            return Err(SelectionError::EcosystemRequired);
        }
        let species = catalog
            .species_by_id(id)
            .ok_or_else(|| SelectionError::UnknownSpecies(id.to_string()))?;
        if species.ecosystem_id != self.selected_ecosystem {
            return Err(SelectionError::OutsideEcosystem {
                species: species.id.clone(),
                ecosystem: self.selected_ecosystem.clone(),
            });
        }

        self.selected_species = species.id.clone();
        self.errors.remove(&Field::Species);
        Ok(())
    }

    /// Species the form currently offers.
    pub fn available_species<'c>(&self, catalog: &'c Catalog) -> Vec<&'c SpeciesOption> {
        catalog.species_for_ecosystem(&self.selected_ecosystem)
    }

    pub fn validate(&self) -> FieldErrors {
        validate(
            &self.query,
            self.analysis_type,
            &self.selected_ecosystem,
            &self.selected_species,
        )
    }

    /// Validate and build the query. On failure the errors are stored on the form.
    pub fn submit(&mut self) -> Result<AnalysisQuery, FieldErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(errors);
        }
        self.errors.clear();

        let target = match self.analysis_type {
            AnalysisType::Ecosystem => AnalysisTarget::Ecosystem(self.selected_ecosystem.clone()),
            AnalysisType::Species => AnalysisTarget::Species(self.selected_species.clone()),
        };
        AnalysisQuery::new(&self.query, target).map_err(|e| {
            let (field, message) = match e {
                QueryError::EmptyQuery => (Field::Query, QUERY_REQUIRED_MSG),
                QueryError::EmptyTarget(AnalysisType::Ecosystem) => {
                    (Field::Ecosystem, ECOSYSTEM_REQUIRED_MSG)
                }
                QueryError::EmptyTarget(AnalysisType::Species) => (Field::Species, SPECIES_REQUIRED_MSG),
            };
            self.errors.insert(field, message);
            self.errors.clone()
        })
    }

    /// Clear text, selections and errors. The analysis type is kept.
    pub fn reset(&mut self) {
        self.query.clear();
        self.selected_ecosystem.clear();
        self.selected_species.clear();
        self.errors.clear();
    }
}
