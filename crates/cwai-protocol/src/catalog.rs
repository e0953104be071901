//! Bundled ecosystem and species catalogs that feed the analysis form.

use serde::{Deserialize, Serialize};

use crate::types::ThreatLevel;

/// A selectable ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcosystemOption {
    pub id: String,
    pub label: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A selectable species, scoped to exactly one ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesOption {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub ecosystem_id: String,
    pub threat_level: ThreatLevel,
}

/// Immutable set of form options, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub ecosystems: Vec<EcosystemOption>,
    pub species: Vec<SpeciesOption>,
}

impl Catalog {
    pub fn new(ecosystems: Vec<EcosystemOption>, species: Vec<SpeciesOption>) -> Self {
        Self { ecosystems, species }
    }

    /// The catalog shipped with the dashboard.
    pub fn builtin() -> Self {
        let ecosystems = [
            (
                "arctic-terrestrial",
                "Arctic Terrestrial Systems",
                "🏔️",
                "Tundra, permafrost, and cold-adapted ecosystems",
            ),
            (
                "tropical-rainforest",
                "Tropical Rainforests",
                "🌴",
                "High biodiversity forest ecosystems",
            ),
            (
                "marine-coastal",
                "Marine & Coastal",
                "🌊",
                "Ocean, coral reefs, and coastal environments",
            ),
            (
                "grasslands",
                "Grasslands & Savannas",
                "🌾",
                "Open grassland and savanna ecosystems",
            ),
            (
                "freshwater",
                "Freshwater Systems",
                "🏞️",
                "Rivers, lakes, and wetland environments",
            ),
        ]
        .into_iter()
        .map(|(id, label, icon, description)| EcosystemOption {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            description: Some(description.to_string()),
        })
        .collect();

        let species = [
            ("polar-bear", "Polar Bear", "🐻‍❄️", "arctic-terrestrial", ThreatLevel::Critical),
            ("arctic-fox", "Arctic Fox", "🦊", "arctic-terrestrial", ThreatLevel::High),
            ("jaguar", "Jaguar", "🐆", "tropical-rainforest", ThreatLevel::Medium),
        ]
        .into_iter()
        .map(|(id, label, icon, ecosystem_id, threat_level)| SpeciesOption {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            ecosystem_id: ecosystem_id.to_string(),
            threat_level,
        })
        .collect();

        Self { ecosystems, species }
    }

    pub fn ecosystem(&self, id: &str) -> Option<&EcosystemOption> {
        self.ecosystems.iter().find(|e| e.id == id)
    }

    pub fn species_by_id(&self, id: &str) -> Option<&SpeciesOption> {
        self.species.iter().find(|s| s.id == id)
    }

    /// Species belonging to the given ecosystem, in catalog order.
    pub fn species_for_ecosystem(&self, ecosystem_id: &str) -> Vec<&SpeciesOption> {
        self.species
            .iter()
            .filter(|s| s.ecosystem_id == ecosystem_id)
            .collect()
    }

    /// Look an ecosystem up by id, falling back to a 1-based position in the list.
    pub fn find_ecosystem(&self, key: &str) -> Option<&EcosystemOption> {
        let key = key.trim();
        self.ecosystem(key).or_else(|| {
            key.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| self.ecosystems.get(i))
        })
    }
}
