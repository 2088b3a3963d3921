//! Material database - cutting force and recommended ranges per workpiece material
//!
//! The engine never loads materials itself; it asks a [`MaterialLookup`]. The
//! built-in [`MaterialCatalog`] carries the standard shop materials.

use super::{CalculationError, Result};
use crate::units::sfm_to_smm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Material category for grouping and per-family multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialCategory {
    Aluminum,
    Steel,
    Stainless,
    Titanium,
    CastIron,
    Brass,
    Copper,
    Plastic,
    Other,
}

impl MaterialCategory {
    /// Carbon/alloy steels and stainless
    pub fn is_steel_family(self) -> bool {
        matches!(self, MaterialCategory::Steel | MaterialCategory::Stainless)
    }
}

impl std::fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialCategory::Aluminum => write!(f, "Aluminum"),
            MaterialCategory::Steel => write!(f, "Steel"),
            MaterialCategory::Stainless => write!(f, "Stainless"),
            MaterialCategory::Titanium => write!(f, "Titanium"),
            MaterialCategory::CastIron => write!(f, "Cast Iron"),
            MaterialCategory::Brass => write!(f, "Brass"),
            MaterialCategory::Copper => write!(f, "Copper"),
            MaterialCategory::Plastic => write!(f, "Plastic"),
            MaterialCategory::Other => write!(f, "Other"),
        }
    }
}

/// Tool coating, used to derive the surface speed multiplier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum Coating {
    #[serde(rename = "uncoated", alias = "none", alias = "UNCOATED")]
    #[default]
    Uncoated,
    #[serde(rename = "TiN", alias = "tin", alias = "TIN")]
    TiN,
    #[serde(rename = "TiCN", alias = "ticn", alias = "TICN")]
    TiCN,
    #[serde(rename = "TiAlN", alias = "tialn", alias = "TIALN")]
    TiAlN,
    #[serde(rename = "AlCrN", alias = "alcrn", alias = "ALCRN")]
    AlCrN,
    #[serde(rename = "diamond", alias = "DIAMOND")]
    Diamond,
}

impl Coating {
    /// Surface speed multiplier relative to an uncoated tool
    pub fn speed_multiplier(self) -> f64 {
        match self {
            Coating::Uncoated => 1.0,
            Coating::TiN => 1.2,
            Coating::TiCN => 1.3,
            Coating::TiAlN => 1.4,
            Coating::AlCrN => 1.5,
            Coating::Diamond => 2.0,
        }
    }
}

/// Workpiece material data consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub name: String,
    pub category: MaterialCategory,
    /// Specific cutting force Kc (N/mm²)
    pub kc: f64,
    /// Recommended surface speed (min, max) in m/min
    pub surface_speed_range: (f64, f64),
    /// Recommended chip load (min, max) in mm/tooth
    pub chip_load_range: (f64, f64),
    /// Surface speed multiplier for the tool coating in use
    pub coating_multiplier: f64,
}

impl MaterialProperties {
    /// Same material, cut with a coated tool
    pub fn with_coating(mut self, coating: Coating) -> Self {
        self.coating_multiplier = coating.speed_multiplier();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.kc > 0.0 && self.kc.is_finite()) {
            return Err(CalculationError::domain("kc", self.kc, "must be > 0"));
        }
        if !(self.coating_multiplier > 0.0 && self.coating_multiplier.is_finite()) {
            return Err(CalculationError::domain(
                "coating_multiplier",
                self.coating_multiplier,
                "must be > 0",
            ));
        }
        check_range("surface_speed_range", self.surface_speed_range)?;
        check_range("chip_load_range", self.chip_load_range)
    }
}

fn check_range(field: &'static str, (min, max): (f64, f64)) -> Result<()> {
    if !(min >= 0.0 && max.is_finite()) {
        return Err(CalculationError::domain(field, min, "bounds must be finite and >= 0"));
    }
    if max < min {
        return Err(CalculationError::domain(field, max, "max must be >= min"));
    }
    Ok(())
}

/// Source of material data, keyed by material id
pub trait MaterialLookup {
    /// Fails with [`CalculationError::MaterialLookup`] for unknown ids
    fn lookup(&self, material_id: &str) -> Result<MaterialProperties>;
}

/// In-memory material catalog
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    materials: HashMap<String, MaterialProperties>,
}

impl MaterialCatalog {
    /// Catalog seeded with the standard materials
    pub fn new() -> Self {
        Self {
            materials: load_material_database(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, material: MaterialProperties) {
        self.materials.insert(id.into(), material);
    }

    /// Material ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.materials.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn by_category(&self, category: MaterialCategory) -> Vec<&MaterialProperties> {
        self.materials
            .values()
            .filter(|m| m.category == category)
            .collect()
    }
}

impl MaterialLookup for MaterialCatalog {
    fn lookup(&self, material_id: &str) -> Result<MaterialProperties> {
        self.materials
            .get(material_id)
            .cloned()
            .ok_or_else(|| CalculationError::MaterialLookup(material_id.to_string()))
    }
}

fn material(
    name: &str,
    category: MaterialCategory,
    kc: f64,
    sfm_range: (f64, f64),
    chip_load_range: (f64, f64),
) -> MaterialProperties {
    MaterialProperties {
        name: name.to_string(),
        category,
        kc,
        surface_speed_range: (sfm_to_smm(sfm_range.0), sfm_to_smm(sfm_range.1)),
        chip_load_range,
        coating_multiplier: 1.0,
    }
}

/// Load the standard material set
///
/// Surface speed ranges are carbide figures quoted in SFM and stored in m/min.
pub fn load_material_database() -> HashMap<String, MaterialProperties> {
    use MaterialCategory::*;

    let mut db = HashMap::new();

    db.insert(
        "aluminum_6061".to_string(),
        material("6061 Aluminum", Aluminum, 800.0, (800.0, 1500.0), (0.03, 0.15)),
    );
    db.insert(
        "steel_1018".to_string(),
        material("1018 Mild Steel", Steel, 2000.0, (100.0, 400.0), (0.02, 0.10)),
    );
    db.insert(
        "stainless_304".to_string(),
        material("304 Stainless", Stainless, 2600.0, (75.0, 350.0), (0.015, 0.08)),
    );
    db.insert(
        "cast_iron_grey".to_string(),
        material("Grey Cast Iron", CastIron, 1350.0, (120.0, 500.0), (0.03, 0.12)),
    );
    db.insert(
        "titanium_ti64".to_string(),
        material("Ti-6Al-4V", Titanium, 2550.0, (75.0, 200.0), (0.015, 0.06)),
    );
    db.insert(
        "brass_360".to_string(),
        material("360 Brass", Brass, 700.0, (600.0, 1500.0), (0.04, 0.18)),
    );
    db.insert(
        "copper_101".to_string(),
        material("101 Copper", Copper, 600.0, (400.0, 1000.0), (0.03, 0.15)),
    );

    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_standard_materials() {
        let catalog = MaterialCatalog::new();
        let ids = catalog.ids();
        assert_eq!(ids.len(), 7);
        assert!(ids.contains(&"aluminum_6061"));
        assert!(ids.contains(&"titanium_ti64"));
    }

    #[test]
    fn test_every_material_validates() {
        for (id, material) in load_material_database() {
            material
                .validate()
                .unwrap_or_else(|e| panic!("{} failed validation: {}", id, e));
        }
    }

    #[test]
    fn test_unknown_material() {
        let catalog = MaterialCatalog::new();
        assert_eq!(
            catalog.lookup("unobtainium"),
            Err(CalculationError::MaterialLookup("unobtainium".to_string()))
        );
    }

    #[test]
    fn test_empty_catalog_and_insert() {
        let mut catalog = MaterialCatalog::empty();
        assert!(catalog.lookup("aluminum_6061").is_err());

        let al = load_material_database().remove("aluminum_6061").unwrap();
        catalog.insert("al", al.clone());
        assert_eq!(catalog.lookup("al").unwrap(), al);
    }

    #[test]
    fn test_surface_speed_stored_metric() {
        let al = MaterialCatalog::new().lookup("aluminum_6061").unwrap();
        assert!((al.surface_speed_range.0 - 243.84).abs() < 1e-9);
        assert!((al.surface_speed_range.1 - 457.2).abs() < 1e-9);
    }

    #[test]
    fn test_coating_multiplier() {
        let al = MaterialCatalog::new()
            .lookup("aluminum_6061")
            .unwrap()
            .with_coating(Coating::TiAlN);
        assert_eq!(al.coating_multiplier, 1.4);
    }

    #[test]
    fn test_coating_serde_aliases() {
        let coating: Coating = serde_json::from_str(r#""tialn""#).unwrap();
        assert_eq!(coating, Coating::TiAlN);
        let coating: Coating = serde_json::from_str(r#""none""#).unwrap();
        assert_eq!(coating, Coating::Uncoated);
    }

    #[test]
    fn test_invalid_material_rejected() {
        let mut al = MaterialCatalog::new().lookup("aluminum_6061").unwrap();
        al.kc = 0.0;
        assert!(matches!(al.validate(), Err(CalculationError::Domain { field: "kc", .. })));

        let mut al = MaterialCatalog::new().lookup("aluminum_6061").unwrap();
        al.chip_load_range = (0.2, 0.1);
        assert!(al.validate().is_err());
    }

    #[test]
    fn test_steel_family() {
        assert!(MaterialCategory::Steel.is_steel_family());
        assert!(MaterialCategory::Stainless.is_steel_family());
        assert!(!MaterialCategory::CastIron.is_steel_family());
    }

    #[test]
    fn test_by_category() {
        let catalog = MaterialCatalog::new();
        let aluminum = catalog.by_category(MaterialCategory::Aluminum);
        assert_eq!(aluminum.len(), 1);
        assert_eq!(aluminum[0].name, "6061 Aluminum");
    }
}
