//! Canonical keys for ingredient/unit matching.
//!
//! Mapping creation and resolution both go through [`MappingKey::new`], so a name
//! typed `"Whipped_Cream "` at setup and `"whipped cream"` on a recipe can never
//! resolve to different stock items.

use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, ValueObject};

/// Lower-case, treat underscores as spaces, collapse runs of whitespace.
pub fn canonical_ingredient(name: &str) -> String {
    name.to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical ingredient normalisation plus folding of common unit aliases.
pub fn canonical_unit(unit: &str) -> String {
    let normalized = canonical_ingredient(unit);
    let folded = match normalized.as_str() {
        "piece" | "pieces" | "pc" | "pcs" => "pieces",
        "serving" | "servings" => "serving",
        "portion" | "portions" => "portion",
        "scoop" | "scoops" => "scoop",
        "box" | "boxes" => "box",
        "pack" | "packs" => "pack",
        "kg" | "kilogram" | "kilograms" => "kg",
        "g" | "gram" | "grams" => "g",
        "l" | "liter" | "liters" | "litre" | "litres" => "liters",
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => "ml",
        _ => return normalized,
    };
    folded.to_string()
}

/// Canonical `(ingredient, unit)` pair; the uniqueness key for active mappings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MappingKey {
    ingredient: String,
    unit: String,
}

impl ValueObject for MappingKey {}

impl MappingKey {
    pub fn new(ingredient: &str, unit: &str) -> DomainResult<Self> {
        let ingredient = canonical_ingredient(ingredient);
        let unit = canonical_unit(unit);
        if ingredient.is_empty() {
            return Err(DomainError::validation("ingredient name cannot be empty"));
        }
        if unit.is_empty() {
            return Err(DomainError::validation("unit cannot be empty"));
        }
        Ok(Self { ingredient, unit })
    }

    pub fn ingredient(&self) -> &str {
        &self.ingredient
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl core::fmt::Display for MappingKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.ingredient, self.unit)
    }
}
