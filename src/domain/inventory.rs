use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Kind of stocked input material.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaterialType {
    #[sea_orm(string_value = "profile")]
    Profile,
    #[sea_orm(string_value = "glass")]
    Glass,
    #[sea_orm(string_value = "hardware")]
    Hardware,
    #[sea_orm(string_value = "seal")]
    Seal,
    #[sea_orm(string_value = "other")]
    Other,
}

impl<'de> Deserialize<'de> for MaterialType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        super::deserialize_alias(deserializer, Self::resolve_alias, "material type")
    }
}

impl MaterialType {
    /// Accepts the legacy catalogue names (`profil`, `szyba`, `okucie`,
    /// `uszczelka`, `inne`) found in imported data.
    pub fn resolve_alias(value: &str) -> Option<Self> {
        let kind = match value.trim().to_ascii_lowercase().as_str() {
            "profile" | "profil" => Self::Profile,
            "glass" | "szyba" => Self::Glass,
            "hardware" | "okucie" => Self::Hardware,
            "seal" | "uszczelka" => Self::Seal,
            "other" | "inne" => Self::Other,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementDirection {
    #[sea_orm(string_value = "in")]
    In,
    #[sea_orm(string_value = "out")]
    Out,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_material_names_resolve() {
        assert_eq!(MaterialType::resolve_alias("profil"), Some(MaterialType::Profile));
        assert_eq!(MaterialType::resolve_alias("SZYBA"), Some(MaterialType::Glass));
        assert_eq!(MaterialType::resolve_alias("okucie"), Some(MaterialType::Hardware));
        assert_eq!(MaterialType::resolve_alias("uszczelka"), Some(MaterialType::Seal));
        assert_eq!(MaterialType::resolve_alias("inne"), Some(MaterialType::Other));
        assert_eq!(MaterialType::resolve_alias("wood"), None);
    }

    #[test]
    fn imported_material_types_are_stored_canonically() {
        let parsed: MaterialType = serde_json::from_str("\"szyba\"").unwrap();
        assert_eq!(parsed, MaterialType::Glass);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"glass\"");
        assert!(serde_json::from_str::<MaterialType>("\"wood\"").is_err());
    }
}
