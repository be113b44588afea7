//! Catalog entity kinds known to the sync engine.

use std::convert::Infallible;
use std::str::FromStr;

/// A kind of catalog entity, named after its source table.
///
/// Only [`EntityType::Goods`] has a search projection today. The other catalog
/// tables are listed so that routing them is an exhaustive match rather than a
/// string comparison; adding a projection for one of them is a compile-visible change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Goods,
    Brands,
    Category,
    CategoryBrand,
    Banner,
    /// A table the engine does not know about.
    Unsupported(String),
}

impl EntityType {
    /// Resolve a source table name.
    pub fn from_table(table: &str) -> Self {
        match table {
            "goods" => EntityType::Goods,
            "brands" => EntityType::Brands,
            "category" => EntityType::Category,
            "category_brand" => EntityType::CategoryBrand,
            "banner" => EntityType::Banner,
            other => EntityType::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Goods => "goods",
            EntityType::Brands => "brands",
            EntityType::Category => "category",
            EntityType::CategoryBrand => "category_brand",
            EntityType::Banner => "banner",
            EntityType::Unsupported(table) => table.as_str(),
        }
    }
}

impl FromStr for EntityType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_table(s))
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table() {
        assert_eq!(EntityType::from_table("goods"), EntityType::Goods);
        assert_eq!(EntityType::from_table("category_brand"), EntityType::CategoryBrand);
        assert_eq!(
            EntityType::from_table("orders"),
            EntityType::Unsupported("orders".to_string())
        );
    }

    #[test]
    fn test_round_trips_table_name() {
        for table in ["goods", "brands", "category", "category_brand", "banner", "users"] {
            let entity: EntityType = table.parse().unwrap();
            assert_eq!(entity.as_str(), table);
        }
    }
}
