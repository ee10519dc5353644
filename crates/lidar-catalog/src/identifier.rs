//! Partition name and year inference from archive folder identifiers.
//!
//! Archive folders are named like `IA_FullState`, `USGS_LPC_IA_Central_2019`
//! or `TX_Central_B1_2017_LAS_2019`. Several folders can be variants (years,
//! republications) of one logical partition, so each identifier is split into
//! a logical name and a year:
//!
//! - if a `LAS` token is preceded by an all-digit token, the year is the third
//!   to last and the last token joined by `-`, and the name is everything
//!   before the trailing three tokens;
//! - otherwise the year is the last token and the name is everything before it.

use crate::{CatalogError, Result};

const TOKEN_SEPARATOR: char = '_';
const LAS_TOKEN: &str = "LAS";

/// Logical partition name and year derived from one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    /// Logical partition name shared by all variants.
    pub name: String,
    /// Year (or `start-end` span) distinguishing the variant.
    pub year: String,
}

/// Strip whitespace and the trailing `/` that folder listings carry.
pub fn normalize_identifier(identifier: &str) -> &str {
    identifier.trim().trim_end_matches('/')
}

/// Split an identifier into its logical partition name and year.
pub fn infer_partition_key(identifier: &str) -> Result<PartitionKey> {
    let identifier = normalize_identifier(identifier);
    let tokens: Vec<&str> = identifier.split(TOKEN_SEPARATOR).collect();
    let n = tokens.len();

    let las_after_number = tokens
        .iter()
        .position(|t| *t == LAS_TOKEN)
        .is_some_and(|i| i > 0 && is_numeric(tokens[i - 1]));

    let (name_tokens, year) = if las_after_number {
        if n < 4 {
            return Err(CatalogError::InvalidIdentifier(identifier.to_string()));
        }
        (&tokens[..n - 3], format!("{}-{}", tokens[n - 3], tokens[n - 1]))
    } else {
        if n < 2 {
            return Err(CatalogError::InvalidIdentifier(identifier.to_string()));
        }
        (&tokens[..n - 1], tokens[n - 1].to_string())
    };

    let name = name_tokens.join("_");
    if name.is_empty() || year.is_empty() {
        return Err(CatalogError::InvalidIdentifier(identifier.to_string()));
    }

    Ok(PartitionKey { name, year })
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}
