//! Spreadsheet row schema.
//!
//! Fixed column order, header row excluded by the fetched range:
//!
//! | Tab          | Range   | Columns                                                                 |
//! |--------------|---------|-------------------------------------------------------------------------|
//! | `Categories` | `A2:D`  | id, name, slug?, image url?                                             |
//! | `Products`   | `A2:I`  | id, name, description?, price, compare-at?, images, category slug, tags, in stock |
//! | `Config`     | `A2:B`  | key, value                                                              |

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use kriya_core::catalog::UNCATEGORIZED;
use kriya_core::sample::default_sheet_store_config;
use kriya_core::{slugify, SocialLinks, StoreConfig, Theme};
use rust_decimal::Decimal;

pub const CATEGORIES_RANGE: &str = "Categories!A2:D";
pub const PRODUCTS_RANGE: &str = "Products!A2:I";
pub const CONFIG_RANGE: &str = "Config!A2:B";

/// First data row number in the sheet; used to point log lines at the row a
/// human would look at.
const FIRST_DATA_ROW: usize = 2;

/// Outcome of parsing one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowParse<T> {
    Parsed(T),
    /// Row is incomplete or a duplicate; ignored without being an error.
    Skipped(String),
    /// Row carries a value that violates a catalog rule.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub external_id: String,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub external_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub images: Vec<String>,
    /// Category slug as written in the sheet, [`UNCATEGORIZED`] when blank.
    pub category_slug: String,
    pub tags: Vec<String>,
    pub in_stock: bool,
}

/// One sheet tab after parsing: kept records in row order plus the rows that
/// were dropped, keyed by sheet row number.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet<T> {
    pub records: Vec<T>,
    pub skipped: Vec<(usize, String)>,
    pub malformed: Vec<(usize, String)>,
}

impl<T> Default for ParsedSheet<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
            malformed: Vec::new(),
        }
    }
}

impl<T> ParsedSheet<T> {
    fn push(&mut self, row_number: usize, parsed: RowParse<T>) {
        match parsed {
            RowParse::Parsed(record) => self.records.push(record),
            RowParse::Skipped(reason) => self.skipped.push((row_number, reason)),
            RowParse::Malformed(reason) => self.malformed.push((row_number, reason)),
        }
    }
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parses a money cell. Thousands separators and a leading `$` are ignored.
fn parse_money(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    Decimal::from_str(cleaned.trim()).ok().map(|d| d.round_dp(2))
}

/// Parses one `Categories` row.
#[must_use]
pub fn parse_category_row(row: &[String]) -> RowParse<CategoryRecord> {
    let (Some(external_id), Some(name)) = (cell(row, 0), cell(row, 1)) else {
        return RowParse::Skipped("missing id or name".to_string());
    };

    let slug = cell(row, 2).map_or_else(|| slugify(name), ToString::to_string);
    if slug.is_empty() {
        return RowParse::Skipped(format!("category '{name}' has no usable slug"));
    }

    RowParse::Parsed(CategoryRecord {
        external_id: external_id.to_string(),
        name: name.to_string(),
        slug,
        image_url: cell(row, 3).map(ToString::to_string),
    })
}

/// Parses one `Products` row.
///
/// An unparseable price becomes `0`; an unparseable compare-at price is
/// dropped. A negative price is malformed.
#[must_use]
pub fn parse_product_row(row: &[String]) -> RowParse<ProductRecord> {
    let (Some(external_id), Some(name)) = (cell(row, 0), cell(row, 1)) else {
        return RowParse::Skipped("missing id or name".to_string());
    };

    let price = cell(row, 3).and_then(parse_money).unwrap_or(Decimal::ZERO);
    if price.is_sign_negative() && !price.is_zero() {
        return RowParse::Malformed(format!("product '{external_id}' has negative price {price}"));
    }

    let compare_at_price = cell(row, 4)
        .and_then(parse_money)
        .filter(|p| !p.is_sign_negative());

    let tags = split_list(cell(row, 7))
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();

    let in_stock = cell(row, 8).is_none_or(|v| !v.eq_ignore_ascii_case("false"));

    RowParse::Parsed(ProductRecord {
        external_id: external_id.to_string(),
        name: name.to_string(),
        slug: slugify(name),
        description: cell(row, 2).map(ToString::to_string),
        price,
        compare_at_price,
        images: split_list(cell(row, 5)),
        category_slug: cell(row, 6).unwrap_or(UNCATEGORIZED).to_string(),
        tags,
        in_stock,
    })
}

/// Parses the `Categories` tab. Later rows reusing a slug are skipped.
#[must_use]
pub fn parse_categories(rows: &[Vec<String>]) -> ParsedSheet<CategoryRecord> {
    let mut sheet = ParsedSheet::default();
    let mut seen_slugs = HashSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + FIRST_DATA_ROW;
        let parsed = match parse_category_row(row) {
            RowParse::Parsed(record) if !seen_slugs.insert(record.slug.clone()) => {
                RowParse::Skipped(format!("duplicate category slug '{}'", record.slug))
            }
            other => other,
        };
        sheet.push(row_number, parsed);
    }

    sheet
}

/// Parses the `Products` tab. Later rows reusing an external id are skipped.
#[must_use]
pub fn parse_products(rows: &[Vec<String>]) -> ParsedSheet<ProductRecord> {
    let mut sheet = ParsedSheet::default();
    let mut seen_ids = HashSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + FIRST_DATA_ROW;
        let parsed = match parse_product_row(row) {
            RowParse::Parsed(record) if !seen_ids.insert(record.external_id.clone()) => {
                RowParse::Skipped(format!("duplicate product id '{}'", record.external_id))
            }
            other => other,
        };
        sheet.push(row_number, parsed);
    }

    sheet
}

/// Builds a storefront config from `Config` key/value rows. Unknown keys are
/// ignored, missing keys take defaults, an unknown theme falls back to neon.
#[must_use]
pub fn parse_store_config(rows: &[Vec<String>]) -> StoreConfig {
    let values: HashMap<&str, &str> = rows
        .iter()
        .filter_map(|row| Some((cell(row, 0)?, cell(row, 1)?)))
        .collect();
    let get = |key: &str| values.get(key).map(|v| (*v).to_string());

    let defaults = default_sheet_store_config();
    StoreConfig {
        name: get("name").unwrap_or(defaults.name),
        tagline: get("tagline").unwrap_or(defaults.tagline),
        theme: values
            .get("theme")
            .and_then(|t| t.parse::<Theme>().ok())
            .unwrap_or(defaults.theme),
        logo: get("logo"),
        currency: get("currency").unwrap_or(defaults.currency),
        currency_symbol: get("currencySymbol").unwrap_or(defaults.currency_symbol),
        announcement: get("announcement"),
        social_links: SocialLinks {
            instagram: get("instagram"),
            twitter: get("twitter"),
            tiktok: get("tiktok"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn category_without_name_is_skipped() {
        assert!(matches!(
            parse_category_row(&row(&["C1"])),
            RowParse::Skipped(_)
        ));
        assert!(matches!(
            parse_category_row(&row(&["C1", "   "])),
            RowParse::Skipped(_)
        ));
    }

    #[test]
    fn category_slug_defaults_to_slugified_name() {
        let RowParse::Parsed(cat) = parse_category_row(&row(&["C1", "Home & Living"])) else {
            panic!("expected parsed row");
        };
        assert_eq!(cat.slug, "home-living");
        assert_eq!(cat.image_url, None);
    }

    #[test]
    fn explicit_category_slug_is_kept() {
        let RowParse::Parsed(cat) =
            parse_category_row(&row(&["C1", "Apparel", " clothes ", "https://img/1.jpg"]))
        else {
            panic!("expected parsed row");
        };
        assert_eq!(cat.slug, "clothes");
        assert_eq!(cat.image_url.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn duplicate_category_slug_is_skipped() {
        let sheet = parse_categories(&[
            row(&["C1", "Apparel"]),
            row(&["C2", "apparel"]),
            row(&["C3"]),
        ]);
        assert_eq!(sheet.records.len(), 1);
        assert_eq!(sheet.skipped.len(), 2);
        assert_eq!(sheet.skipped[0].0, 3);
        assert!(sheet.skipped[0].1.contains("duplicate"));
    }

    #[test]
    fn unparseable_price_becomes_zero() {
        let RowParse::Parsed(p) = parse_product_row(&row(&["P1", "Tee", "", "abc"])) else {
            panic!("expected parsed row");
        };
        assert_eq!(p.price, Decimal::ZERO);
        assert_eq!(p.compare_at_price, None);
    }

    #[test]
    fn price_with_separators_is_parsed() {
        let RowParse::Parsed(p) =
            parse_product_row(&row(&["P1", "Sofa", "", "$1,299.5", "not-a-number"]))
        else {
            panic!("expected parsed row");
        };
        assert_eq!(p.price, Decimal::new(129_950, 2));
        assert_eq!(p.compare_at_price, None);
    }

    #[test]
    fn negative_price_is_malformed() {
        assert!(matches!(
            parse_product_row(&row(&["P1", "Tee", "", "-5"])),
            RowParse::Malformed(_)
        ));
    }

    #[test]
    fn product_lists_and_stock_flag() {
        let RowParse::Parsed(p) = parse_product_row(&row(&[
            "P1",
            "Graphic Tee",
            "Soft cotton",
            "45",
            "60",
            "https://a.jpg, https://b.jpg,",
            "",
            "New, BestSeller ,",
            "FALSE",
        ])) else {
            panic!("expected parsed row");
        };
        assert_eq!(p.images, vec!["https://a.jpg", "https://b.jpg"]);
        assert_eq!(p.tags, vec!["new", "bestseller"]);
        assert_eq!(p.category_slug, UNCATEGORIZED);
        assert!(!p.in_stock);
        assert_eq!(p.slug, "graphic-tee");
        assert_eq!(p.compare_at_price, Some(Decimal::from(60)));
    }

    #[test]
    fn missing_stock_cell_means_in_stock() {
        let RowParse::Parsed(p) = parse_product_row(&row(&["P1", "Tee", "", "10"])) else {
            panic!("expected parsed row");
        };
        assert!(p.in_stock);
    }

    #[test]
    fn duplicate_product_id_is_skipped() {
        let sheet = parse_products(&[
            row(&["P1", "Tee", "", "10"]),
            row(&["P1", "Tee again", "", "12"]),
            row(&["P2", "Hat", "", "-1"]),
        ]);
        assert_eq!(sheet.records.len(), 1);
        assert_eq!(sheet.skipped, vec![(3, "duplicate product id 'P1'".to_string())]);
        assert_eq!(sheet.malformed.len(), 1);
        assert_eq!(sheet.malformed[0].0, 4);
    }

    #[test]
    fn store_config_applies_defaults() {
        let config = parse_store_config(&[
            row(&["name", "Acme Goods"]),
            row(&["theme", "Brutal"]),
            row(&["currencySymbol", "€"]),
            row(&["instagram", "https://instagram.com/acme"]),
            row(&["orphan"]),
        ]);
        assert_eq!(config.name, "Acme Goods");
        assert_eq!(config.tagline, "Welcome to our store");
        assert_eq!(config.theme, Theme::Brutal);
        assert_eq!(config.currency, "USD");
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(
            config.social_links.instagram.as_deref(),
            Some("https://instagram.com/acme")
        );
        assert_eq!(config.announcement, None);
    }

    #[test]
    fn unknown_theme_falls_back_to_neon() {
        let config = parse_store_config(&[row(&["theme", "vaporwave"])]);
        assert_eq!(config.theme, Theme::Neon);
    }
}
