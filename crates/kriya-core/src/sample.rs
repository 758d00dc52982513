//! Built-in demo catalog served when no tenant resolves or no database is
//! configured.

use rust_decimal::Decimal;

use crate::catalog::{CatalogCategory, CatalogProduct, ProductVariant, SocialLinks, StoreConfig};
use crate::store::Theme;

#[must_use]
pub fn sample_store_config() -> StoreConfig {
    StoreConfig {
        name: "KRIYA".to_string(),
        tagline: "Curated for the culture".to_string(),
        theme: Theme::Neon,
        logo: None,
        currency: "USD".to_string(),
        currency_symbol: "$".to_string(),
        announcement: Some("🔥 FREE SHIPPING ON ORDERS OVER $50".to_string()),
        social_links: SocialLinks {
            instagram: Some("https://instagram.com".to_string()),
            twitter: Some("https://twitter.com".to_string()),
            tiktok: Some("https://tiktok.com".to_string()),
        },
    }
}

/// Store config used for a tenant-less request when a demo sheet has no
/// `Config` tab values.
#[must_use]
pub fn default_sheet_store_config() -> StoreConfig {
    StoreConfig {
        name: "My Store".to_string(),
        tagline: "Welcome to our store".to_string(),
        theme: Theme::Neon,
        logo: None,
        currency: "USD".to_string(),
        currency_symbol: "$".to_string(),
        announcement: None,
        social_links: SocialLinks::default(),
    }
}

fn unsplash(photo: &str, w: u32, h: u32) -> String {
    format!("https://images.unsplash.com/photo-{photo}?w={w}&h={h}&fit=crop")
}

#[must_use]
pub fn sample_categories() -> Vec<CatalogCategory> {
    [
        ("1", "Apparel", "apparel", "1523381210434-271e8be1f52b"),
        ("2", "Accessories", "accessories", "1606107557195-0e29a4b5b4aa"),
        ("3", "Tech", "tech", "1505740420928-5e560c06d30e"),
        ("4", "Home", "home", "1616486338812-3dadae4b4ace"),
    ]
    .into_iter()
    .map(|(id, name, slug, photo)| CatalogCategory {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        image: Some(unsplash(photo, 400, 400)),
    })
    .collect()
}

fn variant(id: &str, name: &str, options: &[&str]) -> ProductVariant {
    ProductVariant {
        id: id.to_string(),
        name: name.to_string(),
        options: options.iter().map(ToString::to_string).collect(),
        price_modifier: None,
    }
}

struct SampleProduct<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    price: i64,
    compare_at: Option<i64>,
    photos: &'a [&'a str],
    category: &'a str,
    tags: &'a [&'a str],
    in_stock: bool,
    variants: Vec<ProductVariant>,
}

impl From<SampleProduct<'_>> for CatalogProduct {
    fn from(p: SampleProduct<'_>) -> Self {
        CatalogProduct {
            id: p.id.to_string(),
            name: p.name.to_string(),
            description: p.description.to_string(),
            price: Decimal::from(p.price),
            compare_at_price: p.compare_at.map(Decimal::from),
            images: p.photos.iter().map(|ph| unsplash(ph, 600, 800)).collect(),
            category: p.category.to_string(),
            tags: p.tags.iter().map(ToString::to_string).collect(),
            in_stock: p.in_stock,
            variants: p.variants,
        }
    }
}

#[must_use]
#[allow(clippy::too_many_lines)]
pub fn sample_products() -> Vec<CatalogProduct> {
    vec![
        SampleProduct {
            id: "1",
            name: "Oversized Graphic Tee",
            description: "Premium cotton oversized tee with exclusive print. Made for comfort and style.",
            price: 45,
            compare_at: Some(60),
            photos: &["1521572163474-6864f9cf17ab", "1583743814966-8936f5b7be1a"],
            category: "apparel",
            tags: &["new", "bestseller"],
            in_stock: true,
            variants: vec![
                variant("size", "Size", &["S", "M", "L", "XL"]),
                variant("color", "Color", &["Black", "White", "Sage"]),
            ],
        },
        SampleProduct {
            id: "2",
            name: "Retro Sneakers",
            description: "Y2K-inspired chunky sneakers. The perfect blend of comfort and street style.",
            price: 129,
            compare_at: None,
            photos: &["1606107557195-0e29a4b5b4aa", "1595950653106-6c9ebd614d3a"],
            category: "accessories",
            tags: &["trending"],
            in_stock: true,
            variants: vec![variant("size", "Size", &["7", "8", "9", "10", "11", "12"])],
        },
        SampleProduct {
            id: "3",
            name: "Minimal Watch",
            description: "Clean design meets precision. Japanese movement with genuine leather strap.",
            price: 189,
            compare_at: Some(220),
            photos: &["1523275335684-37898b6baf30"],
            category: "accessories",
            tags: &["premium"],
            in_stock: true,
            variants: vec![],
        },
        SampleProduct {
            id: "4",
            name: "Wireless Earbuds Pro",
            description: "Immersive sound. Active noise cancellation. 24hr battery life.",
            price: 149,
            compare_at: None,
            photos: &["1590658268037-6bf12165a8df"],
            category: "tech",
            tags: &["bestseller"],
            in_stock: true,
            variants: vec![],
        },
        SampleProduct {
            id: "5",
            name: "Ceramic Vase Set",
            description: "Handcrafted ceramic vases. Set of 3 with unique organic shapes.",
            price: 78,
            compare_at: None,
            photos: &["1612196808214-b8e1d6145a8c"],
            category: "home",
            tags: &["new"],
            in_stock: true,
            variants: vec![],
        },
        SampleProduct {
            id: "6",
            name: "Cargo Pants",
            description: "Utilitarian vibes. Multiple pockets. Relaxed fit for all-day comfort.",
            price: 89,
            compare_at: None,
            photos: &["1624378439575-d8705ad7ae80"],
            category: "apparel",
            tags: &["trending"],
            in_stock: true,
            variants: vec![
                variant("size", "Size", &["28", "30", "32", "34", "36"]),
                variant("color", "Color", &["Black", "Khaki", "Olive"]),
            ],
        },
        SampleProduct {
            id: "7",
            name: "LED Desk Lamp",
            description: "Ambient lighting for your space. Touch control with color temperature adjustment.",
            price: 65,
            compare_at: None,
            photos: &["1507473885765-e6ed057f782c"],
            category: "home",
            tags: &[],
            in_stock: true,
            variants: vec![],
        },
        SampleProduct {
            id: "8",
            name: "Canvas Tote Bag",
            description: "Heavy-duty canvas tote. Perfect for everyday carry.",
            price: 35,
            compare_at: None,
            photos: &["1544816155-12df9643f363"],
            category: "accessories",
            tags: &["bestseller"],
            in_stock: false,
            variants: vec![],
        },
    ]
    .into_iter()
    .map(CatalogProduct::from)
    .collect()
}
