//! Scoring constants
//!
//! Penalty and bonus magnitudes are empirically chosen and deliberately kept
//! as named constants; their exact values affect score magnitude only, not
//! pipeline correctness.

/// Ordinal grade table shared by the body (nutrition grade) and planet (eco
/// grade) pillars: best grade seeds the full pillar, worst the minimum.
pub const GRADE_POINTS: &[(&str, f64)] = &[
    ("a", 25.0),
    ("b", 20.0),
    ("c", 15.0),
    ("d", 10.0),
    ("e", 5.0),
];

/// Seed used when no grade is available
pub const MISSING_GRADE_BASELINE: f64 = 12.0;

// Body pillar
pub const NOVA_MINIMAL_BONUS: f64 = 3.0;
pub const NOVA_PROCESSED_PENALTY: f64 = 3.0;
pub const NOVA_ULTRA_PROCESSED_PENALTY: f64 = 8.0;
pub const RISK_TAG_PENALTY_EACH: f64 = 2.0;
pub const RISK_TAG_PENALTY_CAP: f64 = 10.0;
pub const ALLERGEN_PENALTY_EACH: f64 = 1.0;
pub const ALLERGEN_PENALTY_CAP: f64 = 5.0;
pub const IRRITANT_PENALTY: f64 = 5.0;

// Planet pillar
pub const PALM_OIL_PENALTY: f64 = 8.0;
pub const PACKAGING_FULL_RECYCLABLE_BONUS: f64 = 5.0;
pub const PACKAGING_PARTIAL_RECYCLABLE_BONUS: f64 = 2.0;

// Care pillar
pub const CARE_BASELINE: f64 = 10.0;
pub const BOYCOTT_BRAND_PENALTY: f64 = 30.0;

// Open pillar
pub const OPEN_START: f64 = 25.0;
pub const HIDDEN_INGREDIENTS_MANY_PENALTY: f64 = 15.0;
pub const HIDDEN_INGREDIENTS_FEW_PENALTY: f64 = 8.0;
pub const OPEN_NO_INGREDIENTS_FLOOR: f64 = 2.0;
pub const NO_ORIGIN_PENALTY: f64 = 5.0;

// Sufficiency gate
pub const SUFFICIENCY_MIN_QUALITY: f64 = 50.0;
pub const SUFFICIENCY_MIN_COMPLETION: f64 = 50.0;

/// Source whose records are eligible for scoring outright
pub const CANONICAL_SOURCE: &str = "openfoodfacts";

/// Additive tags flagged as high-risk
pub const HIGH_RISK_ADDITIVES: &[&str] = &[
    "e102", "e104", "e110", "e122", "e124", "e129", "e150d", "e171", "e211",
    "e249", "e250", "e251", "e320", "e321", "e621", "e951",
];

/// Ingredient-analysis tags that carry a risk marker
pub const RISK_ANALYSIS_MARKERS: &[&str] = &["high-risk", "risky", "to-avoid"];

/// Irritant substrings searched in ingredient text
pub const IRRITANT_SUBSTRINGS: &[&str] = &[
    "monosodium glutamate",
    "sodium lauryl sulfate",
    "sodium laureth sulfate",
    "sulphite",
    "sulfite",
];

/// "Hidden ingredient" phrases: non-specific wording that conceals actual
/// composition
pub const HIDDEN_INGREDIENT_PHRASES: &[&str] = &[
    "natural flavour",
    "natural flavor",
    "artificial flavour",
    "artificial flavor",
    "fragrance",
    "parfum",
    "spices",
    "proprietary blend",
];

/// Placeholder strings some providers emit instead of a real ingredient list
pub const PLACEHOLDER_INGREDIENT_TEXTS: &[&str] = &["n/a", "none", "unknown", "not available"];

/// Recognized ethical/welfare certification tags and their care-pillar bonus
pub const CARE_CERT_BONUSES: &[(&str, f64)] = &[
    ("fairtrade", 4.0),
    ("organic", 3.0),
    ("rainforest-alliance", 3.0),
    ("msc", 3.0),
    ("asc", 3.0),
    ("animal-welfare", 3.0),
    ("vegan", 2.0),
    ("cruelty-free", 2.0),
];

/// Brands associated with known ethical controversies (lowercase match)
pub const CONTROVERSIAL_BRANDS: &[&str] = &[
    "nestle",
    "nestlé",
    "mondelez",
    "danone international",
    "ferrero industrial",
];
