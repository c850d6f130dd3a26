//! Trust scoring engine
//!
//! Pure function from a fused record to a bounded composite score, its
//! four-pillar breakdown, and deterministic rationale strings. A record must
//! first pass the sufficiency gate; a record without enough real signal gets
//! no score at all rather than a fabricated number. Missing signals resolve
//! to documented neutral baselines, never to errors.

pub mod constants;

use crate::models::{PackagingRecycling, PalmOilStatus, ProductRecord, ScoreBreakdown};
use crate::providers::{source_class, SourceClass};

use constants::*;

/// Decide whether a record carries enough real signal to be scored.
///
/// Near-empty records are rejected unconditionally. Beyond that, the
/// canonical provider passes outright, web-search/unknown origins need
/// decent quality and completion plus core data, and mid-tier providers need
/// a real name plus at least one substantive field.
pub fn passes_sufficiency_gate(record: &ProductRecord) -> bool {
    let has_core_data = record.image_url.is_some()
        || !record.nutriments.is_empty()
        || record.ingredients_text.is_some();

    // Hard floor: never score near-empty data, whatever the source
    if record.quality < SUFFICIENCY_MIN_QUALITY
        && record.completion < SUFFICIENCY_MIN_COMPLETION
        && !has_core_data
    {
        return false;
    }

    if record.source == CANONICAL_SOURCE {
        return true;
    }

    match source_class(&record.source) {
        SourceClass::WebSearch | SourceClass::Unknown => {
            record.quality >= SUFFICIENCY_MIN_QUALITY
                && record.completion >= SUFFICIENCY_MIN_COMPLETION
                && has_core_data
        }
        _ => {
            !record.has_placeholder_name()
                && (has_core_data || record.brand.is_some() || record.origin.is_some())
        }
    }
}

/// Score a fused record.
///
/// Returns `None` when the record fails the sufficiency gate; otherwise the
/// composite score (0-100) and its breakdown. Each pillar is independently
/// clamped to [0, 25] so the composite needs no further clamping.
pub fn score(record: &ProductRecord) -> Option<(u8, ScoreBreakdown)> {
    if !passes_sufficiency_gate(record) {
        tracing::debug!(
            barcode = %record.barcode,
            source = %record.source,
            quality = record.quality,
            completion = record.completion,
            "Record failed sufficiency gate, not scoring"
        );
        return None;
    }

    let mut rationale = Vec::new();

    let body = body_pillar(record, &mut rationale);
    let planet = planet_pillar(record, &mut rationale);
    let care = care_pillar(record, &mut rationale);
    let open = open_pillar(record, &mut rationale);

    let composite = (body + planet + care + open).round() as u8;

    let breakdown = ScoreBreakdown {
        body,
        planet,
        care,
        open,
        nutrition_score: (body * 4.0).round() as u8,
        environment_score: (planet * 4.0).round() as u8,
        rationale,
    };

    Some((composite, breakdown))
}

fn grade_points(grade: Option<&str>) -> Option<f64> {
    let grade = grade?.to_lowercase();
    GRADE_POINTS
        .iter()
        .find(|(g, _)| *g == grade)
        .map(|(_, points)| *points)
}

fn grade_adjective(points: f64) -> &'static str {
    if points >= 20.0 {
        "excellent"
    } else if points >= 15.0 {
        "decent"
    } else if points >= 10.0 {
        "mediocre"
    } else {
        "poor"
    }
}

fn body_pillar(record: &ProductRecord, rationale: &mut Vec<String>) -> f64 {
    let mut value = match grade_points(record.nutriscore_grade.as_deref()) {
        Some(points) => {
            rationale.push(format!(
                "{} nutrition grade ({})",
                grade_adjective(points),
                record.nutriscore_grade.as_deref().unwrap_or("?")
            ));
            points
        }
        None => {
            rationale.push("no nutrition grade available".to_string());
            MISSING_GRADE_BASELINE
        }
    };

    match record.nova_group {
        Some(1) => {
            value += NOVA_MINIMAL_BONUS;
            rationale.push("minimally processed (NOVA 1)".to_string());
        }
        Some(3) => {
            value -= NOVA_PROCESSED_PENALTY;
            rationale.push("processed food (NOVA 3)".to_string());
        }
        Some(4) => {
            value -= NOVA_ULTRA_PROCESSED_PENALTY;
            rationale.push("ultra-processed food (NOVA 4)".to_string());
        }
        _ => {}
    }

    let risky_additives = record
        .additive_tags
        .iter()
        .filter(|tag| {
            let tag = tag.to_lowercase();
            HIGH_RISK_ADDITIVES.iter().any(|risk| tag == *risk)
        })
        .count();
    let risky_analysis = record
        .ingredient_analysis_tags
        .iter()
        .filter(|tag| {
            let tag = tag.to_lowercase();
            RISK_ANALYSIS_MARKERS.iter().any(|marker| tag.contains(marker))
        })
        .count();
    let risk_count = risky_additives + risky_analysis;
    if risk_count > 0 {
        value -= (risk_count as f64 * RISK_TAG_PENALTY_EACH).min(RISK_TAG_PENALTY_CAP);
        rationale.push(format!("{risk_count} high-risk additive(s) flagged"));
    }

    let allergen_count = record.allergen_tags.len();
    if allergen_count > 0 {
        value -= (allergen_count as f64 * ALLERGEN_PENALTY_EACH).min(ALLERGEN_PENALTY_CAP);
        rationale.push(format!("contains {allergen_count} declared allergen(s)"));
    }

    if let Some(ingredients) = &record.ingredients_text {
        let lower = ingredients.to_lowercase();
        if IRRITANT_SUBSTRINGS.iter().any(|i| lower.contains(i)) {
            value -= IRRITANT_PENALTY;
            rationale.push("contains known irritant ingredients".to_string());
        }
    }

    value.clamp(0.0, 25.0)
}

fn planet_pillar(record: &ProductRecord, rationale: &mut Vec<String>) -> f64 {
    let mut value = match grade_points(record.ecoscore_grade.as_deref()) {
        Some(points) => {
            let adjective = grade_adjective(points);
            let grade = record.ecoscore_grade.as_deref().unwrap_or("?");
            if points < 10.0 {
                rationale.push(format!(
                    "{adjective} eco grade ({grade}): significant environmental impact"
                ));
            } else {
                rationale.push(format!("{adjective} eco grade ({grade})"));
            }
            points
        }
        None => {
            rationale.push("no eco grade available".to_string());
            MISSING_GRADE_BASELINE
        }
    };

    if record.palm_oil == Some(PalmOilStatus::NonSustainable) {
        value -= PALM_OIL_PENALTY;
        rationale.push("contains non-sustainable palm oil".to_string());
    }

    match record.packaging_recycling {
        Some(PackagingRecycling::Full) => {
            value += PACKAGING_FULL_RECYCLABLE_BONUS;
            rationale.push("fully recyclable packaging".to_string());
        }
        Some(PackagingRecycling::Partial) => {
            value += PACKAGING_PARTIAL_RECYCLABLE_BONUS;
            rationale.push("partially recyclable packaging".to_string());
        }
        _ => {}
    }

    value.clamp(0.0, 25.0)
}

fn care_pillar(record: &ProductRecord, rationale: &mut Vec<String>) -> f64 {
    let mut value = CARE_BASELINE;

    let mut recognized: Vec<&str> = Vec::new();
    for cert in &record.certifications {
        if let Some((_, bonus)) = CARE_CERT_BONUSES.iter().find(|(tag, _)| *tag == cert.tag) {
            value += bonus;
            recognized.push(&cert.label);
        }
    }
    if !recognized.is_empty() {
        rationale.push(format!("certified: {}", recognized.join(", ")));
    }

    if let Some(brand) = &record.brand {
        let brand = brand.to_lowercase();
        if CONTROVERSIAL_BRANDS.iter().any(|b| brand.contains(b)) {
            value -= BOYCOTT_BRAND_PENALTY;
            rationale.push("brand linked to known ethical controversies".to_string());
        }
    }

    value.clamp(0.0, 25.0)
}

fn open_pillar(record: &ProductRecord, rationale: &mut Vec<String>) -> f64 {
    let ingredients = record
        .ingredients_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let is_placeholder = ingredients.is_some_and(|t| {
        let lower = t.to_lowercase();
        PLACEHOLDER_INGREDIENT_TEXTS.iter().any(|p| lower == *p)
    });

    let mut value = match ingredients {
        None => {
            rationale.push("no ingredient information disclosed".to_string());
            OPEN_NO_INGREDIENTS_FLOOR
        }
        Some(_) if is_placeholder => {
            rationale.push("ingredient list is a placeholder".to_string());
            OPEN_NO_INGREDIENTS_FLOOR
        }
        Some(text) => {
            let lower = text.to_lowercase();
            let hidden = HIDDEN_INGREDIENT_PHRASES
                .iter()
                .filter(|phrase| lower.contains(*phrase))
                .count();

            let mut value = OPEN_START;
            if hidden >= 3 {
                value -= HIDDEN_INGREDIENTS_MANY_PENALTY;
                rationale.push(format!("{hidden} vague ingredient phrases hide composition"));
            } else if hidden >= 1 {
                value -= HIDDEN_INGREDIENTS_FEW_PENALTY;
                rationale.push(format!("{hidden} vague ingredient phrase(s)"));
            }
            value
        }
    };

    if record.origin.is_none() {
        value -= NO_ORIGIN_PENALTY;
        rationale.push("no origin or manufacturing information".to_string());
    }

    value.clamp(0.0, 25.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Certification;

    fn scored_base(source: &str) -> ProductRecord {
        let mut record = ProductRecord::partial("9300601234567", source);
        record.name = Some("Rolled Oats".to_string());
        record.quality = 80.0;
        record.completion = 80.0;
        record.ingredients_text = Some("wholegrain oats".to_string());
        record.origin = Some("Australia".to_string());
        record
    }

    #[test]
    fn test_gate_rejects_near_empty_records() {
        let mut record = ProductRecord::partial("123", "fsanz");
        record.name = Some("Something".to_string());
        record.brand = Some("Brand".to_string());
        record.quality = 20.0;
        record.completion = 20.0;

        // No image, nutrients, or ingredients and both metrics below 50
        assert!(!passes_sufficiency_gate(&record));
        assert!(score(&record).is_none());
    }

    #[test]
    fn test_gate_canonical_source_passes() {
        let mut record = ProductRecord::partial("123", "openfoodfacts");
        record.name = Some("Oats".to_string());
        record.quality = 60.0;
        record.completion = 30.0;
        assert!(passes_sufficiency_gate(&record));
    }

    #[test]
    fn test_gate_web_search_needs_quality_and_core_data() {
        let mut record = ProductRecord::partial("123", "web_search");
        record.name = Some("Some product".to_string());
        record.quality = 60.0;
        record.completion = 60.0;
        assert!(!passes_sufficiency_gate(&record), "no core data");

        record.ingredients_text = Some("oats".to_string());
        assert!(passes_sufficiency_gate(&record));

        record.quality = 40.0;
        assert!(!passes_sufficiency_gate(&record), "quality below threshold");
    }

    #[test]
    fn test_gate_mid_tier_needs_real_name() {
        let mut record = ProductRecord::partial("123", "fsanz");
        record.quality = 90.0;
        record.completion = 20.0;
        record.brand = Some("Acme".to_string());

        record.name = Some("123".to_string()); // barcode echoed back
        assert!(!passes_sufficiency_gate(&record));

        record.name = Some("Oats".to_string());
        assert!(passes_sufficiency_gate(&record));
    }

    #[test]
    fn test_pillars_bounded() {
        // Worst case everything: pillar must clamp to 0, not go negative
        let mut record = scored_base("openfoodfacts");
        record.nutriscore_grade = Some("e".to_string());
        record.nova_group = Some(4);
        record.additive_tags = vec![
            "e102".into(),
            "e110".into(),
            "e122".into(),
            "e124".into(),
            "e129".into(),
            "e211".into(),
        ];
        record.allergen_tags = vec!["gluten".into(), "milk".into()];
        record.brand = Some("Nestle".to_string());

        let (composite, breakdown) = score(&record).unwrap();

        // e(5) - nova(8) - additives(cap 10) - allergens(2) = -15 -> clamped
        assert_eq!(breakdown.body, 0.0);
        for pillar in [breakdown.body, breakdown.planet, breakdown.care, breakdown.open] {
            assert!((0.0..=25.0).contains(&pillar));
        }
        assert!(composite <= 100);
    }

    #[test]
    fn test_best_case_composite_bounded() {
        let mut record = scored_base("openfoodfacts");
        record.nutriscore_grade = Some("a".to_string());
        record.ecoscore_grade = Some("a".to_string());
        record.nova_group = Some(1);
        record.packaging_recycling = Some(PackagingRecycling::Full);
        record.certifications = vec![
            Certification { tag: "fairtrade".into(), label: "Fairtrade".into() },
            Certification { tag: "organic".into(), label: "Organic".into() },
            Certification { tag: "vegan".into(), label: "Vegan".into() },
            Certification { tag: "msc".into(), label: "MSC".into() },
            Certification { tag: "rainforest-alliance".into(), label: "RA".into() },
        ];

        let (composite, breakdown) = score(&record).unwrap();

        assert_eq!(breakdown.body, 25.0); // a(25) + nova1(3) clamped
        assert_eq!(breakdown.planet, 25.0); // a(25) + packaging(5) clamped
        assert_eq!(breakdown.care, 25.0); // 10 + 15 bonuses clamped
        assert_eq!(breakdown.open, 25.0);
        assert_eq!(composite, 100);
    }

    #[test]
    fn test_missing_grades_use_baseline() {
        let record = scored_base("openfoodfacts");
        let (_, breakdown) = score(&record).unwrap();

        assert_eq!(breakdown.body, MISSING_GRADE_BASELINE);
        assert_eq!(breakdown.planet, MISSING_GRADE_BASELINE);
        assert!(breakdown.rationale.contains(&"no nutrition grade available".to_string()));
    }

    #[test]
    fn test_open_pillar_floors_without_ingredients() {
        let mut record = scored_base("openfoodfacts");
        record.ingredients_text = None;
        record.nutriments.insert("energy_100g".into(), 100.0); // keep the gate satisfied

        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.open, OPEN_NO_INGREDIENTS_FLOOR);

        record.ingredients_text = Some("N/A".to_string());
        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.open, OPEN_NO_INGREDIENTS_FLOOR);
    }

    #[test]
    fn test_open_pillar_hidden_phrase_tiers() {
        let mut record = scored_base("openfoodfacts");

        record.ingredients_text =
            Some("oats, natural flavour, salt".to_string());
        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.open, OPEN_START - HIDDEN_INGREDIENTS_FEW_PENALTY);

        record.ingredients_text =
            Some("oats, natural flavour, spices, fragrance, salt".to_string());
        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.open, OPEN_START - HIDDEN_INGREDIENTS_MANY_PENALTY);
    }

    #[test]
    fn test_missing_origin_penalized() {
        let mut record = scored_base("openfoodfacts");
        record.origin = None;

        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.open, OPEN_START - NO_ORIGIN_PENALTY);
        assert!(breakdown
            .rationale
            .contains(&"no origin or manufacturing information".to_string()));
    }

    #[test]
    fn test_palm_oil_and_packaging_adjust_planet() {
        let mut record = scored_base("openfoodfacts");
        record.ecoscore_grade = Some("c".to_string());
        record.palm_oil = Some(PalmOilStatus::NonSustainable);

        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.planet, 15.0 - PALM_OIL_PENALTY);

        record.palm_oil = Some(PalmOilStatus::CertifiedSustainable);
        record.packaging_recycling = Some(PackagingRecycling::Partial);
        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.planet, 15.0 + PACKAGING_PARTIAL_RECYCLABLE_BONUS);
    }

    #[test]
    fn test_boycott_brand_floors_care() {
        let mut record = scored_base("openfoodfacts");
        record.brand = Some("Nestlé Australia".to_string());

        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.care, 0.0); // 10 - 30 clamped
    }

    #[test]
    fn test_legacy_aliases_track_pillars() {
        let mut record = scored_base("openfoodfacts");
        record.nutriscore_grade = Some("b".to_string());
        record.ecoscore_grade = Some("d".to_string());

        let (_, breakdown) = score(&record).unwrap();
        assert_eq!(breakdown.nutrition_score, (breakdown.body * 4.0).round() as u8);
        assert_eq!(breakdown.environment_score, (breakdown.planet * 4.0).round() as u8);
    }

    #[test]
    fn test_rationale_never_empty_for_scored_record() {
        let record = scored_base("openfoodfacts");
        let (_, breakdown) = score(&record).unwrap();
        assert!(!breakdown.rationale.is_empty());
    }
}
