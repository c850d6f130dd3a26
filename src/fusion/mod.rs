//! Multi-source record fusion
//!
//! Merges N partial records from different providers into one, using
//! source-weighted precedence for scalar fields, weighted averaging for
//! nutrient values, and longest-candidate selection for completeness-judged
//! text. Fusion is a pure function of its inputs and the weight table:
//! output is deterministic and independent of input array order.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::models::{Certification, ProductRecord};
use crate::providers::source_class;

/// Fusion errors
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("cannot merge an empty record set")]
    EmptyInput,
}

/// Build the default source -> weight table from registered source classes.
///
/// Government/official sources rank highest, community open databases high,
/// retailer APIs medium, generic lookup APIs low, web search lowest. Sources
/// absent from the table fall back to a low default at merge time.
pub fn default_weight_table() -> HashMap<String, f64> {
    [
        ("fsanz", 0.40),
        ("openfoodfacts", 0.35),
        ("retailer", 0.25),
        ("upcitemdb", 0.15),
        ("web_search", 0.10),
    ]
    .into_iter()
    .map(|(source, weight)| (source.to_string(), weight))
    .collect()
}

fn weight_for(table: &HashMap<String, f64>, source: &str) -> f64 {
    table
        .get(source)
        .copied()
        .unwrap_or_else(|| source_class(source).default_weight())
}

/// Merge partial records into one fused record.
///
/// Fails only on an empty input set. The highest-weight record is the fusion
/// base; weights are normalized over the records actually present so the
/// merge adapts to whichever providers answered.
pub fn merge(
    records: &[ProductRecord],
    weights: Option<&HashMap<String, f64>>,
) -> Result<ProductRecord, FusionError> {
    if records.is_empty() {
        return Err(FusionError::EmptyInput);
    }

    let default_table = default_weight_table();
    let table = weights.unwrap_or(&default_table);

    // Weight-descending order; ties break on provider id so the result does
    // not depend on input order.
    let mut ranked: Vec<(f64, &ProductRecord)> = records
        .iter()
        .map(|r| (weight_for(table, &r.source), r))
        .collect();
    ranked.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.source.cmp(&b.1.source))
    });

    // An all-zero weight table would otherwise divide to NaN; fall back to
    // equal weights so the merge stays defined.
    let total_weight: f64 = ranked.iter().map(|(w, _)| w).sum();
    let normalized: Vec<(f64, &ProductRecord)> = if total_weight > 0.0 {
        ranked
            .iter()
            .map(|(w, r)| (w / total_weight, *r))
            .collect()
    } else {
        let equal = 1.0 / ranked.len() as f64;
        ranked.iter().map(|(_, r)| (equal, *r)).collect()
    };

    let base = normalized[0].1;
    let mut fused = ProductRecord::partial(&base.barcode, &base.source);

    // Scalar fields: highest-weight record holding the field wins outright
    fused.name = first_scalar(&normalized, |r| r.name.clone(), "name");
    fused.brand = first_scalar(&normalized, |r| r.brand.clone(), "brand");
    fused.category = first_scalar(&normalized, |r| r.category.clone(), "category");
    fused.image_url = first_scalar(&normalized, |r| r.image_url.clone(), "image_url");
    fused.quantity = first_scalar(&normalized, |r| r.quantity.clone(), "quantity");
    fused.packaging = first_scalar(&normalized, |r| r.packaging.clone(), "packaging");
    fused.origin = first_scalar(&normalized, |r| r.origin.clone(), "origin");
    fused.nutriscore_grade = normalized
        .iter()
        .find_map(|(_, r)| r.nutriscore_grade.clone());
    fused.ecoscore_grade = normalized.iter().find_map(|(_, r)| r.ecoscore_grade.clone());
    fused.nova_group = normalized.iter().find_map(|(_, r)| r.nova_group);
    fused.palm_oil = normalized.iter().find_map(|(_, r)| r.palm_oil);
    fused.packaging_recycling = normalized.iter().find_map(|(_, r)| r.packaging_recycling);
    fused.additive_tags = first_tag_list(&normalized, |r| &r.additive_tags);
    fused.ingredient_analysis_tags =
        first_tag_list(&normalized, |r| &r.ingredient_analysis_tags);
    fused.allergen_tags = first_tag_list(&normalized, |r| &r.allergen_tags);

    // Completeness-judged text: the longest candidate wins, regardless of
    // source weight
    fused.ingredients_text = longest_text(&normalized, |r| r.ingredients_text.as_deref());
    fused.description = longest_text(&normalized, |r| r.description.as_deref());

    fused.nutriments = fuse_nutriments(&normalized);
    reconcile_nutrient_variants(&mut fused.nutriments);

    fused.certifications = union_certifications(&normalized);

    // Provenance: recompute quality/completion as the weighted average of the
    // inputs' self-reported values
    fused.quality = normalized.iter().map(|(w, r)| w * r.quality).sum();
    fused.completion = normalized.iter().map(|(w, r)| w * r.completion).sum();

    tracing::debug!(
        barcode = %fused.barcode,
        sources = normalized.len(),
        base = %base.source,
        quality = fused.quality,
        completion = fused.completion,
        "Fused multi-source record"
    );

    Ok(fused)
}

/// First non-empty value in weight order. Disagreeing candidates are logged
/// with their string similarity for diagnostics.
fn first_scalar<F>(
    ranked: &[(f64, &ProductRecord)],
    accessor: F,
    field_name: &str,
) -> Option<String>
where
    F: Fn(&ProductRecord) -> Option<String>,
{
    let candidates: Vec<(&str, String)> = ranked
        .iter()
        .filter_map(|(_, r)| {
            accessor(r)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (r.source.as_str(), v))
        })
        .collect();

    let (_, winner) = candidates.first()?;

    for (source, value) in candidates.iter().skip(1) {
        if value != winner {
            let similarity = strsim::normalized_levenshtein(winner, value);
            tracing::debug!(
                field = field_name,
                chosen = %winner,
                conflicting = %value,
                source,
                similarity,
                "Conflicting scalar candidates during fusion"
            );
        }
    }

    Some(winner.clone())
}

fn first_tag_list<'a, F>(ranked: &[(f64, &'a ProductRecord)], accessor: F) -> Vec<String>
where
    F: Fn(&'a ProductRecord) -> &'a Vec<String>,
{
    ranked
        .iter()
        .map(|(_, r)| accessor(r))
        .find(|tags| !tags.is_empty())
        .cloned()
        .unwrap_or_default()
}

fn longest_text<'a, F>(ranked: &[(f64, &'a ProductRecord)], accessor: F) -> Option<String>
where
    F: Fn(&'a ProductRecord) -> Option<&'a str>,
{
    ranked
        .iter()
        .filter_map(|(_, r)| accessor(r))
        .filter(|t| !t.trim().is_empty())
        .max_by_key(|t| t.len())
        .map(|t| t.to_string())
}

/// Weighted average per nutrient key, over only the records supplying that
/// key. A record without the key is excluded from that key's average, never
/// counted as zero.
fn fuse_nutriments(ranked: &[(f64, &ProductRecord)]) -> BTreeMap<String, f64> {
    let mut keys: Vec<&str> = ranked
        .iter()
        .flat_map(|(_, r)| r.nutriments.keys().map(String::as_str))
        .collect();
    keys.sort_unstable();
    keys.dedup();

    let mut fused = BTreeMap::new();
    for key in keys {
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for (weight, record) in ranked {
            if let Some(value) = record.nutriments.get(key) {
                weight_sum += weight;
                value_sum += weight * value;
            }
        }
        if weight_sum > 0.0 {
            fused.insert(key.to_string(), value_sum / weight_sum);
        }
    }
    fused
}

/// Reconcile bare and per-100-unit variants of the same nutrient: when one is
/// present and the other absent, the present value populates both.
fn reconcile_nutrient_variants(nutriments: &mut BTreeMap<String, f64>) {
    let keys: Vec<String> = nutriments.keys().cloned().collect();
    for key in keys {
        if let Some(bare) = key.strip_suffix("_100g") {
            if !nutriments.contains_key(bare) {
                if let Some(value) = nutriments.get(&key).copied() {
                    nutriments.insert(bare.to_string(), value);
                }
            }
        } else {
            let variant = format!("{key}_100g");
            if !nutriments.contains_key(&variant) {
                if let Some(value) = nutriments.get(&key).copied() {
                    nutriments.insert(variant, value);
                }
            }
        }
    }
}

/// Union by tag; first seen in weight order wins on duplicate tags
fn union_certifications(ranked: &[(f64, &ProductRecord)]) -> Vec<Certification> {
    let mut certs: Vec<Certification> = Vec::new();
    for (_, record) in ranked {
        for cert in &record.certifications {
            if !certs.iter().any(|c| c.tag == cert.tag) {
                certs.push(cert.clone());
            }
        }
    }
    certs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str) -> ProductRecord {
        ProductRecord::partial("9300601234567", source)
    }

    #[test]
    fn test_merge_empty_fails() {
        assert!(matches!(merge(&[], None), Err(FusionError::EmptyInput)));
    }

    #[test]
    fn test_scalar_fields_follow_weight_order() {
        let mut official = record("fsanz");
        official.name = Some("Rolled Oats 1kg".to_string());

        let mut lookup = record("upcitemdb");
        lookup.name = Some("Oats".to_string());
        lookup.brand = Some("Acme Foods".to_string());

        let fused = merge(&[lookup, official], None).unwrap();

        // fsanz outweighs upcitemdb for name; brand comes from the only
        // record carrying it
        assert_eq!(fused.name.as_deref(), Some("Rolled Oats 1kg"));
        assert_eq!(fused.brand.as_deref(), Some("Acme Foods"));
        assert_eq!(fused.source, "fsanz");
    }

    #[test]
    fn test_all_zero_weight_table_falls_back_to_equal_weights() {
        let mut official = record("fsanz");
        official.name = Some("Rolled Oats 1kg".to_string());
        official.quality = 80.0;
        official.completion = 60.0;

        let mut lookup = record("upcitemdb");
        lookup.quality = 40.0;
        lookup.completion = 20.0;

        let weights: HashMap<String, f64> =
            [("fsanz".to_string(), 0.0), ("upcitemdb".to_string(), 0.0)]
                .into_iter()
                .collect();

        let fused = merge(&[official, lookup], Some(&weights)).unwrap();

        assert!(fused.quality.is_finite());
        assert!(fused.completion.is_finite());
        assert!((fused.quality - 60.0).abs() < 1e-9);
        assert!((fused.completion - 40.0).abs() < 1e-9);
        assert_eq!(fused.name.as_deref(), Some("Rolled Oats 1kg"));
    }

    #[test]
    fn test_nutrient_exclusion_rule() {
        let mut official = record("fsanz");
        official.nutriments.insert("energy_100g".to_string(), 100.0);

        let mut web = record("web_search");
        web.nutriments.insert("energy_100g".to_string(), 100.0);
        web.nutriments.insert("protein_100g".to_string(), 5.0);

        let fused = merge(&[official, web], None).unwrap();

        // protein comes solely from the only source that has it; energy is
        // weighted-averaged but numerically unchanged since both report 100
        assert_eq!(fused.nutriments.get("energy_100g"), Some(&100.0));
        assert_eq!(fused.nutriments.get("protein_100g"), Some(&5.0));
    }

    #[test]
    fn test_nutrient_weighted_average() {
        let mut official = record("fsanz"); // weight 0.40
        official.nutriments.insert("sugars_100g".to_string(), 10.0);

        let mut web = record("web_search"); // weight 0.10
        web.nutriments.insert("sugars_100g".to_string(), 20.0);

        let fused = merge(&[official, web], None).unwrap();

        // (0.4*10 + 0.1*20) / 0.5 = 12
        let sugars = fused.nutriments.get("sugars_100g").unwrap();
        assert!((sugars - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_longest_ingredient_text_wins() {
        let mut official = record("fsanz");
        official.ingredients_text = Some("oats".to_string());

        let mut community = record("openfoodfacts");
        community.ingredients_text =
            Some("wholegrain oats (100%), may contain traces of gluten".to_string());

        let fused = merge(&[official, community], None).unwrap();

        assert_eq!(
            fused.ingredients_text.as_deref(),
            Some("wholegrain oats (100%), may contain traces of gluten")
        );
    }

    #[test]
    fn test_certification_union_first_seen_by_weight() {
        let mut official = record("fsanz");
        official.certifications.push(Certification {
            tag: "organic".to_string(),
            label: "Certified Organic (ACO)".to_string(),
        });

        let mut community = record("openfoodfacts");
        community.certifications.push(Certification {
            tag: "organic".to_string(),
            label: "EU Organic".to_string(),
        });
        community.certifications.push(Certification {
            tag: "fairtrade".to_string(),
            label: "Fairtrade".to_string(),
        });

        let fused = merge(&[community, official], None).unwrap();

        assert_eq!(fused.certifications.len(), 2);
        let organic = fused
            .certifications
            .iter()
            .find(|c| c.tag == "organic")
            .unwrap();
        // fsanz outranks openfoodfacts, so its display name wins
        assert_eq!(organic.label, "Certified Organic (ACO)");
    }

    #[test]
    fn test_quality_completion_recomputed() {
        let mut official = record("fsanz"); // normalized weight 0.8
        official.quality = 90.0;
        official.completion = 80.0;

        let mut web = record("web_search"); // normalized weight 0.2
        web.quality = 10.0;
        web.completion = 20.0;

        let fused = merge(&[official, web], None).unwrap();

        assert!((fused.quality - 74.0).abs() < 1e-9);
        assert!((fused.completion - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_determinism_independent_of_input_order() {
        let mut a = record("fsanz");
        a.name = Some("A".to_string());
        a.nutriments.insert("energy_100g".to_string(), 120.0);

        let mut b = record("openfoodfacts");
        b.name = Some("B".to_string());
        b.nutriments.insert("energy_100g".to_string(), 100.0);
        b.ingredients_text = Some("oats, salt".to_string());

        let mut c = record("web_search");
        c.name = Some("C".to_string());

        let forward = merge(&[a.clone(), b.clone(), c.clone()], None).unwrap();
        let reverse = merge(&[c, b, a], None).unwrap();

        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_weight_monotonicity_for_scalars() {
        let mut lookup = record("upcitemdb");
        lookup.name = Some("Lookup Name".to_string());

        let mut community = record("openfoodfacts");
        community.name = Some("Community Name".to_string());

        let baseline = merge(&[lookup.clone(), community.clone()], None).unwrap();
        assert_eq!(baseline.name.as_deref(), Some("Community Name"));

        // Raising the lookup source's weight above the community's flips the
        // scalar winner, never the reverse
        let mut table = default_weight_table();
        table.insert("upcitemdb".to_string(), 0.50);
        let boosted = merge(&[lookup, community], Some(&table)).unwrap();
        assert_eq!(boosted.name.as_deref(), Some("Lookup Name"));
    }

    #[test]
    fn test_bare_and_100g_variants_reconciled() {
        let mut a = record("openfoodfacts");
        a.nutriments.insert("energy_100g".to_string(), 1500.0);
        a.nutriments.insert("salt".to_string(), 1.2);

        let fused = merge(&[a], None).unwrap();

        assert_eq!(fused.nutriments.get("energy"), Some(&1500.0));
        assert_eq!(fused.nutriments.get("salt_100g"), Some(&1.2));
    }

    #[test]
    fn test_unknown_source_gets_low_default_weight() {
        let mut unknown = record("mystery_api");
        unknown.name = Some("Mystery".to_string());

        let mut community = record("openfoodfacts");
        community.name = Some("Known".to_string());

        let fused = merge(&[unknown, community], None).unwrap();
        assert_eq!(fused.name.as_deref(), Some("Known"));
    }
}
