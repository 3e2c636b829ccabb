//! Primary listing: taxonomic name, common name, and cure effects per herb.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use herbgraph_shared::{HerbGraphError, HerbMap, HerbRecord, Result};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::normalize::{StopList, clean_display, normalize_effect};
use crate::table::{DecodedRows, RowCells, RowDecoder, decode_rows, table_rows};

static LISTING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.wikitable").expect("valid selector"));

/// One decoded row of the primary listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HerbRow {
    /// Column 0 link text.
    pub latin: String,
    /// Column 0 link target, as written in the document.
    pub href: Option<String>,
    /// Column 1 link text, or the plain cell text when unlinked.
    pub name: String,
    /// Column 2 link texts, raw.
    pub effect_labels: Vec<String>,
}

impl RowDecoder for HerbRow {
    const COLUMNS: usize = 3;

    fn decode(row: &RowCells<'_>) -> Result<Self> {
        let latin_link = row
            .links(0)?
            .into_iter()
            .map(|l| (clean_display(&l.text), l.href))
            .find(|(text, _)| !text.is_empty())
            .ok_or_else(|| HerbGraphError::malformed_row(0, "no hyperlinked taxonomic name"))?;

        let name = row
            .links(1)?
            .into_iter()
            .map(|l| clean_display(&l.text))
            .find(|text| !text.is_empty())
            .map_or_else(|| row.text(1).map(|t| clean_display(&t)), Ok)?;

        let effect_labels = row.links(2)?.into_iter().map(|l| l.text).collect();

        Ok(Self {
            latin: latin_link.0,
            href: latin_link.1,
            name,
            effect_labels,
        })
    }
}

/// Output of the primary extraction.
#[derive(Debug, Default)]
pub struct HerbExtraction {
    /// Partial records (no adverse effects, no taxonomy yet).
    pub herbs: HerbMap,
    /// Rows that could not be decoded.
    pub malformed: usize,
}

/// Parse the primary listing into herb records keyed by taxonomic name.
///
/// A taxonomic name that appears on several rows keeps its first common
/// name and link; the effect sets are unioned.
#[instrument(skip_all, fields(bytes = html.len()))]
pub fn extract_herbs(html: &str, base: &Url, stop: &StopList) -> HerbExtraction {
    let doc = Html::parse_document(html);
    let rows = table_rows(&doc, &LISTING_SEL, false);
    let DecodedRows { rows, malformed } = decode_rows::<HerbRow>(&rows);

    for (index, err) in &malformed {
        debug!(row = index, error = %err, "skipping malformed herb row");
    }

    let mut herbs = HerbMap::new();
    for row in rows {
        let effects: BTreeSet<String> = row
            .effect_labels
            .iter()
            .filter_map(|label| normalize_effect(label, stop))
            .collect();

        let link = row.href.as_deref().and_then(|href| match base.join(href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(latin = %row.latin, href, error = %e, "unresolvable herb link");
                None
            }
        });

        herbs
            .entry(row.latin.clone())
            .and_modify(|existing: &mut HerbRecord| existing.effects.extend(effects.iter().cloned()))
            .or_insert_with(|| HerbRecord {
                latin: row.latin,
                name: row.name,
                link,
                effects,
                ..HerbRecord::default()
            });
    }

    info!(herbs = herbs.len(), malformed = malformed.len(), "primary listing extracted");

    HerbExtraction {
        herbs,
        malformed: malformed.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://en.wikipedia.org").unwrap()
    }

    fn stop() -> StopList {
        StopList::new(["citation needed", "Rome"])
    }

    const LISTING: &str = r##"
        <table class="wikitable">
          <tr><th>Scientific name</th><th>Name</th><th>Uses</th></tr>
          <tr>
            <td><i><a href="/wiki/Aloe_vera">Aloe vera</a></i></td>
            <td><a href="/wiki/Aloe">Aloe</a></td>
            <td>Used on <a href="/wiki/Wound">wounds</a> and <a href="/wiki/Burn">Burns</a>
                in <a href="/wiki/Rome">Rome</a><sup><a href="#cite-1">[1]</a></sup></td>
          </tr>
          <tr>
            <td>no link here</td>
            <td><a href="/wiki/Nothing">Nothing</a></td>
            <td><a href="/wiki/Fever">fever</a></td>
          </tr>
          <tr>
            <td><a href="/wiki/Mentha">Mentha</a></td>
            <td>Mint</td>
            <td></td>
          </tr>
          <tr><td><a href="/wiki/Short">Short row</a></td></tr>
        </table>
    "##;

    #[test]
    fn aloe_row_becomes_record() {
        let out = extract_herbs(LISTING, &base(), &stop());
        let aloe = out.herbs.get("Aloe vera").expect("aloe record");

        assert_eq!(aloe.name, "Aloe");
        assert_eq!(aloe.link.as_deref(), Some("https://en.wikipedia.org/wiki/Aloe_vera"));
        assert_eq!(
            aloe.effects,
            BTreeSet::from(["wounds".to_string(), "burns".to_string()])
        );
        assert!(aloe.adverse_effects.is_empty());
        assert!(aloe.taxonomy.is_empty());
    }

    #[test]
    fn rows_without_taxonomic_name_are_skipped() {
        let out = extract_herbs(LISTING, &base(), &stop());
        assert_eq!(out.herbs.len(), 2);
        assert!(!out.herbs.values().any(|h| h.name == "Nothing"));
        assert_eq!(out.malformed, 2);
    }

    #[test]
    fn unlinked_common_name_falls_back_to_text() {
        let out = extract_herbs(LISTING, &base(), &stop());
        let mint = out.herbs.get("Mentha").expect("mint record");
        assert_eq!(mint.name, "Mint");
        assert!(mint.effects.is_empty());
    }

    #[test]
    fn repeated_taxonomic_name_unions_effects() {
        let html = r#"
            <table class="wikitable">
              <tr><td><a href="/wiki/Aloe_vera">Aloe vera</a></td><td><a>Aloe</a></td><td><a>wounds</a></td></tr>
              <tr><td><a href="/wiki/Other">Aloe vera</a></td><td><a>Other</a></td><td><a>Acne</a></td></tr>
            </table>
        "#;
        let out = extract_herbs(html, &base(), &stop());
        let aloe = out.herbs.get("Aloe vera").unwrap();
        assert_eq!(aloe.name, "Aloe");
        assert_eq!(aloe.effects.len(), 2);
        assert!(aloe.effects.contains("acne"));
    }

    #[test]
    fn document_without_listing_yields_nothing() {
        let out = extract_herbs("<html><body><p>moved</p></body></html>", &base(), &stop());
        assert!(out.herbs.is_empty());
        assert_eq!(out.malformed, 0);
    }
}
