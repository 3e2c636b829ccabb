//! Secondary listing: adverse effects keyed by common name, and the merge
//! into primary records.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use herbgraph_shared::{HerbMap, Result};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

use crate::normalize::{StopList, clean_display, is_textual, normalize_adverse_phrase, normalize_key};
use crate::table::{DecodedRows, Link, RowCells, RowDecoder, decode_rows, table_rows};

static LISTING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.wikitable").expect("valid selector"));

/// Adverse-effect labels keyed by the herb's common name as written.
pub type AdverseMap = BTreeMap<String, BTreeSet<String>>;

/// One decoded row of the adverse-effects listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdverseRow {
    /// Column 2 link texts, raw.
    pub name_links: Vec<Link>,
    /// Column 3 free text.
    pub effects_text: String,
}

impl RowDecoder for AdverseRow {
    const COLUMNS: usize = 4;

    fn decode(row: &RowCells<'_>) -> Result<Self> {
        Ok(Self {
            name_links: row.links(2)?,
            effects_text: row.text(3)?,
        })
    }
}

/// Tuning for adverse-effect phrase filtering.
#[derive(Debug, Clone)]
pub struct AdverseOptions {
    /// Phrases must have fewer words than this.
    pub max_words: usize,
}

impl Default for AdverseOptions {
    fn default() -> Self {
        Self { max_words: 3 }
    }
}

/// Parse the first adverse-effects listing into common name → effect labels.
///
/// Rows whose name column has no textual, non-stop-listed link are dropped.
/// Rows with no surviving phrase are kept with an empty set; the merge
/// ignores them.
#[instrument(skip_all, fields(bytes = html.len()))]
pub fn extract_adverse_effects(html: &str, stop: &StopList, opts: &AdverseOptions) -> AdverseMap {
    let doc = Html::parse_document(html);
    let rows = table_rows(&doc, &LISTING_SEL, true);
    let DecodedRows { rows, malformed } = decode_rows::<AdverseRow>(&rows);

    for (index, err) in &malformed {
        debug!(row = index, error = %err, "skipping malformed adverse-effect row");
    }

    let mut adverse = AdverseMap::new();
    for row in rows {
        let Some(name) = row
            .name_links
            .iter()
            .find(|l| is_textual(&l.text) && !stop.contains(&l.text))
            .map(|l| clean_display(&l.text))
        else {
            continue;
        };

        let effects: BTreeSet<String> = row
            .effects_text
            .split(',')
            .filter_map(|phrase| normalize_adverse_phrase(phrase, stop, opts.max_words))
            .collect();

        adverse.entry(name).or_default().extend(effects);
    }

    info!(entries = adverse.len(), malformed = malformed.len(), "adverse-effect listing extracted");
    adverse
}

/// Outcome of merging adverse effects into primary records.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub herbs: HerbMap,
    /// Secondary entries that enriched at least one record.
    pub matched: usize,
    /// Secondary entries discarded (no matching record or empty set).
    pub unmatched: usize,
}

/// Attach adverse effects to the records whose common name matches.
///
/// Names are compared by normalized key. Entries that match nothing, or that
/// carry no effects, are discarded; no record is ever created here.
pub fn merge_adverse_effects(mut herbs: HerbMap, adverse: &AdverseMap) -> MergeOutcome {
    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for herb in herbs.values() {
        by_name
            .entry(normalize_key(&herb.name))
            .or_default()
            .push(herb.latin.clone());
    }

    let mut matched = 0;
    let mut unmatched = 0;

    for (name, effects) in adverse {
        let targets = by_name.get(&normalize_key(name));
        match targets {
            Some(latins) if !effects.is_empty() => {
                for latin in latins {
                    if let Some(herb) = herbs.get_mut(latin) {
                        herb.adverse_effects.extend(effects.iter().cloned());
                    }
                }
                matched += 1;
            }
            _ => {
                debug!(%name, effects = effects.len(), "adverse-effect entry discarded");
                unmatched += 1;
            }
        }
    }

    MergeOutcome {
        herbs,
        matched,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herbgraph_shared::HerbRecord;

    fn stop() -> StopList {
        StopList::new(["citation needed", "Rome"])
    }

    const LISTING: &str = r#"
        <table class="wikitable">
          <tr><th>Name</th><th>Species</th><th>Common name</th><th>Adverse effects</th></tr>
          <tr>
            <td>1</td><td><i>Aloe vera</i></td>
            <td><a href="/wiki/Rome">Rome</a> <a href="/wiki/Aloe">Aloe</a></td>
            <td>nausea, diarrhea, citation needed</td>
          </tr>
          <tr>
            <td>2</td><td><i>Mentha</i></td><td><a href="/wiki/Mint">Mint</a></td>
            <td>can provoke a lengthy list of complaints</td>
          </tr>
          <tr>
            <td>3</td><td><i>Unknown</i></td><td>no link</td><td>rash</td>
          </tr>
          <tr><td>4</td><td>short</td></tr>
        </table>
        <table class="wikitable">
          <tr><td>x</td><td>y</td><td><a>Ignored</a></td><td>headache</td></tr>
        </table>
    "#;

    fn record(latin: &str, name: &str) -> HerbRecord {
        HerbRecord {
            latin: latin.into(),
            name: name.into(),
            ..HerbRecord::default()
        }
    }

    #[test]
    fn aloe_row_yields_short_phrases() {
        let map = extract_adverse_effects(LISTING, &stop(), &AdverseOptions::default());
        assert_eq!(
            map.get("Aloe"),
            Some(&BTreeSet::from(["nausea".to_string(), "diarrhea".to_string()]))
        );
    }

    #[test]
    fn long_phrases_leave_an_empty_set() {
        let map = extract_adverse_effects(LISTING, &stop(), &AdverseOptions::default());
        assert_eq!(map.get("Mint"), Some(&BTreeSet::new()));
        assert!(!map.contains_key("no link"));
    }

    #[test]
    fn only_the_first_listing_is_read() {
        let map = extract_adverse_effects(LISTING, &stop(), &AdverseOptions::default());
        assert!(!map.contains_key("Ignored"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn merge_updates_matching_records_only() {
        let mut herbs = HerbMap::new();
        herbs.insert("Aloe vera".into(), record("Aloe vera", "Aloe"));
        herbs.insert("Mentha".into(), record("Mentha", "Mint"));

        let mut adverse = AdverseMap::new();
        adverse.insert("aloe".into(), BTreeSet::from(["nausea".to_string()]));
        adverse.insert("Mint".into(), BTreeSet::new());
        adverse.insert("Ginseng".into(), BTreeSet::from(["insomnia".to_string()]));

        let out = merge_adverse_effects(herbs, &adverse);

        assert_eq!(out.herbs.len(), 2);
        assert_eq!(
            out.herbs["Aloe vera"].adverse_effects,
            BTreeSet::from(["nausea".to_string()])
        );
        assert!(out.herbs["Mentha"].adverse_effects.is_empty());
        assert!(!out.herbs.contains_key("Ginseng"));
        assert_eq!(out.matched, 1);
        assert_eq!(out.unmatched, 2);
    }
}
