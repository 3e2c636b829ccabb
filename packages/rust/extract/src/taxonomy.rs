//! Taxonomy chains from detail-page infoboxes.

use std::sync::LazyLock;

use herbgraph_fetch::DocumentFetcher;
use herbgraph_shared::{HerbGraphError, Rank, Result, TaxonRank};
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::normalize::normalize_taxon;
use crate::table::{RowCells, RowDecoder, decode_rows, table_rows};

/// Taxoboxes first; any infobox as a fallback.
static INFOBOX_SELECTORS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse("table.infobox.biota").expect("valid selector"),
        Selector::parse("table.infobox").expect("valid selector"),
    ]
});

/// An infobox row whose label is a recognized rank.
struct RankRow(Option<TaxonRank>);

impl RowDecoder for RankRow {
    const COLUMNS: usize = 2;

    fn decode(row: &RowCells<'_>) -> Result<Self> {
        let Some(rank) = Rank::from_label(&row.text(0)?) else {
            return Ok(Self(None));
        };
        let value = normalize_taxon(&row.text(1)?);
        Ok(Self(value.map(|value| TaxonRank { rank, value })))
    }
}

/// Read the ordered rank chain out of a detail document.
///
/// Rows whose label is not in the rank vocabulary are skipped. A document
/// without an infobox yields an empty chain.
pub fn extract_taxonomy(html: &str) -> Vec<TaxonRank> {
    let doc = Html::parse_document(html);

    let Some(sel) = INFOBOX_SELECTORS
        .iter()
        .find(|sel| doc.select(sel).next().is_some())
    else {
        debug!("no infobox in document");
        return Vec::new();
    };

    let rows = table_rows(&doc, sel, true);
    decode_rows::<RankRow>(&rows)
        .rows
        .into_iter()
        .filter_map(|RankRow(link)| link)
        .collect()
}

/// Fetch one herb's detail document and extract its chain.
pub async fn fetch_taxonomy<F: DocumentFetcher>(fetcher: &F, url: &Url) -> Result<Vec<TaxonRank>> {
    let doc = fetcher.fetch(url).await?;
    let chain = extract_taxonomy(&doc.body);
    if chain.is_empty() {
        return Err(HerbGraphError::parse(format!("{url}: no taxonomy ranks found")));
    }
    Ok(chain)
}

/// [`fetch_taxonomy`] with per-herb isolation: any failure degrades to an
/// empty chain and is logged.
#[instrument(skip_all, fields(url = %url))]
pub async fn resolve_taxonomy<F: DocumentFetcher>(fetcher: &F, url: &Url) -> Vec<TaxonRank> {
    match fetch_taxonomy(fetcher, url).await {
        Ok(chain) => {
            debug!(ranks = chain.len(), "taxonomy resolved");
            chain
        }
        Err(e) => {
            warn!(error = %e, "taxonomy unavailable, herb will not be graphed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herbgraph_fetch::FetchedDocument;
    use std::collections::HashMap;

    const ALOE_PAGE: &str = r#"
        <html><body>
        <table class="infobox vcard"><tr><td>Kingdom:</td><td>Wrong box</td></tr></table>
        <table class="infobox biota">
          <tr><th colspan="2">Aloe vera</th></tr>
          <tr><td>Kingdom:</td><td><a href="/wiki/Plant">Plantae</a></td></tr>
          <tr><td>Clade:</td><td>Tracheophytes</td></tr>
          <tr><td>Clade:</td><td>Angiosperms</td></tr>
          <tr><td>Order:</td><td>Asparagales</td></tr>
          <tr><td>Family:</td><td>Asphodelaceae<sup>[1]</sup></td></tr>
          <tr><td>Subfamily:</td><td>Asphodeloideae</td></tr>
          <tr><td>Genus:</td><td><i>Aloe</i></td></tr>
          <tr><td>Species:</td><td><i>A. vera</i></td></tr>
          <tr><td colspan="2">Binomial name</td></tr>
        </table>
        </body></html>
    "#;

    struct StaticFetcher(HashMap<String, String>);

    impl DocumentFetcher for StaticFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
            self.0
                .get(url.as_str())
                .map(|body| FetchedDocument::new(url.clone(), 200, body.clone()))
                .ok_or_else(|| HerbGraphError::Network(format!("{url}: HTTP 404")))
        }
    }

    #[test]
    fn chain_preserves_document_order() {
        let chain = extract_taxonomy(ALOE_PAGE);
        let ranks: Vec<Rank> = chain.iter().map(|t| t.rank).collect();
        assert_eq!(
            ranks,
            vec![
                Rank::Kingdom,
                Rank::Clade,
                Rank::Clade,
                Rank::Order,
                Rank::Family,
                Rank::Subfamily,
                Rank::Genus,
            ]
        );
        assert_eq!(chain[0].value, "plantae");
        assert_eq!(chain[4].value, "asphodelaceae");
        assert_eq!(chain.last().unwrap().value, "aloe");
    }

    #[test]
    fn species_rows_are_excluded() {
        let chain = extract_taxonomy(ALOE_PAGE);
        assert!(chain.iter().all(|t| t.value != "a. vera"));
    }

    #[test]
    fn missing_infobox_is_empty_chain() {
        assert!(extract_taxonomy("<html><body><p>stub</p></body></html>").is_empty());
    }

    #[test]
    fn generic_infobox_is_fallback() {
        let html = r#"<table class="infobox"><tr><td>Genus:</td><td>Mentha</td></tr></table>"#;
        assert_eq!(extract_taxonomy(html), vec![TaxonRank::new(Rank::Genus, "mentha")]);
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_empty_chain() {
        let fetcher = StaticFetcher(HashMap::new());
        let url = Url::parse("https://en.wikipedia.org/wiki/Missing").unwrap();

        assert!(fetch_taxonomy(&fetcher, &url).await.is_err());
        assert!(resolve_taxonomy(&fetcher, &url).await.is_empty());
    }

    #[tokio::test]
    async fn fetched_page_resolves() {
        let url = Url::parse("https://en.wikipedia.org/wiki/Aloe_vera").unwrap();
        let fetcher = StaticFetcher(HashMap::from([(url.to_string(), ALOE_PAGE.to_string())]));

        let chain = resolve_taxonomy(&fetcher, &url).await;
        assert_eq!(chain.len(), 7);
    }
}
