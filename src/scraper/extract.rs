use crate::domain::{Category, RawListing};
use crate::errors::ParseError;
use crate::normalize::clean_code;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Pulls the raw fields off a listing detail page.
pub struct DetailExtractor {
    code: Selector,
    feature_blocks: Vec<Selector>,
    item: Selector,
    label: Selector,
    value: Selector,
    mobiscore: Selector,
}

fn parse_selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{css}: {e}")))
}

impl DetailExtractor {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            code: parse_selector("p.zimmo-code")?,
            feature_blocks: vec![
                parse_selector("section#main-features")?,
                parse_selector("div.features-section")?,
                parse_selector("ul.main-features")?,
            ],
            item: parse_selector("li")?,
            label: parse_selector("strong.feature-label")?,
            value: parse_selector("span.feature-value")?,
            mobiscore: parse_selector("span.section-mobiscore_total-score")?,
        })
    }

    pub fn extract(&self, html: &str, url: &str) -> Result<RawListing, ParseError> {
        let document = Html::parse_document(html);

        let code = self
            .printed_code(&document)
            .or_else(|| code_from_url(url))
            .ok_or(ParseError::MissingIdentifier)?;

        let features = self.features(&document)?;

        let mobiscore = document
            .select(&self.mobiscore)
            .next()
            .map(text_of)
            .filter(|t| !t.is_empty());

        Ok(RawListing {
            code,
            url: url.to_string(),
            features,
            mobiscore,
        })
    }

    /// The code line as printed, label included; cleaned during normalization.
    fn printed_code(&self, document: &Html) -> Option<String> {
        let text = text_of(document.select(&self.code).next()?);
        clean_code(&text).map(|_| text)
    }

    fn features(&self, document: &Html) -> Result<HashMap<String, Option<String>>, ParseError> {
        let block = self
            .feature_blocks
            .iter()
            .find_map(|sel| document.select(sel).next())
            .ok_or(ParseError::MissingFeatures)?;

        let mut features = HashMap::new();
        for li in block.select(&self.item) {
            let Some(label) = li.select(&self.label).next() else {
                continue;
            };
            let key = text_of(label).to_lowercase();
            let value = li.select(&self.value).next().map(text_of);
            features.insert(key, value);
        }
        Ok(features)
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn code_in_url() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        let segments = Category::ALL.map(|c| c.url_segment()).join("|");
        Regex::new(&format!("/(?:{segments})/([A-Z0-9]+)/")).ok()
    })
    .as_ref()
}

/// The listing code embedded in a detail URL, e.g. `.../huis/K1AB2/`.
pub fn code_from_url(url: &str) -> Option<String> {
    code_in_url()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"
        <html><body>
          <p class="zimmo-code">Zimmo-code: K1AB2</p>
          <section id="main-features"><ul>
            <li><strong class="feature-label">Prijs</strong><span class="feature-value">€ 349.000</span></li>
            <li><strong class="feature-label">Adres</strong><span class="feature-value">Kerkstraat 12,
                9000 Gent</span></li>
            <li><strong class="feature-label">Tuin</strong></li>
            <li><span class="feature-value">orphan value</span></li>
          </ul></section>
          <span class="section-mobiscore_total-score"> 7.4 </span>
        </body></html>
    "#;

    const URL: &str = "https://www.zimmo.be/nl/gent-9000/te-koop/huis/K1AB2/";

    #[test]
    fn reads_code_features_and_score() {
        let raw = DetailExtractor::new().unwrap().extract(DETAIL, URL).unwrap();
        assert_eq!(raw.code, "Zimmo-code: K1AB2");
        assert_eq!(raw.feature("prijs"), Some("€ 349.000"));
        assert!(raw.feature("adres").unwrap().starts_with("Kerkstraat 12,"));
        assert!(raw.features.contains_key("tuin"));
        assert_eq!(raw.feature("tuin"), None);
        assert_eq!(raw.features.len(), 3);
        assert_eq!(raw.mobiscore.as_deref(), Some("7.4"));
    }

    #[test]
    fn falls_back_to_code_in_url() {
        let html = r#"<ul class="main-features"><li><strong class="feature-label">Type</strong><span class="feature-value">Villa</span></li></ul>"#;
        let raw = DetailExtractor::new()
            .unwrap()
            .extract(html, "https://www.zimmo.be/nl/x/te-koop/appartement/LQ9Z7/")
            .unwrap();
        assert_eq!(raw.code, "LQ9Z7");
        assert_eq!(raw.feature("type"), Some("Villa"));
    }

    #[test]
    fn page_without_feature_block_is_rejected() {
        let html = r#"<p class="zimmo-code">Zimmo-code: K1AB2</p>"#;
        let err = DetailExtractor::new().unwrap().extract(html, URL).unwrap_err();
        assert!(matches!(err, ParseError::MissingFeatures));
    }

    #[test]
    fn page_without_any_code_is_rejected() {
        let err = DetailExtractor::new()
            .unwrap()
            .extract("<html></html>", "https://www.zimmo.be/nl/about/")
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingIdentifier));
    }

    #[test]
    fn url_codes() {
        assert_eq!(code_from_url(URL).as_deref(), Some("K1AB2"));
        assert_eq!(code_from_url("https://www.zimmo.be/nl/zoeken/"), None);
    }
}
