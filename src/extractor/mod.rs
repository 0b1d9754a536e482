//! Price, discount and name extraction from product pages.
//!
//! Every field is read through an ordered cascade of strategies. Only the price is
//! mandatory; the other fields fall back to "unknown" values.

pub mod normalize;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{ExtractedObservation, UNNAMED_PRODUCT};
use crate::utils::error::{AppError, Result};
use normalize::{normalize_price, pick_highest, pick_lowest};

/// CSS selectors describing where a marketplace puts each signal.
#[derive(Debug, Clone)]
pub struct ExtractorProfile {
    /// Promotional price, first non-empty match wins.
    pub promo_price: &'static [&'static str],
    /// Any price on the page, the lowest of all matches wins.
    pub general_price: &'static [&'static str],
    /// Element whose `content` attribute (or text) carries the price.
    pub price_element: &'static str,
    pub price_meta: &'static str,
    /// Struck-through price, tagged as previous/original by the markup.
    pub original_price: &'static [&'static str],
    /// Extra untagged locations considered for the original price.
    pub original_price_fallback: &'static [&'static str],
    pub discount: &'static [&'static str],
    pub name: &'static [&'static str],
    pub json_ld: &'static str,
}

impl ExtractorProfile {
    pub const fn mercado_livre() -> Self {
        Self {
            promo_price: &[
                ".ui-pdp-price__second-line .andes-money-amount__fraction",
                ".ui-pdp-price__second-line .andes-money-amount",
                ".ui-pdp-price--size-large .andes-money-amount__fraction",
                ".andes-money-amount--cents-superscript + .andes-money-amount__fraction",
            ],
            general_price: &[
                "[data-testid='price'] .andes-money-amount__fraction",
                ".ui-pdp-price__first-line .andes-money-amount__fraction",
                ".andes-money-amount__fraction",
                ".price-tag-fraction",
                "[data-testid='price']",
            ],
            price_element: "[data-testid='price']",
            price_meta: "meta[property='product:price:amount']",
            original_price: &[
                ".andes-money-amount--previous-price .andes-money-amount__fraction",
                ".andes-money-amount--previous-price",
                ".ui-pdp-price__original .andes-money-amount__fraction",
                ".ui-pdp-price__original",
                ".ui-pdp-price__first-line .andes-money-amount--previous-price .andes-money-amount__fraction",
                ".ui-pdp-price__first-line .andes-money-amount--previous-price",
            ],
            original_price_fallback: &[".ui-pdp-price__first-line .andes-money-amount__fraction"],
            discount: &[
                ".ui-pdp-price__second-line .andes-money-amount__discount",
                ".andes-money-amount__discount",
                ".ui-pdp-price__discount",
                "[class*='discount']",
                ".ui-pdp-price__discount--with-bg-color",
            ],
            name: &["h1.ui-pdp-title", "h1[data-testid='title']", ".ui-pdp-title", "h1"],
            json_ld: "script[type='application/ld+json']",
        }
    }
}

/// A profile with its selectors and patterns compiled once.
#[derive(Debug, Clone)]
pub struct Extractor {
    promo_price: Vec<Selector>,
    general_price: Vec<Selector>,
    price_element: Selector,
    price_meta: Selector,
    original_price: Vec<Selector>,
    original_price_fallback: Vec<Selector>,
    discount: Vec<Selector>,
    name: Vec<Selector>,
    json_ld: Selector,
    offers_price_re: Regex,
    bare_price_re: Regex,
    original_price_re: Regex,
    name_re: Regex,
    percent_re: Regex,
}

impl Extractor {
    pub fn new(profile: &ExtractorProfile) -> Result<Self> {
        Ok(Self {
            promo_price: compile_all(profile.promo_price)?,
            general_price: compile_all(profile.general_price)?,
            price_element: compile(profile.price_element)?,
            price_meta: compile(profile.price_meta)?,
            original_price: compile_all(profile.original_price)?,
            original_price_fallback: compile_all(profile.original_price_fallback)?,
            discount: compile_all(profile.discount)?,
            name: compile_all(profile.name)?,
            json_ld: compile(profile.json_ld)?,
            offers_price_re: pattern(r#""offers"[^}]*"price"\s*:\s*"?([0-9.]+)"?"#)?,
            bare_price_re: pattern(r#""price"\s*:\s*"?([0-9.]+)"?"#)?,
            original_price_re: pattern(r#""(?:listPrice|highPrice|originalPrice)"\s*:\s*"?([0-9.]+)"?"#)?,
            name_re: pattern(r#""name"\s*:\s*"([^"]+)""#)?,
            percent_re: pattern(r"(\d+(?:\.\d+)?)\s*%")?,
        })
    }

    pub fn mercado_livre() -> Result<Self> {
        Self::new(&ExtractorProfile::mercado_livre())
    }

    /// Reads one observation out of a page.
    ///
    /// Fails with `PriceNotFound` when no strategy locates a price and with
    /// `UnparsablePrice` when the located text is not a positive number.
    pub fn extract(&self, html: &str) -> Result<ExtractedObservation> {
        let document = Html::parse_document(html);

        let price_text = self.find_price_text(&document).ok_or(AppError::PriceNotFound)?;
        let price = normalize_price(&price_text)?;
        if price <= 0.0 {
            return Err(AppError::UnparsablePrice { text: price_text });
        }

        Ok(ExtractedObservation {
            price,
            original_price: self.extract_original_price(&document),
            discount_percent: self.extract_discount(&document),
            name: self.extract_name(&document),
        })
    }

    /// Product name alone, `UNNAMED_PRODUCT` when nothing matches.
    pub fn extract_name_from(&self, html: &str) -> String {
        self.extract_name(&Html::parse_document(html))
    }

    fn find_price_text(&self, document: &Html) -> Option<String> {
        // 1. promotional price
        if let Some(text) = first_text(document, &self.promo_price) {
            return Some(text);
        }

        // 2. every price on the page
        let candidates = all_texts(document, &self.general_price);
        let general = match candidates.len() {
            0 => None,
            1 => Some(candidates[0].clone()),
            _ => pick_lowest(&candidates).map(str::to_string),
        };
        if general.is_some() {
            return general;
        }

        // 3. attributes and meta tags
        let from_attribute = document.select(&self.price_element).find_map(|element| {
            element
                .value()
                .attr("content")
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
                .or_else(|| non_empty_text(element))
        });
        if from_attribute.is_some() {
            return from_attribute;
        }

        let from_meta = document.select(&self.price_meta).find_map(|element| {
            element
                .value()
                .attr("content")
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
        });
        if from_meta.is_some() {
            return from_meta;
        }

        // 4. structured data
        let scripts = self.json_ld_texts(document);
        first_capture(&scripts, &self.offers_price_re).or_else(|| first_capture(&scripts, &self.bare_price_re))
    }

    fn extract_original_price(&self, document: &Html) -> f64 {
        let text = first_text(document, &self.original_price)
            .or_else(|| {
                let mut candidates = all_texts(document, &self.original_price);
                candidates.extend(all_texts(document, &self.original_price_fallback));
                if candidates.len() > 1 {
                    pick_highest(&candidates).map(str::to_string)
                } else {
                    None
                }
            })
            .or_else(|| first_capture(&self.json_ld_texts(document), &self.original_price_re));

        text.and_then(|text| normalize_price(&text).ok())
            .filter(|value| *value > 0.0)
            .unwrap_or(0.0)
    }

    fn extract_discount(&self, document: &Html) -> f64 {
        let badge = self.discount.iter().find_map(|selector| {
            document
                .select(selector)
                .filter_map(non_empty_text)
                .find(|text| text.contains('%'))
        });

        badge
            .and_then(|text| {
                self.percent_re
                    .captures(&text)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok())
            })
            .filter(|value| *value > 0.0 && *value <= 100.0)
            .unwrap_or(0.0)
    }

    fn extract_name(&self, document: &Html) -> String {
        self.name
            .iter()
            .find_map(|selector| document.select(selector).next().and_then(non_empty_text))
            .or_else(|| first_capture(&self.json_ld_texts(document), &self.name_re))
            .unwrap_or_else(|| UNNAMED_PRODUCT.to_string())
    }

    fn json_ld_texts(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.json_ld)
            .map(|script| script.text().collect::<String>())
            .collect()
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::Parse {
        message: format!("Invalid CSS selector '{}': {:?}", selector, e),
    })
}

fn compile_all(selectors: &[&str]) -> Result<Vec<Selector>> {
    selectors.iter().map(|selector| compile(selector)).collect()
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| AppError::Parse {
        message: format!("Invalid pattern '{}': {}", re, e),
    })
}

fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|selector| document.select(selector).find_map(non_empty_text))
}

fn all_texts(document: &Html, selectors: &[Selector]) -> Vec<String> {
    selectors
        .iter()
        .flat_map(|selector| document.select(selector).filter_map(non_empty_text))
        .collect()
}

fn first_capture(texts: &[String], re: &Regex) -> Option<String> {
    texts.iter().find_map(|text| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
