// src/element.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GHCN element code: what a single observation measures.
///
/// Known codes get their own variant so unit conversion can match on them;
/// anything else is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Element {
    /// Snowfall
    Snow,
    /// Snow depth
    Snwd,
    /// Water equivalent of snow on the ground
    Wesd,
    /// Water equivalent of snowfall
    Wesf,
    /// Precipitation
    Prcp,
    Tmax,
    Tmin,
    Tavg,
    /// Temperature at observation time
    Tobs,
    Other(String),
}

impl Element {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "SNOW" => Element::Snow,
            "SNWD" => Element::Snwd,
            "WESD" => Element::Wesd,
            "WESF" => Element::Wesf,
            "PRCP" => Element::Prcp,
            "TMAX" => Element::Tmax,
            "TMIN" => Element::Tmin,
            "TAVG" => Element::Tavg,
            "TOBS" => Element::Tobs,
            other => Element::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Element::Snow => "SNOW",
            Element::Snwd => "SNWD",
            Element::Wesd => "WESD",
            Element::Wesf => "WESF",
            Element::Prcp => "PRCP",
            Element::Tmax => "TMAX",
            Element::Tmin => "TMIN",
            Element::Tavg => "TAVG",
            Element::Tobs => "TOBS",
            Element::Other(code) => code,
        }
    }

    /// Snow-pack elements whose empty readings mean "nothing fell / nothing on the ground".
    pub fn fills_zero(&self) -> bool {
        matches!(
            self,
            Element::Snow | Element::Snwd | Element::Wesd | Element::Wesf
        )
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::parse(&s)
    }
}

impl From<Element> for String {
    fn from(e: Element) -> Self {
        e.as_str().to_string()
    }
}

/// The ordered, de-duplicated set of elements a run pivots into columns.
/// Order is the configured order and fixes the output column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSet(Vec<Element>);

impl ElementSet {
    pub fn new<I: IntoIterator<Item = Element>>(elements: I) -> Self {
        let mut out: Vec<Element> = Vec::new();
        for e in elements {
            if !out.contains(&e) {
                out.push(e);
            }
        }
        ElementSet(out)
    }

    pub fn contains(&self, element: &Element) -> bool {
        self.0.contains(element)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ElementSet {
    /// The element list the yearly batch job has always pivoted.
    fn default() -> Self {
        ElementSet::new([
            Element::Tmax,
            Element::Tmin,
            Element::Prcp,
            Element::Snow,
            Element::Snwd,
        ])
    }
}
