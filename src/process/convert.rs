use crate::element::Element;
use crate::error::ConversionError;
use crate::process::utils::{clean_str, round2};

/// Convert a raw GHCN reading into standard units.
///
/// | element                 | raw unit      | result              |
/// |-------------------------|---------------|---------------------|
/// | TMAX, TMIN, TOBS, TAVG  | tenths of °C  | °F, 2 decimals      |
/// | PRCP                    | tenths of mm  | inches, 2 decimals  |
/// | SNOW, SNWD              | mm            | inches, 2 decimals  |
/// | anything else           | -             | unchanged           |
///
/// An empty reading converts to `0.0`.
pub fn convert(element: &Element, raw: &str) -> Result<f64, ConversionError> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    let v: f64 = cleaned.parse().map_err(|_| ConversionError {
        element: element.clone(),
        raw: raw.to_string(),
    })?;
    if !v.is_finite() {
        return Err(ConversionError {
            element: element.clone(),
            raw: raw.to_string(),
        });
    }

    Ok(match element {
        Element::Tmax | Element::Tmin | Element::Tobs | Element::Tavg => {
            round2((v / 10.0) * 1.8 + 32.0)
        }
        Element::Prcp => round2(v / 254.0),
        Element::Snow | Element::Snwd => round2(v / 25.4),
        _ => v,
    })
}
