use crate::foundation::math::mul_div255_u8;

/// One CSS-style filter function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    /// Multiply color channels by the factor.
    Brightness(f64),
    /// Blend towards luma by the amount in `[0, 1]`.
    Grayscale(f64),
    /// Blend towards the inverted color by the amount in `[0, 1]`.
    Invert(f64),
    /// Multiply every channel, alpha included, by the amount in `[0, 1]`.
    Opacity(f64),
}

/// Pixel filter chain parsed from a CSS `filter` value such as `"brightness(1.2) grayscale(50%)"`.
///
/// Unknown functions are skipped; `"none"` and the empty string parse to the identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    ops: Vec<FilterOp>,
}

impl Filter {
    /// Parse a filter list.
    pub fn parse(s: &str) -> Self {
        let mut ops = Vec::new();
        let mut rest = s.trim();
        if rest.eq_ignore_ascii_case("none") {
            return Self::default();
        }
        while let Some(open) = rest.find('(') {
            let Some(close) = rest[open..].find(')').map(|c| open + c) else {
                break;
            };
            let name = rest[..open].trim().to_ascii_lowercase();
            let arg = rest[open + 1..close].trim();
            match (name.as_str(), parse_amount(arg)) {
                ("brightness", Some(v)) => ops.push(FilterOp::Brightness(v.max(0.0))),
                ("grayscale", Some(v)) => ops.push(FilterOp::Grayscale(v.clamp(0.0, 1.0))),
                ("invert", Some(v)) => ops.push(FilterOp::Invert(v.clamp(0.0, 1.0))),
                ("opacity", Some(v)) => ops.push(FilterOp::Opacity(v.clamp(0.0, 1.0))),
                _ => tracing::debug!(function = %name, %arg, "ignoring unsupported filter function"),
            }
            rest = &rest[close + 1..];
        }
        Self { ops }
    }

    /// Filter functions in application order.
    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    /// `true` when applying the filter changes nothing.
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply in place to premultiplied RGBA8 pixels.
    pub(crate) fn apply_premul(&self, rgba: &mut [u8]) {
        for op in &self.ops {
            match *op {
                FilterOp::Brightness(k) => {
                    for px in rgba.chunks_exact_mut(4) {
                        let a = f64::from(px[3]);
                        for c in px.iter_mut().take(3) {
                            *c = (f64::from(*c) * k).round().min(a) as u8;
                        }
                    }
                }
                FilterOp::Grayscale(t) => {
                    for px in rgba.chunks_exact_mut(4) {
                        let luma = 0.2126 * f64::from(px[0])
                            + 0.7152 * f64::from(px[1])
                            + 0.0722 * f64::from(px[2]);
                        for c in px.iter_mut().take(3) {
                            let v = f64::from(*c);
                            *c = (v + (luma - v) * t).round().clamp(0.0, 255.0) as u8;
                        }
                    }
                }
                FilterOp::Invert(t) => {
                    for px in rgba.chunks_exact_mut(4) {
                        let a = f64::from(px[3]);
                        for c in px.iter_mut().take(3) {
                            let v = f64::from(*c);
                            *c = (v + ((a - v) - v) * t).round().clamp(0.0, a) as u8;
                        }
                    }
                }
                FilterOp::Opacity(t) => {
                    let op = (t * 255.0).round() as u16;
                    for c in rgba.iter_mut() {
                        *c = mul_div255_u8(u16::from(*c), op);
                    }
                }
            }
        }
    }
}

fn parse_amount(arg: &str) -> Option<f64> {
    match arg.strip_suffix('%') {
        Some(p) => p.trim().parse::<f64>().ok().map(|v| v / 100.0),
        None => arg.parse::<f64>().ok(),
    }
    .filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/render/filter.rs"]
mod tests;
