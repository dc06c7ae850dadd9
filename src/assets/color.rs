use crate::foundation::math::unit_to_u8;

/// Straight-alpha color with unit-range channels, parsed from CSS-style color strings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColorDef {
    pub(crate) r: f64,
    pub(crate) g: f64,
    pub(crate) b: f64,
    pub(crate) a: f64,
}

impl ColorDef {
    pub(crate) const BLACK: ColorDef = ColorDef::rgba(0.0, 0.0, 0.0, 1.0);

    pub(crate) const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()/rgba()`, `hsl()/hsla()` or a named
    /// color. Returns `None` for anything else so callers can keep their current color.
    pub(crate) fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.starts_with('#') {
            return parse_hex(s).ok();
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = func_args(&lower, "rgba").or_else(|| func_args(&lower, "rgb")) {
            return parse_rgb_args(&args);
        }
        if let Some(args) = func_args(&lower, "hsla").or_else(|| func_args(&lower, "hsl")) {
            return parse_hsl_args(&args);
        }
        named(&lower)
    }

    /// Straight-alpha RGBA8.
    pub(crate) fn to_rgba8(self) -> [u8; 4] {
        [
            unit_to_u8(self.r),
            unit_to_u8(self.g),
            unit_to_u8(self.b),
            unit_to_u8(self.a),
        ]
    }
}

fn func_args(s: &str, name: &str) -> Option<Vec<String>> {
    let inner = s.strip_prefix(name)?.trim_start().strip_prefix('(')?;
    let inner = inner.strip_suffix(')')?;
    Some(
        inner
            .split([',', ' ', '/'])
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

fn parse_channel(tok: &str) -> Option<f64> {
    match tok.strip_suffix('%') {
        Some(p) => p.parse::<f64>().ok().map(|v| v / 100.0),
        None => tok.parse::<f64>().ok().map(|v| v / 255.0),
    }
}

fn parse_alpha(tok: &str) -> Option<f64> {
    match tok.strip_suffix('%') {
        Some(p) => p.parse::<f64>().ok().map(|v| v / 100.0),
        None => tok.parse::<f64>().ok(),
    }
}

fn parse_rgb_args(args: &[String]) -> Option<ColorDef> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let r = parse_channel(&args[0])?;
    let g = parse_channel(&args[1])?;
    let b = parse_channel(&args[2])?;
    let a = match args.get(3) {
        Some(t) => parse_alpha(t)?,
        None => 1.0,
    };
    Some(ColorDef::rgba(r, g, b, a))
}

fn parse_hsl_args(args: &[String]) -> Option<ColorDef> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let h = args[0].trim_end_matches("deg").parse::<f64>().ok()?;
    let s = args[1].strip_suffix('%')?.parse::<f64>().ok()? / 100.0;
    let l = args[2].strip_suffix('%')?.parse::<f64>().ok()? / 100.0;
    let a = match args.get(3) {
        Some(t) => parse_alpha(t)?,
        None => 1.0,
    };
    Some(hsla_to_rgba(h, s, l, a))
}

fn parse_hex(s: &str) -> Result<ColorDef, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    fn hex_nibble(c: &str) -> Result<u8, String> {
        let v = hex_byte(c)?;
        Ok(v * 17)
    }

    if !s.is_ascii() {
        return Err("hex color must be ascii".to_owned());
    }

    let (r, g, b, a) = match s.len() {
        3 => (
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
            255,
        ),
        4 => (
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
            hex_nibble(&s[3..4])?,
        ),
        6 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ),
        8 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ),
        _ => {
            return Err("hex color must be #RGB, #RGBA, #RRGGBB or #RRGGBBAA".to_owned());
        }
    };

    Ok(ColorDef::rgba(
        (r as f64) / 255.0,
        (g as f64) / 255.0,
        (b as f64) / 255.0,
        (a as f64) / 255.0,
    ))
}

fn named(s: &str) -> Option<ColorDef> {
    let rgb = |r: u8, g: u8, b: u8| {
        Some(ColorDef::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            1.0,
        ))
    };
    match s {
        "transparent" => Some(ColorDef::rgba(0.0, 0.0, 0.0, 0.0)),
        "black" => rgb(0, 0, 0),
        "white" => rgb(255, 255, 255),
        "red" => rgb(255, 0, 0),
        "green" => rgb(0, 128, 0),
        "lime" => rgb(0, 255, 0),
        "blue" => rgb(0, 0, 255),
        "yellow" => rgb(255, 255, 0),
        "orange" => rgb(255, 165, 0),
        "purple" => rgb(128, 0, 128),
        "cyan" | "aqua" => rgb(0, 255, 255),
        "magenta" | "fuchsia" => rgb(255, 0, 255),
        "gray" | "grey" => rgb(128, 128, 128),
        "silver" => rgb(192, 192, 192),
        "gold" => rgb(255, 215, 0),
        "brown" => rgb(165, 42, 42),
        "pink" => rgb(255, 192, 203),
        "navy" => rgb(0, 0, 128),
        "teal" => rgb(0, 128, 128),
        _ => None,
    }
}

fn hsla_to_rgba(h: f64, s: f64, l: f64, a: f64) -> ColorDef {
    // Standard HSL -> RGB conversion (sRGB space, normalized 0..1 inputs).
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return ColorDef::rgba(l, l, l, a);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);
    ColorDef::rgba(r, g, b, a)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/color.rs"]
mod tests;
