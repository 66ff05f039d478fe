use fixed::types::I32F32;

const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn from_mm(value: f32) -> Pt {
        Pt::from_f32(value * PT_PER_MM)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_mm(self) -> f32 {
        self.to_f32() / PT_PER_MM
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    fn from_milli_i64(milli: i64) -> Pt {
        Pt::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Pt {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    /// ISO A4 portrait, 210 x 297 mm.
    pub fn a4() -> Self {
        Self::from_mm(210.0, 297.0)
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width: Pt::from_mm(width_mm),
            height: Pt::from_mm(height_mm),
        }
    }
}

/// Axis-aligned box in millimetres, top-left origin.
///
/// Conversion to points happens once, at the canvas boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn inset(&self, amount: f32) -> Rect {
        let width = (self.width - amount * 2.0).max(0.0);
        let height = (self.height - amount * 2.0).max(0.0);
        Rect::new(self.x + amount, self.y + amount, width, height)
    }

    /// Largest box with the given aspect ratio that fits inside `self`, centred.
    pub fn fit_centered(&self, content_width: f32, content_height: f32) -> Rect {
        if content_width <= 0.0 || content_height <= 0.0 {
            return *self;
        }
        let scale = (self.width / content_width).min(self.height / content_height);
        let width = content_width * scale;
        let height = content_height * scale;
        Rect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_matches_postscript_points() {
        let size = Size::a4();
        assert!((size.width.to_f32() - 595.28).abs() < 0.01);
        assert!((size.height.to_f32() - 841.89).abs() < 0.01);
    }

    #[test]
    fn millimetres_round_trip_through_points() {
        let pt = Pt::from_mm(8.0);
        assert!((pt.to_mm() - 8.0).abs() < 0.001);
    }

    #[test]
    fn fit_centered_preserves_aspect_ratio() {
        let slot = Rect::new(10.0, 20.0, 100.0, 50.0);
        let fitted = slot.fit_centered(400.0, 400.0);
        assert!((fitted.width - 50.0).abs() < 1e-4);
        assert!((fitted.height - 50.0).abs() < 1e-4);
        assert!((fitted.x - 35.0).abs() < 1e-4);
        assert!((fitted.y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn inset_never_goes_negative() {
        let rect = Rect::new(0.0, 0.0, 2.0, 2.0).inset(5.0);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
    }
}
