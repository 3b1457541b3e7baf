// THEORY (Pixel & Screen Color):
// The `pixel` module holds the two smallest units of the engine.
//
// - `Pixel` is a "dumb" RGBA container read straight out of a camera frame. Its
//   only heuristic is luminance (Rec. 601), the single number every later stage
//   of the detector works with.
// - `Rgb` is what a screen is told to display. It knows how far it is from
//   another color (Manhattan distance, used to suppress redundant sends), how to
//   dim itself by a global brightness factor, and how to parse the hex and named
//   colors the illumination channel accepts.
//
// Single-value scope: nothing here looks at neighbors in space or time.

pub mod pixel {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;

    pub type Channel = u8;
    pub type Luminance = f64;
    pub type ColorDistance = u32;

    pub const CHANNELS: usize = 4;

    /// A single RGBA pixel from a camera frame or animation canvas.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Self {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Perceived brightness as the Rec. 601 weighted sum of R, G and B.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64
                + 0.587_f64 * self.green as f64
                + 0.114_f64 * self.blue as f64
        }
    }

    impl From<&[u8]> for Pixel {
        /// Reads the first four bytes as R, G, B, A. Missing bytes read as zero.
        fn from(bytes: &[u8]) -> Self {
            let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
            Pixel::new(at(0), at(1), at(2), at(3))
        }
    }

    /// The color a screen displays.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Rgb {
        pub r: Channel,
        pub g: Channel,
        pub b: Channel,
    }

    impl Rgb {
        pub const BLACK: Rgb = Rgb::new(0, 0, 0);
        pub const WHITE: Rgb = Rgb::new(255, 255, 255);

        pub const fn new(r: Channel, g: Channel, b: Channel) -> Self {
            Self { r, g, b }
        }

        /// Scales every channel by `brightness` and rounds to the nearest integer.
        pub fn scaled(self, brightness: f32) -> Rgb {
            let scale = |c: Channel| (c as f32 * brightness).round().clamp(0.0, 255.0) as Channel;
            Rgb::new(scale(self.r), scale(self.g), scale(self.b))
        }
    }

    impl From<Pixel> for Rgb {
        fn from(p: Pixel) -> Self {
            Rgb::new(p.red, p.green, p.blue)
        }
    }

    /// Manhattan distance between two colors. Symmetric, zero only for equal colors.
    pub fn color_diff(a: Rgb, b: Rgb) -> ColorDistance {
        a.r.abs_diff(b.r) as ColorDistance
            + a.g.abs_diff(b.g) as ColorDistance
            + a.b.abs_diff(b.b) as ColorDistance
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ParseColorError(pub String);

    impl fmt::Display for ParseColorError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "unrecognised color `{}`", self.0)
        }
    }

    impl std::error::Error for ParseColorError {}

    const NAMED_COLORS: &[(&str, Rgb)] = &[
        ("black", Rgb::new(0, 0, 0)),
        ("white", Rgb::new(255, 255, 255)),
        ("red", Rgb::new(255, 0, 0)),
        ("lime", Rgb::new(0, 255, 0)),
        ("green", Rgb::new(0, 128, 0)),
        ("blue", Rgb::new(0, 0, 255)),
        ("yellow", Rgb::new(255, 255, 0)),
        ("cyan", Rgb::new(0, 255, 255)),
        ("magenta", Rgb::new(255, 0, 255)),
        ("orange", Rgb::new(255, 165, 0)),
        ("purple", Rgb::new(128, 0, 128)),
        ("gray", Rgb::new(128, 128, 128)),
    ];

    impl FromStr for Rgb {
        type Err = ParseColorError;

        /// Accepts `#rgb`, `#rrggbb`, or a basic CSS color name (case-insensitive).
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let trimmed = s.trim();
            let err = || ParseColorError(s.to_string());

            if let Some(hex) = trimmed.strip_prefix('#') {
                if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(err());
                }
                return match hex.len() {
                    3 => {
                        let digit = |i: usize| {
                            u8::from_str_radix(&hex[i..i + 1], 16)
                                .map(|v| v * 17)
                                .map_err(|_| err())
                        };
                        Ok(Rgb::new(digit(0)?, digit(1)?, digit(2)?))
                    }
                    6 => {
                        let byte = |i: usize| {
                            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err())
                        };
                        Ok(Rgb::new(byte(0)?, byte(2)?, byte(4)?))
                    }
                    _ => Err(err()),
                };
            }

            let lower = trimmed.to_ascii_lowercase();
            NAMED_COLORS
                .iter()
                .find(|(name, _)| *name == lower)
                .map(|(_, rgb)| *rgb)
                .ok_or_else(err)
        }
    }

    impl fmt::Display for Rgb {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }
}
