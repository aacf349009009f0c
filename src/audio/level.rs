use serde::{Deserialize, Serialize};

/// Full-scale peak reading from a 16-bit recorder
pub const MAX_AMPLITUDE: i16 = i16::MAX;

/// Narrowest level bar, in display units
pub const MIN_WIDTH: u32 = 50;

/// Widest level bar, in display units
pub const MAX_WIDTH: u32 = 300;

const MID_BREAKPOINT: f32 = 0.4;
const HIGH_BREAKPOINT: f32 = 0.7;
const GLOW_THRESHOLD: f32 = 0.5;
const MAX_GLOW_ALPHA: f32 = 150.0;

const RED: Rgb = Rgb::new(0xFF, 0x57, 0x22);
const YELLOW: Rgb = Rgb::new(0xFF, 0xC1, 0x07);
const GREEN: Rgb = Rgb::new(0x4C, 0xAF, 0x50);

/// Loudness band used to pick the level color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelBand {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend toward `other`; `ratio` 0.0 keeps `self`, 1.0 gives `other`
    pub fn blend(self, other: Rgb, ratio: f32) -> Rgb {
        let ratio = ratio.clamp(0.0, 1.0);
        let inverse = 1.0 - ratio;
        let mix = |a: u8, b: u8| (a as f32 * inverse + b as f32 * ratio).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// `#RRGGBB`
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// One amplitude reading and everything the level meter derives from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeSample {
    /// Raw peak as reported by the device
    pub raw: i16,
    /// `raw / 32767`, clamped to `[0, 1]`
    pub normalized: f32,
    /// Bar width in display units, `[MIN_WIDTH, MAX_WIDTH]`
    pub width: u32,
    pub band: LevelBand,
    pub color: Rgb,
    /// Outline alpha for loud input, `None` below the glow threshold
    pub glow_alpha: Option<u8>,
}

impl AmplitudeSample {
    pub fn from_raw(raw: i16) -> Self {
        let normalized = normalize(raw);

        let span = (MAX_WIDTH - MIN_WIDTH) as f32;
        let width = (MIN_WIDTH as f32 + normalized * span) as u32;
        let width = width.clamp(MIN_WIDTH, MAX_WIDTH);

        let band = if normalized < MID_BREAKPOINT {
            LevelBand::Low
        } else if normalized < HIGH_BREAKPOINT {
            LevelBand::Mid
        } else {
            LevelBand::High
        };

        let color = match band {
            LevelBand::Low => RED,
            LevelBand::Mid => RED.blend(YELLOW, (normalized - MID_BREAKPOINT) / 0.3),
            LevelBand::High => YELLOW.blend(GREEN, (normalized - HIGH_BREAKPOINT) / 0.3),
        };

        let glow_alpha = (normalized > GLOW_THRESHOLD)
            .then(|| ((normalized - GLOW_THRESHOLD) * 2.0 * MAX_GLOW_ALPHA) as u8);

        Self {
            raw,
            normalized,
            width,
            band,
            color,
            glow_alpha,
        }
    }
}

/// Map a raw peak onto `[0, 1]`; negative readings count as silence
pub fn normalize(raw: i16) -> f32 {
    let raw = raw.max(0);
    (raw as f32 / MAX_AMPLITUDE as f32).clamp(0.0, 1.0)
}
