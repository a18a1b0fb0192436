//! Deterministic altitude field and biome classification for the taiga world.
//!
//! The altitude field is classic permutation-table gradient noise layered
//! into fractal Brownian motion. Everything here is pure: the same seed and
//! coordinates always produce bit-identical output, which the simulation
//! relies on when it re-queries terrain for movement validity mid-tick.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors emitted when validating terrain configuration.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// Indicates configuration values that cannot be used (e.g., zero octaves).
    #[error("invalid terrain configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Terrain classification bucket keyed by altitude range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Ocean,
    Beach,
    Plains,
    Forest,
    Mountain,
    Snow,
}

/// Canonical altitude bands over the noise output range `[-1, 1]`.
///
/// Half-open `[lo, hi)` intervals, checked in declaration order; the first
/// match wins. Values outside every band (floating-point edge cases at the
/// extremes) fall back to `Ocean`.
const ALTITUDE_BANDS: [(Biome, f64, f64); 6] = [
    (Biome::Ocean, -1.0, -0.3),
    (Biome::Beach, -0.3, -0.2),
    (Biome::Plains, -0.2, 0.0),
    (Biome::Forest, 0.0, 0.2),
    (Biome::Mountain, 0.2, 0.4),
    (Biome::Snow, 0.4, 1.0),
];

impl Biome {
    /// Map an altitude value to its biome. Total over all of `f64`: anything
    /// that misses every declared band classifies as `Ocean`.
    #[must_use]
    pub fn classify(altitude: f64) -> Self {
        for (biome, lo, hi) in ALTITUDE_BANDS {
            if altitude >= lo && altitude < hi {
                return biome;
            }
        }
        Biome::Ocean
    }

    /// Water cells are impassable and unspawnable for every species.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Biome::Ocean)
    }

    /// Inverse of [`Biome::is_water`].
    #[must_use]
    pub const fn is_land(self) -> bool {
        !self.is_water()
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Biome::Ocean => "ocean",
            Biome::Beach => "beach",
            Biome::Plains => "plains",
            Biome::Forest => "forest",
            Biome::Mountain => "mountain",
            Biome::Snow => "snow",
        };
        f.write_str(name)
    }
}

/// Fractal sampling parameters for the altitude field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Frequency multiplier applied to normalized map coordinates.
    pub noise_scale: f64,
    /// Number of noise layers summed into the fractal.
    pub octaves: u32,
    /// Amplitude decay per octave.
    pub persistence: f64,
    /// Frequency growth per octave.
    pub lacunarity: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            noise_scale: 3.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl TerrainParams {
    /// Validates the parameter bundle.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(self.noise_scale > 0.0) {
            return Err(TerrainError::InvalidConfig("noise_scale must be positive"));
        }
        if self.octaves == 0 {
            return Err(TerrainError::InvalidConfig("octaves must be at least 1"));
        }
        if !(self.persistence > 0.0) || !self.persistence.is_finite() {
            return Err(TerrainError::InvalidConfig("persistence must be positive"));
        }
        if !(self.lacunarity >= 1.0) || !self.lacunarity.is_finite() {
            return Err(TerrainError::InvalidConfig("lacunarity must be at least 1"));
        }
        Ok(())
    }
}

/// Seeded gradient-noise lattice.
///
/// A 256-entry permutation table (doubled to avoid wrap-around indexing) is
/// shuffled once from the seed; sampling never mutates state.
pub struct NoiseField {
    perm: [u8; 512],
}

impl fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseField").finish_non_exhaustive()
    }
}

impl NoiseField {
    /// Build the permutation table from `seed` with a Fisher-Yates shuffle.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut p: [u8; 256] = [0; 256];
        for (i, slot) in p.iter_mut().enumerate() {
            *slot = i as u8;
        }
        for i in (1..256).rev() {
            let j = rng.random_range(0..=i);
            p.swap(i, j);
        }
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = p[i & 255];
        }
        Self { perm }
    }

    /// Quintic fade curve.
    fn fade(t: f64) -> f64 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + t * (b - a)
    }

    /// Diagonal gradient set; dot products over the unit cell keep the
    /// single-octave output inside `[-1, 1]`.
    fn grad(hash: u8, x: f64, y: f64) -> f64 {
        match hash & 3 {
            0 => x + y,
            1 => -x + y,
            2 => x - y,
            _ => -x - y,
        }
    }

    fn hash(&self, x: usize, y: usize) -> u8 {
        self.perm[x + usize::from(self.perm[y])]
    }

    /// Sample one octave of gradient noise at `(x, y)`.
    ///
    /// Lattice coordinates wrap modulo `period`, so the field tiles
    /// seamlessly across the map edges.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64, period: (u32, u32)) -> f64 {
        let period_x = i64::from(period.0.max(1));
        let period_y = i64::from(period.1.max(1));

        let xf = x.floor();
        let yf = y.floor();
        let xi = xf as i64;
        let yi = yf as i64;
        let dx = x - xf;
        let dy = y - yf;

        let wrap = |v: i64, p: i64| (v.rem_euclid(p) & 255) as usize;
        let x0 = wrap(xi, period_x);
        let x1 = wrap(xi + 1, period_x);
        let y0 = wrap(yi, period_y);
        let y1 = wrap(yi + 1, period_y);

        let g00 = self.hash(x0, y0);
        let g10 = self.hash(x1, y0);
        let g01 = self.hash(x0, y1);
        let g11 = self.hash(x1, y1);

        let n00 = Self::grad(g00, dx, dy);
        let n10 = Self::grad(g10, dx - 1.0, dy);
        let n01 = Self::grad(g01, dx, dy - 1.0);
        let n11 = Self::grad(g11, dx - 1.0, dy - 1.0);

        let u = Self::fade(dx);
        let v = Self::fade(dy);
        Self::lerp(Self::lerp(n00, n10, u), Self::lerp(n01, n11, u), v)
    }

    /// Fractal Brownian motion: `octaves` layers summed with `persistence`
    /// amplitude decay and `lacunarity` frequency growth, normalized back
    /// into `[-1, 1]` by the total amplitude.
    #[must_use]
    pub fn fbm(&self, x: f64, y: f64, params: &TerrainParams, period: (u32, u32)) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..params.octaves {
            let octave_period = (
                scale_period(period.0, frequency),
                scale_period(period.1, frequency),
            );
            value += amplitude * self.sample(x * frequency, y * frequency, octave_period);
            max_amplitude += amplitude;
            amplitude *= params.persistence;
            frequency *= params.lacunarity;
        }

        (value / max_amplitude).clamp(-1.0, 1.0)
    }
}

/// Grow the lattice period with octave frequency so wrap seams stay aligned.
fn scale_period(period: u32, frequency: f64) -> u32 {
    let scaled = (f64::from(period) * frequency).round();
    if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (scaled as u32).max(1)
    }
}

/// Pure altitude/biome oracle for one map.
///
/// Pixel coordinates are normalized to `(x/W - 0.5, y/H - 0.5)` and scaled by
/// `noise_scale` before sampling, with the lattice period tied to the map's
/// pixel dimensions.
#[derive(Debug)]
pub struct TerrainGenerator {
    params: TerrainParams,
    width: u32,
    height: u32,
    seed: u64,
    noise: NoiseField,
}

impl TerrainGenerator {
    /// Build a generator for a `width x height` pixel map.
    pub fn new(
        seed: u64,
        width: u32,
        height: u32,
        params: TerrainParams,
    ) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidConfig(
                "map dimensions must be non-zero",
            ));
        }
        params.validate()?;
        Ok(Self {
            noise: NoiseField::new(seed),
            params,
            width,
            height,
            seed,
        })
    }

    /// Altitude at pixel `(x, y)`, in `[-1, 1]`. Deterministic in
    /// `(seed, x, y)`.
    #[must_use]
    pub fn altitude(&self, x: u32, y: u32) -> f64 {
        let nx = (f64::from(x) / f64::from(self.width) - 0.5) * self.params.noise_scale;
        let ny = (f64::from(y) / f64::from(self.height) - 0.5) * self.params.noise_scale;
        self.noise.fbm(nx, ny, &self.params, (self.width, self.height))
    }

    /// Biome at pixel `(x, y)`.
    #[must_use]
    pub fn biome(&self, x: u32, y: u32) -> Biome {
        Biome::classify(self.altitude(x, y))
    }

    /// Whether pixel `(x, y)` is standable terrain.
    #[must_use]
    pub fn is_land(&self, x: u32, y: u32) -> bool {
        self.biome(x, y).is_land()
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn params(&self) -> &TerrainParams {
        &self.params
    }
}
