use rand::Rng;

/// Errors raised while building an initial-state buffer.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("seed dimensions are out of range, got {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },
    #[error("live cell count must be non-negative, got {0}")]
    NegativeCount(i64),
    #[error("requested {requested} live cells but the target only holds {cells}")]
    CountExceedsCells { requested: i64, cells: i64 },
    #[error("live fraction must lie in [0, 1], got {0}")]
    InvalidFraction(f32),
}

/// CPU-side initial contents for one channel: one RGBA32F record per
/// logical cell, row-major.
///
/// A "live" record carries pseudo-random components in `[0, 1)` with the
/// alpha component fixed to 1.0 as the active marker; a blank record is
/// all zeroes. The random source is not seedable, so callers (and tests)
/// must treat exact values as opaque and rely on structural properties.
#[derive(Debug, Clone)]
pub struct SeedBuffer {
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
}

impl SeedBuffer {
    /// All-zero contents for derived channels (cell overlay, deposit
    /// trail).
    pub fn blank(width: i64, height: i64) -> Result<Self, SeedError> {
        let (width, height) = validate_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            texels: vec![[0.0; 4]; width as usize * height as usize],
        })
    }

    /// Sparse random contents with exactly `live` active records spread
    /// uniformly over the grid.
    pub fn scatter(width: i64, height: i64, live: i64) -> Result<Self, SeedError> {
        let mut buffer = Self::blank(width, height)?;
        if live < 0 {
            return Err(SeedError::NegativeCount(live));
        }
        let cells = buffer.texels.len() as i64;
        if live > cells {
            return Err(SeedError::CountExceedsCells {
                requested: live,
                cells,
            });
        }

        // Partial Fisher-Yates over cell indices: the first `live` picks
        // are a uniform sample without replacement.
        let mut rng = rand::thread_rng();
        let mut indices: Vec<usize> = (0..buffer.texels.len()).collect();
        for slot in 0..live as usize {
            let pick = rng.gen_range(slot..indices.len());
            indices.swap(slot, pick);
            buffer.texels[indices[slot]] = [rng.gen(), rng.gen(), rng.gen(), 1.0];
        }
        Ok(buffer)
    }

    /// Like [`SeedBuffer::scatter`], with the live count expressed as a
    /// fraction of the total cell count.
    pub fn scatter_fraction(width: i64, height: i64, fraction: f32) -> Result<Self, SeedError> {
        if !(0.0..=1.0).contains(&fraction) || !fraction.is_finite() {
            return Err(SeedError::InvalidFraction(fraction));
        }
        let (w, h) = validate_dimensions(width, height)?;
        let live = ((w as u64 * h as u64) as f64 * fraction as f64).round() as i64;
        Self::scatter(width, height, live)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Number of active (non-blank) records.
    pub fn live_cells(&self) -> usize {
        self.texels.iter().filter(|texel| texel[3] != 0.0).count()
    }

    /// Raw byte view for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

fn validate_dimensions(width: i64, height: i64) -> Result<(u32, u32), SeedError> {
    if width < 0 || height < 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
        return Err(SeedError::InvalidDimensions { width, height });
    }
    // The texel count itself must fit u32, matching what a texture (and
    // a point-per-cell draw) can address.
    if width as u64 * height as u64 > u32::MAX as u64 {
        return Err(SeedError::InvalidDimensions { width, height });
    }
    Ok((width as u32, height as u32))
}
