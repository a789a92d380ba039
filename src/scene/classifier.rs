use crate::readers::Raster;

/// Classification bits of the flag raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelFlags(pub u32);

impl PixelFlags {
    pub const INVALID: u32 = 1 << 0;
    pub const CLOUD: u32 = 1 << 1;
    pub const OCEAN: u32 = 1 << 2;

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn is_invalid(&self) -> bool {
        self.contains(Self::INVALID)
    }

    pub fn is_cloud(&self) -> bool {
        self.contains(Self::CLOUD)
    }

    pub fn is_ocean(&self) -> bool {
        self.contains(Self::OCEAN)
    }
}

/// Land, water and cloud classification of scene pixels.
pub trait PixelClassifier: Sync {
    fn flags(&self, x: usize, y: usize) -> PixelFlags;
}

/// Classifier backed by a flag raster; NaN or negative samples are flagged invalid.
#[derive(Debug, Clone)]
pub struct FlagRaster {
    raster: Raster,
}

impl FlagRaster {
    pub fn new(raster: Raster) -> Self {
        Self { raster }
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }
}

impl PixelClassifier for FlagRaster {
    fn flags(&self, x: usize, y: usize) -> PixelFlags {
        let sample = self.raster.get(x, y);
        if sample.is_nan() || sample < 0.0 {
            return PixelFlags(PixelFlags::INVALID);
        }
        PixelFlags(sample as u32)
    }
}
