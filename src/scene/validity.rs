use crate::scene::classifier::PixelClassifier;

/// Decides whether a pixel takes part in the retrieval.
pub trait PixelValidity: Sync {
    fn is_valid(&self, x: usize, y: usize) -> bool;
}

/// Clear land only: not invalid, not cloudy, not ocean.
pub struct ClearLand<'a> {
    classifier: &'a dyn PixelClassifier,
}

impl<'a> ClearLand<'a> {
    pub fn new(classifier: &'a dyn PixelClassifier) -> Self {
        Self { classifier }
    }
}

impl PixelValidity for ClearLand<'_> {
    fn is_valid(&self, x: usize, y: usize) -> bool {
        let flags = self.classifier.flags(x, y);
        !flags.is_cloud() && !flags.is_invalid() && !flags.is_ocean()
    }
}

/// Clear land and water: not invalid, not cloudy.
pub struct ClearLandAndWater<'a> {
    classifier: &'a dyn PixelClassifier,
}

impl<'a> ClearLandAndWater<'a> {
    pub fn new(classifier: &'a dyn PixelClassifier) -> Self {
        Self { classifier }
    }
}

impl PixelValidity for ClearLandAndWater<'_> {
    fn is_valid(&self, x: usize, y: usize) -> bool {
        let flags = self.classifier.flags(x, y);
        !flags.is_cloud() && !flags.is_invalid()
    }
}

/// Picks the validity strategy for the processing mode.
pub fn validity_strategy<'a>(
    classifier: &'a dyn PixelClassifier,
    compute_over_water: bool,
) -> Box<dyn PixelValidity + 'a> {
    if compute_over_water {
        Box::new(ClearLandAndWater::new(classifier))
    } else {
        Box::new(ClearLand::new(classifier))
    }
}
