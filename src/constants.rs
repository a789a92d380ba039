//! Retrieval constants
//!
//! Fixed tables and thresholds used by the visibility, aerosol and water vapour
//! retrieval. Spectral tables follow the band order of [`crate::sat_bands`].

use crate::sat_bands::NUM_BANDS;

/// Number of pixels in one reference pixel set
pub const NUM_REF_PIXELS: usize = 5;

/// Number of vegetation endmembers tried by the refinement
pub const NUM_VEG_ENDMEMBERS: usize = 3;

/// Vegetation endmember reflectance spectra (dense canopy, mixed canopy, sparse canopy)
pub const RHO_VEG: [[f64; NUM_BANDS]; NUM_VEG_ENDMEMBERS] = [
    [
        0.030, 0.035, 0.040, 0.050, 0.090, 0.060, 0.040, 0.035, 0.150, 0.380, 0.400, 0.420,
        0.450, 0.460, 0.460,
    ],
    [
        0.035, 0.040, 0.045, 0.055, 0.085, 0.065, 0.050, 0.045, 0.130, 0.300, 0.310, 0.320,
        0.350, 0.355, 0.360,
    ],
    [
        0.040, 0.045, 0.055, 0.065, 0.090, 0.080, 0.070, 0.065, 0.120, 0.240, 0.250, 0.260,
        0.280, 0.285, 0.290,
    ],
];

/// Bare soil reflectance spectrum
pub const RHO_SOIL: [f64; NUM_BANDS] = [
    0.080, 0.090, 0.110, 0.120, 0.150, 0.190, 0.210, 0.215, 0.225, 0.240, 0.245, 0.250, 0.270,
    0.275, 0.280,
];

/// Relative weight of each pixel of a reference set in the TOA merit function
pub const REF_PIXEL_WEIGHTS: [f64; NUM_REF_PIXELS] = [2.0, 2.0, 1.5, 1.5, 1.0];

/// NDVI strata used to pick reference pixels, lower bound inclusive
pub const NDVI_HIGH: (f64, f64) = (0.4, 0.9);
pub const NDVI_MEDIUM: (f64, f64) = (0.15, 0.4);
pub const NDVI_LOW: (f64, f64) = (0.09, 0.15);

/// Relative tolerance around the cell mean elevation for reference pixels
pub const ELEVATION_TOLERANCE: f64 = 0.2;

/// Relative tolerance around the cell mean cos(sza) for reference pixels
pub const COS_SZA_TOLERANCE: f64 = 0.1;

/// Coarse then fine step of the visibility bracketing search [km]
pub const VISIBILITY_STEPS: [f64; 2] = [1.0, 0.1];

/// Default water vapour column [g cm-2]
pub const WV_INIT: f64 = 2.0;

/// Visibility used for the first-guess reflectance of the water vapour bands [km]
pub const VIS_INIT: f64 = 23.0;

/// Fractional tolerance of the Powell minimization
pub const POWELL_FTOL: f64 = 1.0e-4;

/// Merit function value returned for physically meaningless parameter vectors
pub const MERIT_PENALTY: f64 = 5.0e8;

/// A reference pixel whose residual exceeds this multiple of the mean is rejected
pub const OUTLIER_FACTOR: f64 = 2.0;

/// Reference-set visibilities further than this many standard deviations are dropped
pub const VISIBILITY_SPREAD_FACTOR: f64 = 1.5;

/// Start vector coefficients relating NDVI to the vegetation fraction
pub const NDVI_FRACTION_SLOPE: f64 = 1.3;
pub const NDVI_FRACTION_OFFSET: f64 = 0.25;

/// Boundary nudge applied to the lookup table axis limits
pub const LUT_EPSILON: f64 = 0.001;

/// Cell side in pixels for reduced and full resolution products
pub const RR_PIXELS_PER_CELL: usize = 30;
pub const FR_PIXELS_PER_CELL: usize = 120;

/// Minimum clear fraction of a cell for a visibility estimate
pub const CELL_VISIBILITY_THRESHOLD: f64 = 0.35;

/// Minimum clear fraction of a cell for the reference pixel refinement
pub const CELL_REFINE_THRESHOLD: f64 = 0.45;

/// No-data sentinels
pub const VISIBILITY_NODATA: f64 = 0.0;
pub const AOT_NODATA: f64 = -1.0;
pub const AC_NODATA: f64 = -1.0;

/// Koschmieder constant relating visibility to extinction at 550 nm
pub const KOSCHMIEDER: f64 = 3.912;

/// Rayleigh extinction at 550 nm at sea level [km-1]
pub const RAYLEIGH_EXTINCTION_550: f64 = 0.01159;

/// Aerosol scale height [km]
pub const AEROSOL_SCALE_HEIGHT: f64 = 2.0;

/// Radiance scaling from sensor units to lookup table units
pub const RADIANCE_SCALE: f64 = 1.0e-4;

/// Sun-earth distance model (eccentricity and day offset)
pub const ORBIT_ECCENTRICITY: f64 = 0.01673;
pub const PERIHELION_DAY: f64 = 4.0;
pub const DEGREES_PER_DAY: f64 = 0.9856;
