use std::fmt;

pub trait DataReader {
    fn read_data(&self) -> Result<Raster, ReadError>;
}

#[derive(Debug)]
pub enum ReadError {
    GeoTiff(String),
    Pattern(String),
    UnknownFileType(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::GeoTiff(e) => write!(f, "GeoTIFF error: {}", e),
            ReadError::Pattern(e) => write!(f, "File pattern error: {}", e),
            ReadError::UnknownFileType(path) => write!(f, "Unknown file type: {}", path),
        }
    }
}

impl std::error::Error for ReadError {}

pub enum FileType {
    GeoTiff,
}

/// A dense single band raster stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub buffer: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32, buffer: Vec<f32>) -> Self {
        debug_assert_eq!(buffer.len(), width as usize * height as usize);
        Self {
            width,
            height,
            buffer,
        }
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    pub fn from_fn<F: Fn(usize, usize) -> f32>(width: u32, height: u32, f: F) -> Self {
        let mut buffer = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as usize {
            for x in 0..width as usize {
                buffer.push(f(x, y));
            }
        }
        Self::new(width, height, buffer)
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.buffer[y * self.width as usize + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let width = self.width as usize;
        self.buffer[y * width + x] = value;
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }
}

impl fmt::Display for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min_value = self
            .buffer
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .fold(f32::NAN, f32::min);

        let max_value = self
            .buffer
            .iter()
            .copied()
            .filter(|x| !x.is_nan())
            .fold(f32::NAN, f32::max);

        write!(
            f,
            "Width: {}\nHeight: {}\nBuffer Length: {}\nMin value: {}\nMax value: {}",
            self.width,
            self.height,
            self.buffer.len(),
            min_value,
            max_value,
        )
    }
}
