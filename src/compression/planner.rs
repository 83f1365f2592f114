/// Default bounds for web delivery.
pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;

/// Computes working dimensions under a maximum-bounds policy.
///
/// Images already inside the bounds are left alone; larger ones are scaled down with their
/// aspect ratio preserved. Nothing is ever scaled up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionPlanner {
    max_width: u32,
    max_height: u32,
}

impl DimensionPlanner {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    pub fn plan(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (width.max(1), height.max(1));
        }
        if width <= self.max_width && height <= self.max_height {
            return (width, height);
        }

        let aspect = width as f64 / height as f64;
        let scale = (self.max_width as f64 / width as f64).min(self.max_height as f64 / height as f64);

        let mut new_width = width as f64 * scale;
        let mut new_height = height as f64 * scale;

        if new_width > self.max_width as f64 {
            new_width = self.max_width as f64;
            new_height = new_width / aspect;
        }
        if new_height > self.max_height as f64 {
            new_height = self.max_height as f64;
            new_width = new_height * aspect;
        }

        (
            round_dimension(new_width).min(self.max_width),
            round_dimension(new_height).min(self.max_height),
        )
    }
}

impl Default for DimensionPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_MAX_HEIGHT)
    }
}

/// Scales both axes by `scale`, rounding to the nearest pixel and never going below 1.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        round_dimension(width as f64 * scale),
        round_dimension(height as f64 * scale),
    )
}

fn round_dimension(value: f64) -> u32 {
    (value.round() as u32).max(1)
}
