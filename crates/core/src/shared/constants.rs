/// Outline/label color for the baseline (CPU) backend: IndianRed.
pub const CPU_COLOR: [u8; 3] = [205, 92, 92];

/// Outline/label color for the accelerated (GPU) backend: MediumSeaGreen.
pub const GPU_COLOR: [u8; 3] = [60, 179, 113];

/// Default number of latency samples kept per backend.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Default integer downscale factor applied before detection.
pub const DEFAULT_DOWNSCALE_FACTOR: u32 = 2;

/// Default minimum detectable face size in (pre-downscale) pixels.
pub const DEFAULT_MIN_FACE_SIZE: (u32, u32) = (200, 200);

/// Default cap on accelerated-backend results per frame.
pub const DEFAULT_GPU_MAX_DETECTIONS: usize = 16;

/// Multiplicative step between scales of the sliding-window pyramid.
pub const SCAN_SCALE_STEP: f64 = 1.1;

/// IoU above which two raw detections are considered the same face.
pub const DEDUP_IOU_THRESHOLD: f64 = 0.3;

/// Outline thickness in pixels for detection rectangles.
pub const OUTLINE_THICKNESS: u32 = 2;
