pub mod backend_factory;
pub mod cascade_model;
pub mod cpu_cascade_detector;
pub mod gpu_cascade_detector;
pub mod gpu_context;
pub mod preprocess;
pub mod scan;
