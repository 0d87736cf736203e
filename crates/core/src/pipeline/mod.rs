pub mod capture_loop;
pub mod display_sink;
pub mod frame_processor;
