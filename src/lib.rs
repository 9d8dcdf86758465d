pub mod chord_table;
pub mod conductor;
pub mod console_display;
pub mod coordinator;
pub mod data_logger;
pub mod gesture;
pub mod idle_timer;
pub mod osc_sender;
pub mod sequence;
pub mod session_reader;
pub mod simulator;
pub mod types;
