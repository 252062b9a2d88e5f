//! Unit tests - file-backed configuration loading

mod config_loading_tests;
