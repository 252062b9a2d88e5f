//! Integration tests - exercise the public API against the bundled sample
//! dictionary and demo queries.

mod lowering_pipeline_tests;
