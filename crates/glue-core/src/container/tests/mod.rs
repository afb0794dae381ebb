pub mod builder_tests;
