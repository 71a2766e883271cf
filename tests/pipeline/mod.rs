//! Build pipeline tests: full builds and incremental rebuilds

mod build_tests;
mod incremental_tests;
