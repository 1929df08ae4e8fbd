//! Property-based tests for the bounded lists

mod bounded_list;
