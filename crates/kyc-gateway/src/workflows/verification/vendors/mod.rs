//! Vendor vocabularies mapped onto the workflow's closed enums.

pub mod sumsub;
