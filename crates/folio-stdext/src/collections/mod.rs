pub mod groupingmap;
pub mod interner;
pub mod nevec;
