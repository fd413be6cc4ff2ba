pub mod analysis;
pub mod economics;
pub mod loans;
pub mod savings;
