pub mod amortization;
pub mod refinance;
