pub mod quote;
pub mod tariff;
