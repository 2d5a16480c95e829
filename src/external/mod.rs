pub mod market_data;
pub mod yahoo;

#[cfg(test)]
pub mod mock;
