use crate::value_objects::bar::Bar;

/// Inclusive range over epoch seconds; `None` leaves that side open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarQuery {
    pub symbol: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

pub trait MarketDataRepository {
    /// An empty vector means the source had nothing for the query.
    fn load_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, String>;
}
