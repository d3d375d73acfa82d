use std::fmt;

/// Keyword-and-parameters form of a surface, the data handed to the deck
/// writer.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCard {
    /// Card mnemonic such as `px`, `c/z`, `so` or `gq`.
    pub keyword: &'static str,
    /// Numeric parameters in card order.
    pub params: Vec<f64>,
}

impl SurfaceCard {
    /// Creates a card.
    #[must_use]
    pub fn new(keyword: &'static str, params: Vec<f64>) -> Self {
        Self { keyword, params }
    }
}

impl fmt::Display for SurfaceCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword)?;
        for p in &self.params {
            // avoid printing "-0"
            let p = if *p == 0.0 { 0.0 } else { *p };
            write!(f, " {p}")?;
        }
        Ok(())
    }
}
