//! Runtime parameters sent alongside a compiled plan
//!
//! A compiled plan only knows the shape of a query. The literal values
//! travel separately as an ordered list of byte slices, one group per step,
//! in plan order:
//!
//! - equality literals: their UTF-8 text
//! - ranges: two 8-byte big-endian unsigned slices, `gte` then `lte`
//! - traversal filters: alternating key and value text

/// Ordered parameter slices for one plan execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanParameters {
    slices: Vec<Vec<u8>>,
}

impl PlanParameters {
    /// Lower bound used when a range omits `gte`
    pub const OPEN_LOWER: u64 = 0;

    /// Upper bound used when a range omits `lte`
    pub const OPEN_UPPER: u64 = u64::MAX;

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text literal
    pub fn push_text(&mut self, text: &str) {
        self.slices.push(text.as_bytes().to_vec());
    }

    /// Append an inclusive range as two big-endian keys
    pub fn push_range(&mut self, gte: Option<u64>, lte: Option<u64>) {
        self.slices
            .push(gte.unwrap_or(Self::OPEN_LOWER).to_be_bytes().to_vec());
        self.slices
            .push(lte.unwrap_or(Self::OPEN_UPPER).to_be_bytes().to_vec());
    }

    /// Append a traversal filter entry
    pub fn push_pair(&mut self, key: &str, value: &str) {
        self.push_text(key);
        self.push_text(value);
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.slices.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.slices.iter().map(Vec::as_slice)
    }

    /// Read slice `index` back as a big-endian range key
    pub fn key_at(&self, index: usize) -> Option<u64> {
        let bytes: [u8; 8] = self.get(index)?.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    pub fn into_inner(self) -> Vec<Vec<u8>> {
        self.slices
    }
}
