//! Symbol vocabularies and sampling helpers.
//!
//! A vocabulary maps each symbol to its position and back, and converts
//! between symbols and one-hot `1 × size` matrices.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::error::{LstmError, Result};
use crate::matrix::Matrix;

/// Ordered, duplicate-free symbol alphabet. A symbol's id is its position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize",
    deserialize = "S: Deserialize<'de> + Clone + Eq + Hash"
))]
#[serde(from = "Vec<S>", into = "Vec<S>")]
pub struct Vocabulary<S = char>
where
    S: Clone + Eq + Hash,
{
    symbols: Vec<S>,
    ids: HashMap<S, usize>,
}

impl<S: Clone + Eq + Hash> From<Vec<S>> for Vocabulary<S> {
    fn from(symbols: Vec<S>) -> Self {
        Vocabulary::from_symbols(symbols)
    }
}

impl<S: Clone + Eq + Hash> From<Vocabulary<S>> for Vec<S> {
    fn from(vocabulary: Vocabulary<S>) -> Self {
        vocabulary.symbols
    }
}

impl<S: Clone + Eq + Hash> Default for Vocabulary<S> {
    fn default() -> Self {
        Vocabulary { symbols: Vec::new(), ids: HashMap::new() }
    }
}

impl<S: Clone + Eq + Hash> Vocabulary<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vocabulary in first-seen order, dropping repeats.
    pub fn from_symbols<I: IntoIterator<Item = S>>(symbols: I) -> Self {
        let mut vocabulary = Self::new();
        for symbol in symbols {
            vocabulary.add_symbol(symbol);
        }
        vocabulary
    }

    /// Adds `symbol` if it is new and returns its id. Existing ids never move.
    pub fn add_symbol(&mut self, symbol: S) -> usize {
        if let Some(&id) = self.ids.get(&symbol) {
            return id;
        }
        let id = self.symbols.len();
        self.ids.insert(symbol.clone(), id);
        self.symbols.push(symbol);
        id
    }

    pub fn id_of(&self, symbol: &S) -> Option<usize> {
        self.ids.get(symbol).copied()
    }

    pub fn symbol_at(&self, id: usize) -> Option<&S> {
        self.symbols.get(id)
    }

    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    pub fn contains(&self, symbol: &S) -> bool {
        self.ids.contains_key(symbol)
    }

    pub fn symbols(&self) -> &[S] {
        &self.symbols
    }
}

impl<S: Clone + Eq + Hash + Debug> Vocabulary<S> {
    /// One-hot `1 × size` row for `symbol`.
    pub fn encode(&self, symbol: &S) -> Result<Matrix> {
        let id = self
            .id_of(symbol)
            .ok_or_else(|| LstmError::SymbolNotFound(format!("{:?}", symbol)))?;
        let mut row = Matrix::zeros(1, self.size());
        row[(0, id)] = 1.0;
        Ok(row)
    }

    /// Symbol of a one-hot row or column of vocabulary length.
    pub fn decode(&self, vector: &Matrix) -> Result<S> {
        let size = self.size();
        let shape = vector.shape();
        if shape != (1, size) && shape != (size, 1) {
            return Err(LstmError::InvalidOneHot(format!(
                "expected 1 × {} or {} × 1, got {:?}",
                size, size, shape
            )));
        }

        let mut hot = None;
        for (i, &v) in vector.iter().enumerate() {
            if v == 1.0 {
                if hot.is_some() {
                    return Err(LstmError::InvalidOneHot("more than one element is set".to_string()));
                }
                hot = Some(i);
            } else if v != 0.0 {
                return Err(LstmError::InvalidOneHot(format!("element {} is {}", i, v)));
            }
        }

        hot.and_then(|id| self.symbol_at(id).cloned())
            .ok_or_else(|| LstmError::InvalidOneHot("no element is set".to_string()))
    }

    pub fn encode_sequence<'a, I>(&self, symbols: I) -> Result<Vec<Matrix>>
    where
        I: IntoIterator<Item = &'a S>,
        S: 'a,
    {
        symbols.into_iter().map(|s| self.encode(s)).collect()
    }

    pub fn decode_sequence(&self, vectors: &[Matrix]) -> Result<Vec<S>> {
        vectors.iter().map(|v| self.decode(v)).collect()
    }
}

impl Vocabulary<char> {
    /// Character vocabulary in first-seen order.
    pub fn from_text(text: &str) -> Self {
        Self::from_symbols(text.chars())
    }

    pub fn encode_text(&self, text: &str) -> Result<Vec<Matrix>> {
        text.chars().map(|c| self.encode(&c)).collect()
    }

    pub fn decode_text(&self, vectors: &[Matrix]) -> Result<String> {
        vectors.iter().map(|v| self.decode(v)).collect()
    }
}

/// Get argmax (greedy decoding). Ties go to the lowest index.
pub fn argmax(row: &Matrix) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// Sample an index from a probability row with temperature scaling.
///
/// The row is treated as a distribution; each probability is raised to
/// `1 / temperature` and renormalised. Higher temperature = more random,
/// lower = more deterministic.
pub fn sample_with_temperature<R: Rng + ?Sized>(probabilities: &Matrix, temperature: f32, rng: &mut R) -> Result<usize> {
    if !(temperature > 0.0) {
        return Err(LstmError::InvalidConfig(format!("temperature must be positive, got {}", temperature)));
    }
    let weights: Vec<f32> = probabilities
        .iter()
        .map(|&p| p.max(0.0).powf(1.0 / temperature))
        .collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => Ok(dist.sample(rng)),
        // All weights underflowed: fall back to the most likely symbol.
        Err(_) => Ok(argmax(probabilities)),
    }
}
