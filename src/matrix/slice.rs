//! Parser for textual slice selectors such as `"1:,:"` or `"0:2,1:3"`.
//!
//! Each axis is `start:end` with `start` inclusive and `end` exclusive. An
//! omitted start means 0, an omitted end means the full extent, and an empty
//! axis selects everything. A bare index `n` selects `n:n+1`. When the column
//! part is missing entirely, all columns are selected.

use crate::error::{LstmError, Result};

/// One axis of a slice selector, before it is resolved against an extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AxisRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// A parsed two-axis slice selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SliceSpec {
    pub rows: AxisRange,
    pub columns: AxisRange,
}

fn invalid(expression: &str, reason: impl Into<String>) -> LstmError {
    LstmError::InvalidSlice {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

fn parse_bound(text: &str, expression: &str) -> Result<Option<usize>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<usize>()
        .map(Some)
        .map_err(|_| invalid(expression, format!("'{}' is not a non-negative index", text)))
}

impl AxisRange {
    fn parse(part: &str, expression: &str) -> Result<Self> {
        match part.split_once(':') {
            Some((start, end)) => {
                if end.contains(':') {
                    return Err(invalid(expression, "too many ':' in one axis"));
                }
                Ok(AxisRange {
                    start: parse_bound(start, expression)?,
                    end: parse_bound(end, expression)?,
                })
            }
            None => match parse_bound(part, expression)? {
                Some(index) => {
                    let end = index
                        .checked_add(1)
                        .ok_or_else(|| invalid(expression, format!("index {} is out of range", index)))?;
                    Ok(AxisRange { start: Some(index), end: Some(end) })
                }
                None => Ok(AxisRange::default()),
            },
        }
    }

    /// Resolves against an axis of length `extent`. Fails when the range is
    /// empty or reaches past the extent.
    pub fn resolve(&self, extent: usize, expression: &str) -> Result<(usize, usize)> {
        let start = self.start.unwrap_or(0);
        let end = self.end.unwrap_or(extent);
        if end > extent {
            return Err(invalid(expression, format!("end {} exceeds extent {}", end, extent)));
        }
        if end <= start {
            return Err(invalid(expression, format!("empty range {}..{}", start, end)));
        }
        Ok((start, end))
    }
}

impl SliceSpec {
    pub fn parse(expression: &str) -> Result<Self> {
        let mut parts = expression.split(',');
        let rows = AxisRange::parse(parts.next().unwrap_or(""), expression)?;
        let columns = match parts.next() {
            Some(part) => AxisRange::parse(part, expression)?,
            None => AxisRange::default(),
        };
        if parts.next().is_some() {
            return Err(invalid(expression, "only two axes are supported"));
        }
        Ok(SliceSpec { rows, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn three_by_three() -> Matrix {
        Matrix::from_vec(3, 3, (1..=9).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_parse_open_bounds() {
        let spec = SliceSpec::parse("1:,:").unwrap();
        assert_eq!(spec.rows, AxisRange { start: Some(1), end: None });
        assert_eq!(spec.columns, AxisRange::default());
    }

    #[test]
    fn test_slice_tail_rows() {
        let m = three_by_three();
        let tail = m.slice("1:,:").unwrap();
        assert_eq!(tail.shape(), (2, 3));
        assert_eq!(tail, m.slice("1:3,0:3").unwrap());
        assert_eq!(tail.row(0), m.row(1));
        assert_eq!(tail.row(1), m.row(2));
    }

    #[test]
    fn test_slice_single_index_and_missing_columns() {
        let m = three_by_three();
        assert_eq!(m.slice("2").unwrap(), m.row(2).unwrap());
        assert_eq!(m.slice(":,1").unwrap().to_vec(), vec![2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_zero_extent_is_rejected() {
        let m = three_by_three();
        assert!(matches!(m.slice("1:1,:"), Err(LstmError::InvalidSlice { .. })));
        assert!(matches!(m.slice(":,2:1"), Err(LstmError::InvalidSlice { .. })));
    }

    #[test]
    fn test_out_of_range_and_garbage_are_rejected() {
        let m = three_by_three();
        assert!(m.slice("0:4,:").is_err());
        assert!(m.slice("-1:,:").is_err());
        assert!(m.slice("a:b").is_err());
        assert!(m.slice("0:1,0:1,0:1").is_err());
        assert!(m.slice("0:1:2,:").is_err());
        assert!(matches!(
            m.slice("18446744073709551615,:"),
            Err(LstmError::InvalidSlice { .. })
        ));
    }
}
