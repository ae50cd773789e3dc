// SPDX-License-Identifier: Apache-2.0

use std::fmt;

pub mod expr;

/// One bound of a bit range: either a concrete integer or an expression that
/// still references generics.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    Int(i64),
    Expr(String),
}

impl Bound {
    /// Parses a bound, folding it to an integer when it has no identifiers.
    pub fn parse(text: &str) -> Bound {
        let text = expr::normalize(text);
        match expr::evaluate(&text) {
            Some(value) => Bound::Int(value),
            None => Bound::Expr(text),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Bound::Int(value) => Some(*value),
            Bound::Expr(_) => None,
        }
    }

    fn resolve(&self, lookup: &impl Fn(&str) -> Option<String>) -> Bound {
        match self {
            Bound::Int(_) => self.clone(),
            Bound::Expr(text) => Bound::parse(&expr::substitute(text, lookup)),
        }
    }

    fn identifiers(&self) -> Vec<String> {
        match self {
            Bound::Int(_) => Vec::new(),
            Bound::Expr(text) => expr::identifiers(text),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Int(value) => write!(f, "{value}"),
            Bound::Expr(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Bound::Int(value)
    }
}

/// Ordering of a bit range, `downto` (descending) or `to` (ascending).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BitOrder {
    Downto,
    To,
}

impl fmt::Display for BitOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitOrder::Downto => f.write_str("downto"),
            BitOrder::To => f.write_str("to"),
        }
    }
}

/// Data width of a port or signal.
///
/// `Scalar` is a single-bit signal without a range (e.g. `std_logic`). A
/// `Range` is resolved once both of its bounds are integers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataWidth {
    Scalar,
    Range {
        left: Bound,
        order: BitOrder,
        right: Bound,
    },
}

impl DataWidth {
    /// Parses the raw width text of a port declaration.
    ///
    /// Accepts the empty string (scalar), `<a> downto <b>`, `<a> to <b>` and a
    /// bare bound `<a>`, which is shorthand for `<a> downto 0`. Returns `None`
    /// if a bound is not a well-formed expression.
    pub fn parse(text: &str) -> Option<DataWidth> {
        let text = text.trim();
        if text.is_empty() {
            return Some(DataWidth::Scalar);
        }
        let lower = text.to_ascii_lowercase();
        let (left, order, right) = if let Some(pos) = find_word(&lower, "downto") {
            (&text[..pos], BitOrder::Downto, &text[pos + "downto".len()..])
        } else if let Some(pos) = find_word(&lower, "to") {
            (&text[..pos], BitOrder::To, &text[pos + "to".len()..])
        } else {
            (text, BitOrder::Downto, "0")
        };
        if !expr::is_well_formed(left) || !expr::is_well_formed(right) {
            return None;
        }
        Some(DataWidth::Range {
            left: Bound::parse(left),
            order,
            right: Bound::parse(right),
        })
    }

    /// A resolved `high downto low` range.
    pub fn downto(high: i64, low: i64) -> DataWidth {
        DataWidth::Range {
            left: Bound::Int(high),
            order: BitOrder::Downto,
            right: Bound::Int(low),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            DataWidth::Scalar => true,
            DataWidth::Range { left, right, .. } => {
                left.as_int().is_some() && right.as_int().is_some()
            }
        }
    }

    /// The resolved bounds as `(left, right)`.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            DataWidth::Scalar => None,
            DataWidth::Range { left, right, .. } => Some((left.as_int()?, right.as_int()?)),
        }
    }

    /// Number of bits, if resolved.
    pub fn bit_width(&self) -> Option<u64> {
        match self {
            DataWidth::Scalar => Some(1),
            DataWidth::Range { left, order, right } => {
                let (l, r) = (left.as_int()?, right.as_int()?);
                let span = match order {
                    BitOrder::Downto => l - r,
                    BitOrder::To => r - l,
                };
                (span >= 0).then(|| span as u64 + 1)
            }
        }
    }

    /// Generic names referenced by either bound, in order of appearance.
    pub fn identifiers(&self) -> Vec<String> {
        match self {
            DataWidth::Scalar => Vec::new(),
            DataWidth::Range { left, right, .. } => {
                let mut names = left.identifiers();
                for name in right.identifiers() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                names
            }
        }
    }

    /// Substitutes generic values via `lookup` and folds each bound as far as
    /// possible. Resolving an already resolved width returns it unchanged.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> DataWidth {
        match self {
            DataWidth::Scalar => DataWidth::Scalar,
            DataWidth::Range { left, order, right } => DataWidth::Range {
                left: left.resolve(&lookup),
                order: *order,
                right: right.resolve(&lookup),
            },
        }
    }

    /// Whether two widths describe the same number of bits, or are
    /// structurally identical while unresolved.
    pub fn matches(&self, other: &DataWidth) -> bool {
        if self == other {
            return true;
        }
        match (self.bit_width(), other.bit_width()) {
            (Some(a), Some(b)) => {
                // a scalar only matches a scalar
                a == b && matches!(self, DataWidth::Scalar) == matches!(other, DataWidth::Scalar)
            }
            _ => false,
        }
    }

    /// Expression for the number of bits, in terms of the bound expressions.
    pub(crate) fn bit_width_expr(&self) -> Option<String> {
        match self {
            DataWidth::Scalar => None,
            DataWidth::Range { left, order, right } => Some(match order {
                BitOrder::Downto => format!("({left})-({right})+1"),
                BitOrder::To => format!("({right})-({left})+1"),
            }),
        }
    }
}

impl fmt::Display for DataWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWidth::Scalar => Ok(()),
            DataWidth::Range { left, order, right } => write!(f, "{left} {order} {right}"),
        }
    }
}

/// Byte offset of `word` in `text` where it stands as its own token.
fn find_word(text: &str, word: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let mut from = 0;
    while let Some(rel) = text[from..].find(word) {
        let pos = from + rel;
        let end = pos + word.len();
        let before_ok = pos == 0 || !is_ident(bytes[pos - 1]);
        let after_ok = end == bytes.len() || !is_ident(bytes[end]);
        if before_ok && after_ok {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(DataWidth::parse(""), Some(DataWidth::Scalar));
        assert_eq!(DataWidth::parse("7 downto 0"), Some(DataWidth::downto(7, 0)));
        assert_eq!(DataWidth::parse("8"), Some(DataWidth::downto(8, 0)));
        assert_eq!(
            DataWidth::parse("0 to DATA_WIDTH - 1"),
            Some(DataWidth::Range {
                left: Bound::Int(0),
                order: BitOrder::To,
                right: Bound::Expr("DATA_WIDTH-1".to_string()),
            })
        );
        assert_eq!(
            DataWidth::parse("TOTAL_DOWNTO downto 0"),
            Some(DataWidth::Range {
                left: Bound::Expr("TOTAL_DOWNTO".to_string()),
                order: BitOrder::Downto,
                right: Bound::Int(0),
            })
        );
        assert_eq!(DataWidth::parse("W - downto 0"), None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let width = DataWidth::parse("W*2-1 downto 0").unwrap();
        let lookup = |id: &str| (id == "W").then(|| "4".to_string());
        let once = width.resolve(lookup);
        let twice = once.resolve(lookup);
        assert_eq!(once, DataWidth::downto(7, 0));
        assert_eq!(once, twice);
        assert_eq!(once.bit_width(), Some(8));
    }

    #[test]
    fn test_matches() {
        assert!(DataWidth::downto(7, 0).matches(&DataWidth::downto(15, 8)));
        assert!(!DataWidth::downto(7, 0).matches(&DataWidth::downto(8, 0)));
        assert!(!DataWidth::Scalar.matches(&DataWidth::downto(0, 0)));
        let symbolic = DataWidth::parse("W-1 downto 0").unwrap();
        assert!(symbolic.matches(&symbolic.clone()));
    }
}
