//! Cell value types.
//!
//! [`CellInput`] is what callers hand to the write API. It is resolved into a
//! stored [`CellValue`]: numbers keep their literal token, everything else goes
//! through the shared string table.

/// Upper bound below which an integral float is written without a fraction.
const INTEGRAL_FLOAT_LIMIT: f64 = 1e15;

/// A value supplied by the caller for one cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellInput {
    /// No value; stored as the empty string.
    Null,
    /// Text, interned in the shared string table.
    Text(String),
    /// A numeric literal token, written verbatim into `<v>`. Tokens that are
    /// not finite number literals are rejected when the cell is written.
    Number(String),
}

impl CellInput {
    /// Build a numeric input from a token that is already formatted.
    pub fn number_token<S: Into<String>>(token: S) -> Self {
        CellInput::Number(token.into())
    }

    pub fn is_number(&self) -> bool {
        matches!(self, CellInput::Number(_))
    }
}

/// Format a float the way cells store it.
///
/// Integral values below 1e15 in magnitude drop the fraction; other finite
/// values use the shortest round-trip representation. Non-finite values have
/// no numeric literal and are returned as `None`.
pub fn format_number(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < INTEGRAL_FLOAT_LIMIT {
        return Some(itoa::Buffer::new().format(value as i64).to_string());
    }
    Some(ryu::Buffer::new().format_finite(value).to_string())
}

/// Whether `token` is a literal the `<v>` element of a numeric cell accepts.
pub fn is_number_literal(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && token.parse::<f64>().map_or(false, f64::is_finite)
}

fn float_input(value: f64) -> CellInput {
    match format_number(value) {
        Some(token) => CellInput::Number(token),
        None if value.is_nan() => CellInput::Text("NaN".to_string()),
        None if value > 0.0 => CellInput::Text("inf".to_string()),
        None => CellInput::Text("-inf".to_string()),
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CellInput {
                fn from(value: $t) -> Self {
                    CellInput::Number(itoa::Buffer::new().format(value).to_string())
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<f64> for CellInput {
    fn from(value: f64) -> Self {
        float_input(value)
    }
}

impl From<f32> for CellInput {
    fn from(value: f32) -> Self {
        float_input(value as f64)
    }
}

impl From<&str> for CellInput {
    fn from(value: &str) -> Self {
        CellInput::Text(value.to_string())
    }
}

impl From<String> for CellInput {
    fn from(value: String) -> Self {
        CellInput::Text(value)
    }
}

impl From<&String> for CellInput {
    fn from(value: &String) -> Self {
        CellInput::Text(value.clone())
    }
}

impl From<char> for CellInput {
    fn from(value: char) -> Self {
        CellInput::Text(value.to_string())
    }
}

impl From<bool> for CellInput {
    fn from(value: bool) -> Self {
        CellInput::Text(if value { "TRUE" } else { "FALSE" }.to_string())
    }
}

impl<T: Into<CellInput>> From<Option<T>> for CellInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellInput::Null, Into::into)
    }
}

/// A value as stored in the sheet grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    /// Placeholder cell with no value, e.g. a merge corner.
    #[default]
    Empty,
    /// Index into the workbook's shared string table.
    SharedString(usize),
    /// Numeric literal token.
    Number(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn shared_string_index(&self) -> Option<usize> {
        match self {
            CellValue::SharedString(idx) => Some(*idx),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(token) => token.parse().ok(),
            _ => None,
        }
    }
}
