//! Text literal for tensors: `TENSOR[2, 3] : [1, 2, 3, 4, 5, 6]`.
//!
//! Floats are written with Rust's shortest round-trip formatting, so parsing
//! the output of `Display` reproduces the tensor bit for bit. NaNs are the
//! exception: their sign survives (`-NaN`) but the payload is read back as the
//! canonical quiet NaN.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::tensor::Tensor;

const PREFIX: &str = "TENSOR[";
const SEPARATOR: &str = "] : [";

struct Joined<'a, T>(&'a [T]);

/// `f32` display that keeps the sign of NaN.
struct Element(f32);

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() && self.0.is_sign_negative() {
            f.write_str("-NaN")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Joined<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, x) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}{}{SEPARATOR}{}]",
            Joined(self.shape()),
            Joined(&self.data().iter().copied().map(Element).collect::<Vec<_>>())
        )
    }
}

fn parse_list<T: FromStr>(s: &str, what: &str) -> Result<Vec<T>, Error> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|item| {
            let item = item.trim();
            item.parse()
                .map_err(|_| Error::Parse(format!("invalid {what} entry {item:?}")))
        })
        .collect()
}

impl FromStr for Tensor {
    type Err = Error;

    /// Parse the form produced by `Display`.
    ///
    /// ```
    /// use cgraph::Tensor;
    ///
    /// let t: Tensor = "TENSOR[2, 2] : [1, 0, 0, 1]".parse().unwrap();
    /// assert_eq!(t, Tensor::identity(2, 2));
    /// assert_eq!(t.to_string().parse::<Tensor>().unwrap(), t);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| Error::Parse(format!("expected `{PREFIX}...] : [...]`, got {s:?}")))?;
        let (shape, data) = body
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::Parse(format!("missing `{SEPARATOR}` in {s:?}")))?;

        let shape: Vec<usize> = parse_list(shape, "shape")?;
        let data: Vec<f32> = parse_list(data, "data")?;
        Tensor::from_vec(data, &shape)
    }
}
