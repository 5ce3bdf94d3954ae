//! Tagged numbers for template arithmetic
//!
//! Promotion rules: a float on either side makes the result a float.
//! Otherwise the left operand decides between signed and unsigned and the
//! right operand is converted to match. Operands that are not numbers count
//! as zero; a non-numeric left operand with no float involved yields `Int(0)`.

use minijinja::Value;
use minijinja::value::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Uint(u64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mult,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticError {
    #[error("integer division by zero")]
    DivisionByZero,
}

impl Number {
    /// Classify a template value, `None` when it is not a number
    pub fn from_value(value: &Value) -> Option<Number> {
        if value.kind() != ValueKind::Number {
            return None;
        }
        if value.is_integer() {
            if let Ok(i) = i64::try_from(value.clone()) {
                return Some(Number::Int(i));
            }
            if let Ok(u) = u64::try_from(value.clone()) {
                return Some(Number::Uint(u));
            }
        }
        f64::try_from(value.clone()).ok().map(Number::Float)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Uint(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::Uint(u) => u as i64,
            Number::Float(f) => f as i64,
        }
    }

    pub fn as_u64(self) -> u64 {
        match self {
            Number::Int(i) => i as u64,
            Number::Uint(u) => u,
            Number::Float(f) => f as u64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// Apply `op` to two possibly non-numeric operands
    pub fn apply(op: Op, a: Option<Number>, b: Option<Number>) -> Result<Number, ArithmeticError> {
        let float = |n: Option<Number>| n.map_or(0.0, Number::as_f64);

        if a.is_some_and(Number::is_float) || b.is_some_and(Number::is_float) {
            let (x, y) = (float(a), float(b));
            return Ok(Number::Float(match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mult => x * y,
                Op::Div => x / y,
            }));
        }

        match a {
            Some(Number::Int(x)) => {
                let y = b.map_or(0, Number::as_i64);
                Ok(Number::Int(match op {
                    Op::Add => x.wrapping_add(y),
                    Op::Sub => x.wrapping_sub(y),
                    Op::Mult => x.wrapping_mul(y),
                    Op::Div => {
                        if y == 0 {
                            return Err(ArithmeticError::DivisionByZero);
                        }
                        x.wrapping_div(y)
                    }
                }))
            }
            Some(Number::Uint(x)) => {
                let y = b.map_or(0, Number::as_u64);
                Ok(Number::Uint(match op {
                    Op::Add => x.wrapping_add(y),
                    Op::Sub => x.wrapping_sub(y),
                    Op::Mult => x.wrapping_mul(y),
                    Op::Div => x.checked_div(y).ok_or(ArithmeticError::DivisionByZero)?,
                }))
            }
            _ => Ok(Number::Int(0)),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Value {
        match n {
            Number::Int(i) => Value::from(i),
            Number::Uint(u) => Value::from(u),
            Number::Float(f) => Value::from(f),
        }
    }
}
