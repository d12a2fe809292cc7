use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "KES";

/// Number of basis points in a whole (100%).
const BPS_SCALE: i64 = 10_000;

//--------------------------------------       Cents         ---------------------------------------------------------
/// An amount of Kenyan shillings, held as an integer count of cents (the gateway's "minor units").
///
/// All ledger arithmetic happens on `Cents`. Conversion to and from major units (shillings with a fractional part)
/// only happens at the wire boundary, see [`major_units`].
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| CentsConversionError(format!("Value {value} is too large to convert to Cents")))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{CURRENCY_CODE} {}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub const ZERO: Self = Self(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_shillings(shillings: i64) -> Self {
        Self(shillings * 100)
    }

    /// Converts an amount in shillings (e.g. `1250.5`) into cents. Amounts are rounded to the nearest cent.
    pub fn from_major_units(amount: f64) -> Result<Self, CentsConversionError> {
        if !amount.is_finite() {
            return Err(CentsConversionError(format!("{amount} is not a finite number")));
        }
        let cents = (amount * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return Err(CentsConversionError(format!("{amount} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }

    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The given fraction of this amount, expressed in basis points, rounded down to the nearest cent.
    pub fn basis_points(&self, bps: u32) -> Self {
        let scaled = i128::from(self.0) * i128::from(bps) / i128::from(BPS_SCALE);
        #[allow(clippy::cast_possible_truncation)]
        Self(scaled as i64)
    }
}

/// Serde adapter for amounts that travel as JSON numbers in major units (shillings), e.g. `"amount": 400.5`.
///
/// Use with `#[serde(with = "chama_common::major_units")]`.
pub mod major_units {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::Cents;

    pub fn serialize<S: Serializer>(value: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_major_units())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Cents::from_major_units(amount).map_err(D::Error::custom)
    }

    /// The same adapter for optional amounts.
    pub mod option {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::super::Cents;

        pub fn serialize<S: Serializer>(value: &Option<Cents>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&v.to_major_units()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Cents>, D::Error> {
            let amount = Option::<f64>::deserialize(deserializer)?;
            amount.map(|a| Cents::from_major_units(a).map_err(D::Error::custom)).transpose()
        }
    }
}

#[cfg(test)]
mod test {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[test]
    fn display() {
        assert_eq!(Cents::from(123_456).to_string(), "KES 1234.56");
        assert_eq!(Cents::from(5).to_string(), "KES 0.05");
        assert_eq!(Cents::from(-250).to_string(), "-KES 2.50");
    }

    #[test]
    fn major_unit_conversion() {
        assert_eq!(Cents::from_major_units(400.0).unwrap(), Cents::from(40_000));
        assert_eq!(Cents::from_major_units(19.99).unwrap(), Cents::from(1999));
        assert_eq!(Cents::from_major_units(0.005).unwrap(), Cents::from(1));
        assert!(Cents::from_major_units(f64::NAN).is_err());
        assert!(Cents::from_major_units(f64::INFINITY).is_err());
        assert_eq!(Cents::from(40_050).to_major_units(), 400.5);
    }

    #[test]
    fn platform_fee_rounds_down() {
        // 2.5% of KES 1000
        assert_eq!(Cents::from_shillings(1000).basis_points(250), Cents::from_shillings(25));
        // 2.5% of 0.99 is 2.475 cents
        assert_eq!(Cents::from(99).basis_points(250), Cents::from(2));
        assert_eq!(Cents::from(i64::MAX).basis_points(10_000), Cents::from(i64::MAX));
    }

    #[test]
    fn serde_major_units() {
        #[derive(Serialize, Deserialize)]
        struct Req {
            #[serde(with = "major_units")]
            amount: Cents,
            #[serde(default, with = "major_units::option")]
            fee: Option<Cents>,
        }
        let req: Req = serde_json::from_str(r#"{"amount": 400.25}"#).unwrap();
        assert_eq!(req.amount, Cents::from(40_025));
        assert!(req.fee.is_none());
        let json = serde_json::to_string(&Req { amount: Cents::from(150), fee: Some(Cents::from(4)) }).unwrap();
        assert_eq!(json, r#"{"amount":1.5,"fee":0.04}"#);
    }
}
