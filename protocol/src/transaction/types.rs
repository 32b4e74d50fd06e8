// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Core value types for MicroCoin operations.
//!
//! These are small `Copy` types that travel through every builder, the
//! encoder and the orchestrator. Parsing lives here so that every entry
//! point (HTTP bodies, path segments, node responses) agrees on the same
//! rules.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

use crate::config::{
    AMOUNT_DECIMALS, AMOUNT_SCALE, OP_TYPE_CHANGE_KEY, OP_TYPE_PURCHASE_ACCOUNT, OP_TYPE_TRANSFER,
};

/// Errors from parsing account numbers and coin amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("invalid account number `{0}`")]
    InvalidAccountNumber(String),

    #[error("amount must not be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("amount does not fit the ledger's fixed-point range: {0}")]
    AmountOverflow(Decimal),
}

// ---------------------------------------------------------------------------
// AccountNumber
// ---------------------------------------------------------------------------

/// A ledger account number, optionally carrying its two-digit checksum.
///
/// Renders as `"N-CC"` when the checksum is known and `"N"` otherwise.
/// Equality, ordering and hashing use the numeric part only, so `"7"` and
/// `"7-12"` name the same account. Whether `CC` is actually correct for
/// `N` is decided by the ledger node, not here.
#[derive(Clone, Copy)]
pub struct AccountNumber {
    number: u32,
    checksum: Option<u8>,
}

impl AccountNumber {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            checksum: None,
        }
    }

    pub fn with_checksum(number: u32, checksum: u8) -> Self {
        Self {
            number,
            checksum: Some(checksum),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn checksum(&self) -> Option<u8> {
        self.checksum
    }
}

impl PartialEq for AccountNumber {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for AccountNumber {}

impl Hash for AccountNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for AccountNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccountNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl Default for AccountNumber {
    fn default() -> Self {
        Self::new(0)
    }
}

impl From<u32> for AccountNumber {
    fn from(number: u32) -> Self {
        Self::new(number)
    }
}

impl fmt::Debug for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountNumber({self})")
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.checksum {
            Some(cc) => write!(f, "{}-{:02}", self.number, cc),
            None => write!(f, "{}", self.number),
        }
    }
}

impl FromStr for AccountNumber {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidAccountNumber(s.to_string());
        let text = s.trim();
        let all_digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());

        match text.split_once('-') {
            Some((number, checksum)) => {
                if !all_digits(number) || !all_digits(checksum) || checksum.len() > 2 {
                    return Err(invalid());
                }
                let number = number.parse().map_err(|_| invalid())?;
                let checksum = checksum.parse().map_err(|_| invalid())?;
                Ok(Self::with_checksum(number, checksum))
            }
            None => {
                if !all_digits(text) {
                    return Err(invalid());
                }
                Ok(Self::new(text.parse().map_err(|_| invalid())?))
            }
        }
    }
}

impl Serialize for AccountNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AccountVisitor;

        impl<'de> Visitor<'de> for AccountVisitor {
            type Value = AccountNumber;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an account number as \"N\", \"N-CC\" or an integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                u32::try_from(v)
                    .map(AccountNumber::new)
                    .map_err(|_| E::custom(ValueError::InvalidAccountNumber(v.to_string())))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u32::try_from(v)
                    .map(AccountNumber::new)
                    .map_err(|_| E::custom(ValueError::InvalidAccountNumber(v.to_string())))
            }
        }

        deserializer.deserialize_any(AccountVisitor)
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A coin amount in the ledger's smallest unit (1 coin = 10 000 units).
///
/// Client input arrives as a decimal and is converted exactly once, in
/// [`Amount::from_decimal`]. Digits past the fourth decimal place are
/// truncated toward zero, so `1.23456` becomes `12345` units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub fn units(self) -> u64 {
        self.0
    }

    /// Converts a coin value to fixed-point units, truncating past four
    /// decimal places.
    pub fn from_decimal(value: Decimal) -> Result<Self, ValueError> {
        if value < Decimal::ZERO {
            return Err(ValueError::NegativeAmount(value));
        }
        value
            .checked_mul(Decimal::from(AMOUNT_SCALE))
            .and_then(|scaled| scaled.trunc().to_u64())
            .map(Self)
            .ok_or(ValueError::AmountOverflow(value))
    }

    /// The amount in coins, with exactly four decimal places.
    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(self.0 as i128, AMOUNT_DECIMALS)
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0>width$}",
            self.0 / AMOUNT_SCALE,
            self.0 % AMOUNT_SCALE,
            width = AMOUNT_DECIMALS as usize
        )
    }
}

/// Serde helpers for coin values that arrive either as JSON numbers or as
/// strings. Numbers are re-read from their shortest decimal rendering so
/// `0.0001` stays exactly `0.0001` instead of the nearest `f64`.
pub mod coins {
    use rust_decimal::Decimal;
    use serde::de::{self, Deserialize, Deserializer};
    use serde::{Serialize, Serializer};

    /// Parses `text` as a plain or scientific decimal.
    pub fn parse(text: &str) -> Result<Decimal, rust_decimal::Error> {
        let text = text.trim();
        text.parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(text))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => parse(&n.to_string()).map_err(de::Error::custom),
            serde_json::Value::String(s) => parse(&s).map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected a coin amount, found {other}"
            ))),
        }
    }

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(value, serializer)
    }
}

// ---------------------------------------------------------------------------
// OperationType
// ---------------------------------------------------------------------------

/// Kind of ledger-mutating operation, with the node's numeric type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Transfer,
    PurchaseAccount,
    ChangeKey,
}

impl OperationType {
    /// Type code placed in the wire frame header.
    pub fn code(self) -> u32 {
        match self {
            Self::Transfer => OP_TYPE_TRANSFER,
            Self::PurchaseAccount => OP_TYPE_PURCHASE_ACCOUNT,
            Self::ChangeKey => OP_TYPE_CHANGE_KEY,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            OP_TYPE_TRANSFER => Some(Self::Transfer),
            OP_TYPE_PURCHASE_ACCOUNT => Some(Self::PurchaseAccount),
            OP_TYPE_CHANGE_KEY => Some(Self::ChangeKey),
            _ => None,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "Transfer"),
            Self::PurchaseAccount => write!(f, "PurchaseAccount"),
            Self::ChangeKey => write!(f, "ChangeKey"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_bare_and_checksummed_forms() {
        let bare: AccountNumber = "42".parse().unwrap();
        assert_eq!(bare.number(), 42);
        assert_eq!(bare.checksum(), None);

        let full: AccountNumber = " 1-23 ".parse().unwrap();
        assert_eq!(full.number(), 1);
        assert_eq!(full.checksum(), Some(23));
        assert_eq!(full.to_string(), "1-23");
    }

    #[test]
    fn rejects_malformed_account_numbers() {
        for bad in ["", "-", "1-", "-23", "abc", "1-2-3", "1-234", "99999999999", "+5"] {
            assert!(bad.parse::<AccountNumber>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn identity_ignores_checksum() {
        let a: AccountNumber = "7".parse().unwrap();
        let b: AccountNumber = "7-12".parse().unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn single_digit_checksum_renders_padded() {
        assert_eq!(AccountNumber::with_checksum(3, 5).to_string(), "3-05");
    }

    #[test]
    fn deserializes_strings_and_integers() {
        let from_str: AccountNumber = serde_json::from_str("\"2-46\"").unwrap();
        let from_int: AccountNumber = serde_json::from_str("2").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(from_str.checksum(), Some(46));
        assert!(serde_json::from_str::<AccountNumber>("-1").is_err());
        assert!(serde_json::from_str::<AccountNumber>("\"x\"").is_err());
    }

    #[test]
    fn four_decimal_amount_converts_exactly() {
        assert_eq!(Amount::from_decimal(dec("1.2345")).unwrap().units(), 12345);
        assert_eq!(Amount::from_decimal(dec("10.0000")).unwrap().units(), 100_000);
        assert_eq!(Amount::from_decimal(dec("0.0001")).unwrap().units(), 1);
    }

    #[test]
    fn finer_amounts_truncate_toward_zero() {
        assert_eq!(Amount::from_decimal(dec("1.23456")).unwrap().units(), 12345);
        assert_eq!(Amount::from_decimal(dec("1.23459999")).unwrap().units(), 12345);
        assert_eq!(Amount::from_decimal(dec("0.00009")).unwrap().units(), 0);
    }

    #[test]
    fn negative_and_huge_amounts_are_rejected() {
        assert!(matches!(
            Amount::from_decimal(dec("-0.0001")),
            Err(ValueError::NegativeAmount(_))
        ));
        assert!(matches!(
            Amount::from_decimal(dec("18446744073709551615")),
            Err(ValueError::AmountOverflow(_))
        ));
    }

    #[test]
    fn amount_display_has_four_places() {
        assert_eq!(Amount::from_units(100_001).to_string(), "10.0001");
        assert_eq!(Amount::from_units(5).to_string(), "0.0005");
        assert_eq!(Amount::from_units(12345).to_decimal(), dec("1.2345"));
    }

    #[test]
    fn coin_values_accept_numbers_and_strings() {
        #[derive(serde::Deserialize)]
        struct Body {
            #[serde(with = "coins")]
            fee: Decimal,
        }
        let from_number: Body = serde_json::from_str(r#"{"fee": 0.0001}"#).unwrap();
        let from_string: Body = serde_json::from_str(r#"{"fee": "0.0001"}"#).unwrap();
        let from_int: Body = serde_json::from_str(r#"{"fee": 3}"#).unwrap();
        assert_eq!(from_number.fee, dec("0.0001"));
        assert_eq!(from_string.fee, dec("0.0001"));
        assert_eq!(from_int.fee, dec("3"));
        assert_eq!(Amount::from_decimal(from_number.fee).unwrap().units(), 1);
        assert!(serde_json::from_str::<Body>(r#"{"fee": true}"#).is_err());
    }

    #[test]
    fn coin_values_serialize_as_strings() {
        #[derive(serde::Serialize)]
        struct Body {
            #[serde(with = "coins")]
            fee: Decimal,
        }
        let json = serde_json::to_value(Body { fee: dec("0.0001") }).unwrap();
        assert_eq!(json["fee"], "0.0001");
    }

    #[test]
    fn operation_codes_roundtrip() {
        for op in [
            OperationType::Transfer,
            OperationType::PurchaseAccount,
            OperationType::ChangeKey,
        ] {
            assert_eq!(OperationType::from_code(op.code()), Some(op));
        }
        assert_eq!(OperationType::Transfer.code(), 1);
        assert_eq!(OperationType::PurchaseAccount.code(), 6);
        assert_eq!(OperationType::ChangeKey.code(), 7);
        assert_eq!(OperationType::from_code(2), None);
    }
}
