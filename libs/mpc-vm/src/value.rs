//! The VM's runtime value type.

use crate::errors::ExecError;
use field::FpElement;
use shamir_sharing::Share;

/// A runtime value: either a public field element, a private Shamir share, or a random-number
/// tuple used to feed one multiplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A value known to every party.
    Public(FpElement),

    /// A Shamir share of a value no single party knows.
    Private(Share),

    /// A pair `(rho, sigma)` of shares of the same random value at degrees `t` and `2t`,
    /// consumed by one [`crate::instructions::Instruction::Mul`].
    PrivateRn(Share, Share),
}

impl Value {
    /// Returns the inner [`FpElement`] if this is a [`Value::Public`], or
    /// [`ExecError::UnexpectedTypeConversion`] otherwise.
    pub fn expect_public(&self, pc: u64) -> Result<&FpElement, ExecError> {
        match self {
            Value::Public(element) => Ok(element),
            _ => Err(ExecError::UnexpectedTypeConversion { pc, expected: "Public" }),
        }
    }

    /// Returns the inner [`Share`] if this is a [`Value::Private`], or
    /// [`ExecError::UnexpectedTypeConversion`] otherwise.
    pub fn expect_private(&self, pc: u64) -> Result<&Share, ExecError> {
        match self {
            Value::Private(share) => Ok(share),
            _ => Err(ExecError::UnexpectedTypeConversion { pc, expected: "Private" }),
        }
    }

    /// Returns the inner `(rho, sigma)` pair if this is a [`Value::PrivateRn`], or
    /// [`ExecError::UnexpectedTypeConversion`] otherwise.
    pub fn expect_private_rn(&self, pc: u64) -> Result<(&Share, &Share), ExecError> {
        match self {
            Value::PrivateRn(rho, sigma) => Ok((rho, sigma)),
            _ => Err(ExecError::UnexpectedTypeConversion { pc, expected: "PrivateRn" }),
        }
    }

    /// Addition. `Public + Public -> Public`, `Public + Private -> Private` (and vice versa),
    /// `Private + Private -> Private` provided both shares are at the same index.
    pub fn checked_add(&self, other: &Self, pc: u64) -> Result<Self, ExecError> {
        self.combine(
            other,
            pc,
            |a, b| a.checked_add(b).map_err(|e| ExecError::from_field(e, pc)),
            |a, b| a.checked_add(b).map_err(|e| ExecError::from_shamir(e, pc)),
        )
    }

    /// Subtraction. Same type rules as [`Value::checked_add`].
    pub fn checked_sub(&self, other: &Self, pc: u64) -> Result<Self, ExecError> {
        self.combine(
            other,
            pc,
            |a, b| a.checked_sub(b).map_err(|e| ExecError::from_field(e, pc)),
            |a, b| a.checked_sub(b).map_err(|e| ExecError::from_shamir(e, pc)),
        )
    }

    /// Negation.
    pub fn checked_neg(&self, pc: u64) -> Result<Self, ExecError> {
        match self {
            Value::Public(a) => Ok(Value::Public(a.neg())),
            Value::Private(share) => {
                let negated = share.value().neg();
                Ok(Value::Private(Share::new(share.index(), negated).expect("index preserved from valid share")))
            }
            Value::PrivateRn(..) => Err(ExecError::UnexpectedTypeConversion { pc, expected: "Public or Private" }),
        }
    }

    /// Multiplication where at least one operand is public (the `MulPub` instruction); fails if
    /// both operands are private, since that requires the asynchronous `Mul` instruction
    /// instead.
    pub fn checked_mul_pub(&self, other: &Self, pc: u64) -> Result<Self, ExecError> {
        match (self, other) {
            (Value::Public(a), Value::Public(b)) => {
                Ok(Value::Public(a.checked_mul(b).map_err(|e| ExecError::from_field(e, pc))?))
            }
            (Value::Public(a), Value::Private(share)) | (Value::Private(share), Value::Public(a)) => {
                let value = share.value().checked_mul(a).map_err(|e| ExecError::from_field(e, pc))?;
                Ok(Value::Private(Share::new(share.index(), value).expect("index preserved from valid share")))
            }
            _ => Err(ExecError::UnexpectedTypeConversion { pc, expected: "at least one Public operand" }),
        }
    }

    fn combine(
        &self,
        other: &Self,
        pc: u64,
        public_private_op: impl Fn(&FpElement, &FpElement) -> Result<FpElement, ExecError>,
        share_op: impl Fn(&Share, &Share) -> Result<Share, ExecError>,
    ) -> Result<Self, ExecError> {
        match (self, other) {
            (Value::Public(a), Value::Public(b)) => Ok(Value::Public(public_private_op(a, b)?)),
            (Value::Public(a), Value::Private(share)) => {
                let value = public_private_op(a, share.value())?;
                Ok(Value::Private(Share::new(share.index(), value).expect("index preserved from valid share")))
            }
            (Value::Private(share), Value::Public(a)) => {
                let value = public_private_op(share.value(), a)?;
                Ok(Value::Private(Share::new(share.index(), value).expect("index preserved from valid share")))
            }
            (Value::Private(a), Value::Private(b)) => Ok(Value::Private(share_op(a, b)?)),
            _ => Err(ExecError::UnexpectedTypeConversion { pc, expected: "Public or Private" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field::Fp;
    use num_bigint::BigUint;

    fn public(field: &Fp, v: u32) -> Value {
        Value::Public(field.new_in_field(BigUint::from(v)))
    }

    fn private(field: &Fp, index: u64, v: u32) -> Value {
        Value::Private(Share::new(index, field.new_in_field(BigUint::from(v))).unwrap())
    }

    #[test]
    fn public_add_public_is_public() {
        let field = Fp::small();
        let result = public(&field, 3).checked_add(&public(&field, 4), 0).unwrap();
        assert_eq!(result, public(&field, 7));
    }

    #[test]
    fn private_add_public_is_private() {
        let field = Fp::small();
        let result = private(&field, 2, 5).checked_add(&public(&field, 4), 0).unwrap();
        assert_eq!(result, private(&field, 2, 9));
    }

    #[test]
    fn private_add_private_mismatched_index_fails() {
        let field = Fp::small();
        let err = private(&field, 2, 5).checked_add(&private(&field, 3, 4), 0).unwrap_err();
        assert!(matches!(err, ExecError::ShareIndexMismatch { .. }));
    }

    #[test]
    fn mul_pub_requires_a_public_operand() {
        let field = Fp::small();
        let err = private(&field, 2, 5).checked_mul_pub(&private(&field, 2, 4), 0).unwrap_err();
        assert!(matches!(err, ExecError::UnexpectedTypeConversion { .. }));

        let result = private(&field, 2, 5).checked_mul_pub(&public(&field, 3), 0).unwrap();
        assert_eq!(result, private(&field, 2, 15));
    }
}
