//! Arithmetic Handlers
//!
//! Binary arithmetic on NUMBER cells using IEEE 754 single-precision
//! semantics. INTEGER operands coerce to NUMBER; the result is always a
//! NUMBER cell. Division by zero yields IEEE infinity or NaN, which are
//! values, not errors.

use stax_core::{Cell, VmError};

use crate::vm::Vm;

/// Pop a numeric operand, coercing INTEGER to float.
fn pop_operand(vm: &mut Vm, op: &'static str) -> Result<f32, VmError> {
    let cell = vm.pop(op)?;
    cell.as_arith().ok_or(VmError::InvalidTag {
        op,
        want: "NUMBER or INTEGER",
        got: cell.tag().name(),
    })
}

fn binary(vm: &mut Vm, op: &'static str, f: impl Fn(f32, f32) -> f32) -> Result<(), VmError> {
    let b = pop_operand(vm, op)?;
    let a = pop_operand(vm, op)?;
    vm.push(Cell::from_number(f(a, b)))
}

/// ( a b -- a+b )
pub fn add(vm: &mut Vm) -> Result<(), VmError> {
    binary(vm, "+", |a, b| a + b)
}

/// ( a b -- a-b )
pub fn sub(vm: &mut Vm) -> Result<(), VmError> {
    binary(vm, "-", |a, b| a - b)
}

/// ( a b -- a*b )
pub fn mul(vm: &mut Vm) -> Result<(), VmError> {
    binary(vm, "*", |a, b| a * b)
}

/// ( a b -- a/b )
pub fn div(vm: &mut Vm) -> Result<(), VmError> {
    binary(vm, "/", |a, b| a / b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_with(cells: &[Cell]) -> Vm {
        let mut vm = Vm::new();
        for &c in cells {
            vm.push(c).unwrap();
        }
        vm
    }

    #[test]
    fn test_add_numbers() {
        let mut vm = vm_with(&[Cell::from_number(2.0), Cell::from_number(3.0)]);
        add(&mut vm).unwrap();
        assert_eq!(vm.pop("t").unwrap().as_number(), 5.0);
        assert_eq!(vm.depth(), 0);
    }

    #[test]
    fn test_integer_coercion() {
        let mut vm = vm_with(&[Cell::from_int(2), Cell::from_int(3)]);
        add(&mut vm).unwrap();
        let result = vm.pop("t").unwrap();
        assert!(result.is_number());
        assert_eq!(result.as_number(), 5.0);
    }

    #[test]
    fn test_mixed_operands() {
        let mut vm = vm_with(&[Cell::from_int(10), Cell::from_number(0.5)]);
        mul(&mut vm).unwrap();
        assert_eq!(vm.pop("t").unwrap().as_number(), 5.0);
    }

    #[test]
    fn test_sub_order() {
        let mut vm = vm_with(&[Cell::from_int(10), Cell::from_int(4)]);
        sub(&mut vm).unwrap();
        assert_eq!(vm.pop("t").unwrap().as_number(), 6.0);
    }

    #[test]
    fn test_division_by_zero_is_soft() {
        let mut vm = vm_with(&[Cell::from_int(1), Cell::from_int(0)]);
        div(&mut vm).unwrap();
        assert_eq!(vm.pop("t").unwrap().as_number(), f32::INFINITY);

        let mut vm = vm_with(&[Cell::from_int(0), Cell::from_int(0)]);
        div(&mut vm).unwrap();
        assert!(vm.pop("t").unwrap().as_number().is_nan());
    }

    #[test]
    fn test_underflow() {
        let mut vm = vm_with(&[Cell::from_int(1)]);
        assert_eq!(add(&mut vm).unwrap_err(), VmError::StackUnderflow { op: "+" });
    }

    #[test]
    fn test_non_numeric_operand() {
        let mut vm = vm_with(&[Cell::from_int(1), Cell::from_string(0)]);
        let err = add(&mut vm).unwrap_err();
        assert_eq!(
            err,
            VmError::InvalidTag { op: "+", want: "NUMBER or INTEGER", got: "STRING" }
        );
    }
}
