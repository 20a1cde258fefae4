//! Typed reads of the operands of a decoded instruction

use rspirv::dr;
use rspirv::spirv;

use crate::data::Id;
use crate::error::OperandError;

/// Conversion from a single decoded operand
pub trait FromOperand: Sized {
    /// Name of the operand kind, used in errors
    const EXPECTED: &'static str;

    fn from_operand(operand: &dr::Operand) -> Option<Self>;
}

impl FromOperand for u32 {
    const EXPECTED: &'static str = "32 bit literal or id";

    fn from_operand(operand: &dr::Operand) -> Option<Self> {
        match operand {
            dr::Operand::LiteralInt32(v) => Some(*v),
            dr::Operand::LiteralExtInstInteger(v) => Some(*v),
            dr::Operand::IdRef(v) | dr::Operand::IdScope(v) | dr::Operand::IdMemorySemantics(v) => {
                Some(*v)
            }
            _ => None,
        }
    }
}

impl FromOperand for Id {
    const EXPECTED: &'static str = "id";

    fn from_operand(operand: &dr::Operand) -> Option<Self> {
        match operand {
            dr::Operand::IdRef(v) => Some(Id(*v)),
            _ => None,
        }
    }
}

macro_rules! impl_from_operand_enum {
    ($($name:ident,)*) => {
        $(
            impl FromOperand for spirv::$name {
                const EXPECTED: &'static str = stringify!($name);

                fn from_operand(operand: &dr::Operand) -> Option<Self> {
                    match operand {
                        dr::Operand::$name(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_operand_enum!(
    StorageClass,
    Decoration,
    Dim,
    ExecutionModel,
    ImageFormat,
    BuiltIn,
);

/// Operand accessor for one instruction
///
/// Indices count from the first operand after the result type and result id,
/// which are read with [`Operands::result_type`] and [`Operands::result_id`]
#[derive(Clone, Copy, Debug)]
pub struct Operands<'a> {
    inst: &'a dr::Instruction,
}

impl<'a> Operands<'a> {
    pub fn new(inst: &'a dr::Instruction) -> Self {
        Self { inst }
    }

    pub fn opcode(&self) -> spirv::Op {
        self.inst.class.opcode
    }

    pub fn result_id(&self) -> Option<Id> {
        self.inst.result_id.map(Id)
    }

    pub fn result_type(&self) -> Option<Id> {
        self.inst.result_type.map(Id)
    }

    pub fn len(&self) -> usize {
        self.inst.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inst.operands.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a dr::Operand> {
        self.inst.operands.get(index)
    }

    fn error<T: FromOperand>(&self, index: usize) -> OperandError {
        OperandError {
            opcode: self.opcode(),
            index,
            expected: T::EXPECTED,
        }
    }

    /// Result id, required by every instruction that defines something
    pub fn expect_result_id(&self) -> Result<Id, OperandError> {
        self.result_id().ok_or(OperandError {
            opcode: self.opcode(),
            index: 0,
            expected: "result id",
        })
    }

    /// Result type, required by variables and constants
    pub fn expect_result_type(&self) -> Result<Id, OperandError> {
        self.result_type().ok_or(OperandError {
            opcode: self.opcode(),
            index: 0,
            expected: "result type",
        })
    }

    pub fn read<T: FromOperand>(&self, index: usize) -> Result<T, OperandError> {
        self.get(index)
            .and_then(T::from_operand)
            .ok_or_else(|| self.error::<T>(index))
    }

    /// Reads an optional operand, `default` if the instruction is too short
    pub fn read_or<T: FromOperand>(&self, index: usize, default: T) -> Result<T, OperandError> {
        match self.get(index) {
            Some(operand) => T::from_operand(operand).ok_or_else(|| self.error::<T>(index)),
            None => Ok(default),
        }
    }

    pub fn read_n<T: FromOperand>(&self, index: usize, count: usize) -> Result<Vec<T>, OperandError> {
        (index..index + count).map(|i| self.read(i)).collect()
    }

    /// Reads every operand from `index` to the end of the instruction
    pub fn read_rest<T: FromOperand>(&self, index: usize) -> Result<Vec<T>, OperandError> {
        (index..self.len().max(index)).map(|i| self.read(i)).collect()
    }

    pub fn read_string(&self, index: usize) -> Result<&'a str, OperandError> {
        match self.get(index) {
            Some(dr::Operand::LiteralString(s)) => Ok(s.as_str()),
            _ => Err(OperandError {
                opcode: self.opcode(),
                index,
                expected: "string",
            }),
        }
    }

    /// The raw words of a numeric literal, low order word first
    pub fn literal_words(&self, index: usize) -> Result<Vec<u32>, OperandError> {
        match self.get(index) {
            Some(dr::Operand::LiteralInt32(v)) => Ok(vec![*v]),
            Some(dr::Operand::LiteralFloat32(v)) => Ok(vec![v.to_bits()]),
            Some(dr::Operand::LiteralInt64(v)) => Ok(split_u64(*v)),
            Some(dr::Operand::LiteralFloat64(v)) => Ok(split_u64(v.to_bits())),
            _ => Err(OperandError {
                opcode: self.opcode(),
                index,
                expected: "numeric literal",
            }),
        }
    }
}

fn split_u64(v: u64) -> Vec<u32> {
    vec![v as u32, (v >> 32) as u32]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorate(target: u32, decoration: spirv::Decoration, extra: Vec<dr::Operand>) -> dr::Instruction {
        let mut operands = vec![dr::Operand::IdRef(target), dr::Operand::Decoration(decoration)];
        operands.extend(extra);
        dr::Instruction::new(spirv::Op::Decorate, None, None, operands)
    }

    #[test]
    fn reads_typed_operands() {
        let inst = decorate(7, spirv::Decoration::Location, vec![dr::Operand::LiteralInt32(3)]);
        let ops = Operands::new(&inst);

        assert_eq!(ops.opcode(), spirv::Op::Decorate);
        assert_eq!(ops.read::<Id>(0), Ok(Id(7)));
        assert_eq!(ops.read::<spirv::Decoration>(1), Ok(spirv::Decoration::Location));
        assert_eq!(ops.read::<u32>(2), Ok(3));
        assert_eq!(ops.result_id(), None);
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let inst = decorate(7, spirv::Decoration::Location, vec![dr::Operand::LiteralInt32(3)]);
        let ops = Operands::new(&inst);

        let err = ops.read::<spirv::StorageClass>(1).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.opcode, spirv::Op::Decorate);
        assert_eq!(err.expected, "StorageClass");
        assert!(ops.read::<u32>(5).is_err());
    }

    #[test]
    fn read_or_defaults_only_when_absent() {
        let inst = decorate(7, spirv::Decoration::Block, vec![]);
        let ops = Operands::new(&inst);
        assert_eq!(ops.read_or::<u32>(2, 9), Ok(9));

        let inst = decorate(7, spirv::Decoration::Binding, vec![dr::Operand::LiteralString("x".into())]);
        let ops = Operands::new(&inst);
        assert!(ops.read_or::<u32>(2, 9).is_err());
    }

    #[test]
    fn rest_and_fixed_lists() {
        let inst = dr::Instruction::new(
            spirv::Op::TypeStruct,
            None,
            Some(10),
            vec![dr::Operand::IdRef(1), dr::Operand::IdRef(2), dr::Operand::IdRef(3)],
        );
        let ops = Operands::new(&inst);

        assert_eq!(ops.read_rest::<Id>(0), Ok(vec![Id(1), Id(2), Id(3)]));
        assert_eq!(ops.read_rest::<Id>(2), Ok(vec![Id(3)]));
        assert_eq!(ops.read_rest::<Id>(3), Ok(vec![]));
        assert_eq!(ops.read_rest::<Id>(8), Ok(vec![]));
        assert_eq!(ops.read_n::<Id>(1, 2), Ok(vec![Id(2), Id(3)]));
        assert!(ops.read_n::<Id>(2, 2).is_err());
        assert_eq!(ops.result_id(), Some(Id(10)));
    }

    #[test]
    fn strings_and_literals() {
        let inst = dr::Instruction::new(
            spirv::Op::Name,
            None,
            None,
            vec![dr::Operand::IdRef(4), dr::Operand::LiteralString("vertex".into())],
        );
        let ops = Operands::new(&inst);
        assert_eq!(ops.read_string(1), Ok("vertex"));
        assert!(ops.read_string(0).is_err());

        let inst = dr::Instruction::new(
            spirv::Op::Constant,
            Some(1),
            Some(2),
            vec![dr::Operand::LiteralFloat32(1.0)],
        );
        assert_eq!(Operands::new(&inst).literal_words(0), Ok(vec![0x3f80_0000]));

        let inst = dr::Instruction::new(
            spirv::Op::Constant,
            Some(1),
            Some(2),
            vec![dr::Operand::LiteralInt64(0x0000_0001_0000_0002)],
        );
        assert_eq!(Operands::new(&inst).literal_words(0), Ok(vec![2, 1]));
    }
}
