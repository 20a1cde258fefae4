use rspirv::spirv;

use crate::data::Id;

/// An all encompassing error type
///
/// Any of these abort reflection of the whole module, no partially
/// reflected module is ever returned
#[derive(Debug)]
pub enum ReflectError {
    /// The decoder rejected the binary
    Parse(rspirv::binary::ParseState),
    /// Spirv bytes must be 4 byte alligned
    NotMultipleOfFour,
    /// Missing the spirv magic number
    MissingMagicNumber,
    /// An instruction didn't carry the operand the opcode requires
    Operand(OperandError),
    /// The id is used as a type but no type instruction defines it
    UnresolvedType(Id),
    /// The id is a type but not of the category required where it's used
    UnexpectedType {
        /// the offending type
        id: Id,
        /// what category was required
        expected: &'static str,
    },
    /// The type contains itself
    RecursiveType(Id),
    /// Struct self.structure has no name for member self.member
    MissingMemberName {
        /// the struct type
        structure: Id,
        /// index of the member
        member: u32,
    },
    /// Struct self.structure has no offset for member self.member
    MissingMemberOffset {
        /// the struct type
        structure: Id,
        /// index of the member
        member: u32,
    },
    /// A diagnostic that was promoted to an error by [`crate::ReflectDesc::strict`]
    Anomaly(Diagnostic),
}

impl std::fmt::Display for ReflectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "ERROR: Failed to decode spirv: {:?}", e),
            Self::NotMultipleOfFour => write!(f, "ERROR: Spirv bytes len must be multiple of 4"),
            Self::MissingMagicNumber => write!(f, "ERROR: Missing spirv magic number"),
            Self::Operand(e) => write!(f, "{}", e),
            Self::UnresolvedType(id) => write!(f, "ERROR: No type found for id {}", id),
            Self::UnexpectedType { id, expected } => {
                write!(f, "ERROR: Type {} used where a {} type was expected", id, expected)
            }
            Self::RecursiveType(id) => write!(f, "ERROR: Type {} contains itself", id),
            Self::MissingMemberName { structure, member } => write!(
                f,
                "ERROR: Struct {} has no name for member {}",
                structure, member
            ),
            Self::MissingMemberOffset { structure, member } => write!(
                f,
                "ERROR: Struct {} has no offset for member {}",
                structure, member
            ),
            Self::Anomaly(d) => write!(f, "ERROR: {}", d),
        }
    }
}

impl std::error::Error for ReflectError {}

impl From<OperandError> for ReflectError {
    fn from(e: OperandError) -> Self {
        Self::Operand(e)
    }
}

impl From<rspirv::binary::ParseState> for ReflectError {
    fn from(e: rspirv::binary::ParseState) -> Self {
        Self::Parse(e)
    }
}

/// Reading operand self.index of an instruction with opcode self.opcode failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandError {
    /// opcode of the instruction being read
    pub opcode: spirv::Op,
    /// index into the operand list
    pub index: usize,
    /// the kind of operand that was asked for
    pub expected: &'static str,
}

impl std::fmt::Display for OperandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ERROR: Op{:?} operand {} is not a {}",
            self.opcode, self.index, self.expected
        )
    }
}

impl std::error::Error for OperandError {}

/// Something odd about the module that didn't stop it being reflected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The instruction is understood but reflection doesn't support it.
    /// Anything that depends on its result will fail to resolve later
    Unsupported {
        opcode: spirv::Op,
        target: Option<Id>,
    },
    /// The variable's declared type isn't a pointer type so it was used as is
    MissingPointer {
        variable: Id,
        declared: Id,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported { opcode, target: Some(target) } => {
                write!(f, "Op{:?} (result {}) is not supported", opcode, target)
            }
            Self::Unsupported { opcode, target: None } => {
                write!(f, "Op{:?} is not supported", opcode)
            }
            Self::MissingPointer { variable, declared } => write!(
                f,
                "Variable {} declared with type {} which isn't a pointer type, using it directly",
                variable, declared
            ),
        }
    }
}
