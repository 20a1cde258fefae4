//! First pass: collect per id facts from the instruction stream
//!
//! Nothing here looks across instructions. Names, decorations and member
//! info can arrive before or after the instruction defining their target so
//! they're only stored, all matching up happens in [`crate::resolve`] and
//! [`crate::bind`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rspirv::dr;
use rspirv::spirv;

use crate::data::{Id, MemberKey};
use crate::error::{Diagnostic, ReflectError};
use crate::module::EntryPoint;
use crate::operand::Operands;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VariableFact {
    /// always a pointer type in valid modules
    pub ty: Id,
    pub storage_class: spirv::StorageClass,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PointerFact {
    pub storage_class: spirv::StorageClass,
    pub pointee: Id,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DecorationFact {
    pub kind: spirv::Decoration,
    /// first extra operand, if it's a single word
    pub operand: Option<u32>,
}

/// Which type instruction a [`PrimitiveFact`] came from
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PrimitiveOp {
    Void,
    Bool,
    Int,
    Float,
    Vector,
    Matrix,
    Array,
    RuntimeArray,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PrimitiveFact {
    pub op: PrimitiveOp,
    /// component type of vectors, column type of matrices, element type of arrays
    pub element: Id,
    /// bit width for scalars, component count for vectors, column count for
    /// matrices, id of the length constant for arrays
    pub argument: u32,
    pub signed: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StructFact {
    pub members: Vec<Id>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ImageFact {
    pub sampled_type: Id,
    pub dim: spirv::Dim,
    /// 0 no depth, 1 depth, 2 unknown
    pub depth: u32,
    pub arrayed: bool,
    pub multisampled: bool,
    /// 0 unknown, 1 sampled, 2 storage
    pub sampled: u32,
    pub format: spirv::ImageFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SampledImageFact {
    pub image: Id,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConstantFact {
    pub ty: Id,
    pub value: Vec<u32>,
    /// defined by one of the OpSpecConstant* instructions
    pub spec_op: bool,
}

/// Everything the first pass learnt about the module, keyed by id
#[derive(Clone, Default, Debug)]
pub struct Facts {
    pub variables: BTreeMap<Id, VariableFact>,
    pub names: HashMap<Id, String>,
    pub member_names: HashMap<MemberKey, String>,
    pub member_offsets: HashMap<MemberKey, u32>,
    pub pointers: BTreeMap<Id, PointerFact>,
    pub decorations: HashMap<Id, Vec<DecorationFact>>,
    pub primitives: BTreeMap<Id, PrimitiveFact>,
    pub structs: BTreeMap<Id, StructFact>,
    pub images: BTreeMap<Id, ImageFact>,
    pub samplers: BTreeSet<Id>,
    pub sampled_images: BTreeMap<Id, SampledImageFact>,
    pub constants: BTreeMap<Id, ConstantFact>,
    pub entry_points: Vec<EntryPoint>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Facts {
    pub fn decorations(&self, id: Id) -> &[DecorationFact] {
        self.decorations.get(&id).map(|d| d.as_slice()).unwrap_or(&[])
    }

    pub fn name(&self, id: Id) -> &str {
        self.names.get(&id).map(|n| n.as_str()).unwrap_or("")
    }
}

/// Collects the facts from every instruction in one forward pass
///
/// Unknown opcodes are skipped. Fails only if an instruction that is
/// understood doesn't carry the operands its opcode requires
pub fn ingest<'a, I>(instructions: I) -> Result<Facts, ReflectError>
where
    I: IntoIterator<Item = &'a dr::Instruction>,
{
    let mut facts = Facts::default();
    for inst in instructions {
        ingest_instruction(&mut facts, Operands::new(inst))?;
    }
    Ok(facts)
}

fn ingest_instruction(facts: &mut Facts, ops: Operands<'_>) -> Result<(), ReflectError> {
    use spirv::Op;

    match ops.opcode() {
        Op::EntryPoint => facts.entry_points.push(EntryPoint {
            execution_model: ops.read(0)?,
            function: ops.read(1)?,
            name: ops.read_string(2)?.to_owned(),
            interface: ops.read_rest(3)?,
        }),
        Op::Name => {
            facts.names.insert(ops.read(0)?, ops.read_string(1)?.to_owned());
        }
        Op::MemberName => {
            let key = MemberKey::new(ops.read(0)?, ops.read(1)?);
            facts.member_names.insert(key, ops.read_string(2)?.to_owned());
        }
        Op::Decorate => {
            let target = ops.read(0)?;
            let decoration = DecorationFact {
                kind: ops.read(1)?,
                operand: ops.get(2).and_then(decoration_operand),
            };
            facts.decorations.entry(target).or_default().push(decoration);
        }
        Op::MemberDecorate => {
            if ops.read::<spirv::Decoration>(2)? == spirv::Decoration::Offset {
                let key = MemberKey::new(ops.read(0)?, ops.read(1)?);
                facts.member_offsets.insert(key, ops.read(3)?);
            }
        }
        Op::Variable => {
            facts.variables.insert(
                ops.expect_result_id()?,
                VariableFact {
                    ty: ops.expect_result_type()?,
                    storage_class: ops.read(0)?,
                },
            );
        }
        Op::TypePointer => {
            facts.pointers.insert(
                ops.expect_result_id()?,
                PointerFact {
                    storage_class: ops.read(0)?,
                    pointee: ops.read(1)?,
                },
            );
        }
        Op::TypeVoid => insert_primitive(facts, &ops, PrimitiveOp::Void, Id::NONE, 0, false)?,
        Op::TypeBool => insert_primitive(facts, &ops, PrimitiveOp::Bool, Id::NONE, 0, false)?,
        Op::TypeInt => {
            let signed = ops.read::<u32>(1)? != 0;
            insert_primitive(facts, &ops, PrimitiveOp::Int, Id::NONE, ops.read(0)?, signed)?
        }
        Op::TypeFloat => insert_primitive(facts, &ops, PrimitiveOp::Float, Id::NONE, ops.read(0)?, false)?,
        Op::TypeVector => insert_primitive(facts, &ops, PrimitiveOp::Vector, ops.read(0)?, ops.read(1)?, false)?,
        Op::TypeMatrix => insert_primitive(facts, &ops, PrimitiveOp::Matrix, ops.read(0)?, ops.read(1)?, false)?,
        Op::TypeArray => {
            let length: Id = ops.read(1)?;
            insert_primitive(facts, &ops, PrimitiveOp::Array, ops.read(0)?, length.0, false)?
        }
        Op::TypeRuntimeArray => {
            insert_primitive(facts, &ops, PrimitiveOp::RuntimeArray, ops.read(0)?, 0, false)?
        }
        Op::TypeStruct => {
            facts.structs.insert(
                ops.expect_result_id()?,
                StructFact {
                    members: ops.read_rest(0)?,
                },
            );
        }
        Op::TypeImage => {
            facts.images.insert(
                ops.expect_result_id()?,
                ImageFact {
                    sampled_type: ops.read(0)?,
                    dim: ops.read(1)?,
                    depth: ops.read(2)?,
                    arrayed: ops.read::<u32>(3)? != 0,
                    multisampled: ops.read::<u32>(4)? != 0,
                    sampled: ops.read(5)?,
                    format: ops.read_or(6, spirv::ImageFormat::Unknown)?,
                },
            );
        }
        Op::TypeSampler => {
            facts.samplers.insert(ops.expect_result_id()?);
        }
        Op::TypeSampledImage => {
            facts.sampled_images.insert(
                ops.expect_result_id()?,
                SampledImageFact { image: ops.read(0)? },
            );
        }
        Op::Constant | Op::SpecConstant => {
            insert_constant(facts, &ops, ops.literal_words(0)?)?;
        }
        Op::ConstantTrue | Op::SpecConstantTrue => insert_constant(facts, &ops, vec![1])?,
        Op::ConstantFalse | Op::SpecConstantFalse => insert_constant(facts, &ops, vec![0])?,
        Op::ConstantNull => insert_constant(facts, &ops, Vec::new())?,
        Op::ConstantComposite
        | Op::SpecConstantComposite
        | Op::SpecConstantOp
        | Op::DecorationGroup
        | Op::GroupDecorate
        | Op::GroupMemberDecorate => {
            let diagnostic = Diagnostic::Unsupported {
                opcode: ops.opcode(),
                target: ops.result_id(),
            };
            #[cfg(feature = "logging")]
            log::warn!("REFLECT: {}", diagnostic);
            facts.diagnostics.push(diagnostic);
        }
        _ => (),
    }

    Ok(())
}

fn insert_primitive(
    facts: &mut Facts,
    ops: &Operands<'_>,
    op: PrimitiveOp,
    element: Id,
    argument: u32,
    signed: bool,
) -> Result<(), ReflectError> {
    facts.primitives.insert(
        ops.expect_result_id()?,
        PrimitiveFact {
            op,
            element,
            argument,
            signed,
        },
    );
    Ok(())
}

fn insert_constant(facts: &mut Facts, ops: &Operands<'_>, value: Vec<u32>) -> Result<(), ReflectError> {
    let spec_op = matches!(
        ops.opcode(),
        spirv::Op::SpecConstant | spirv::Op::SpecConstantTrue | spirv::Op::SpecConstantFalse
    );
    facts.constants.insert(
        ops.expect_result_id()?,
        ConstantFact {
            ty: ops.expect_result_type()?,
            value,
            spec_op,
        },
    );
    Ok(())
}

fn decoration_operand(operand: &dr::Operand) -> Option<u32> {
    match operand {
        dr::Operand::LiteralInt32(v) => Some(*v),
        dr::Operand::IdRef(v) => Some(*v),
        dr::Operand::BuiltIn(b) => Some(*b as u32),
        _ => None,
    }
}
