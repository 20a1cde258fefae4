//! Second pass: turn type facts into self contained type records
//!
//! Each id is resolved the first time something asks for it and cached in
//! [`TypeTables`], later requests are a table lookup.

use std::collections::{BTreeMap, HashSet};

use crate::data::*;
use crate::error::ReflectError;
use crate::ingest::{Facts, PrimitiveFact, PrimitiveOp};

/// The resolved types, one table per category. An id is in at most one table
#[derive(Clone, Default, PartialEq, Debug)]
pub(crate) struct TypeTables {
    pub primitives: BTreeMap<Id, PrimitiveType>,
    pub structs: BTreeMap<Id, StructType>,
    pub images: BTreeMap<Id, ImageType>,
    pub samplers: BTreeMap<Id, SamplerType>,
    pub sampled_images: BTreeMap<Id, SampledImageType>,
}

impl TypeTables {
    pub fn kind(&self, id: Id) -> Option<TypeKind> {
        if self.primitives.contains_key(&id) {
            Some(TypeKind::Primitive)
        } else if self.structs.contains_key(&id) {
            Some(TypeKind::Struct)
        } else if self.images.contains_key(&id) {
            Some(TypeKind::Image)
        } else if self.samplers.contains_key(&id) {
            Some(TypeKind::Sampler)
        } else if self.sampled_images.contains_key(&id) {
            Some(TypeKind::SampledImage)
        } else {
            None
        }
    }

    pub fn get(&self, id: Id) -> Option<Type<'_>> {
        match self.kind(id)? {
            TypeKind::Primitive => self.primitives.get(&id).map(Type::Primitive),
            TypeKind::Struct => self.structs.get(&id).map(Type::Struct),
            TypeKind::Image => self.images.get(&id).map(Type::Image),
            TypeKind::Sampler => self.samplers.get(&id).map(Type::Sampler),
            TypeKind::SampledImage => self.sampled_images.get(&id).map(Type::SampledImage),
        }
    }
}

pub(crate) struct TypeResolver<'a> {
    facts: &'a Facts,
    tables: TypeTables,
    in_progress: HashSet<Id>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(facts: &'a Facts) -> Self {
        Self {
            facts,
            tables: TypeTables::default(),
            in_progress: HashSet::new(),
        }
    }

    #[cfg(test)]
    pub fn tables(&self) -> &TypeTables {
        &self.tables
    }

    pub fn finish(self) -> TypeTables {
        self.tables
    }

    /// Resolves `id` and everything it references, returning which table it ended up in
    pub fn resolve(&mut self, id: Id) -> Result<TypeKind, ReflectError> {
        if let Some(kind) = self.tables.kind(id) {
            return Ok(kind);
        }
        if !self.in_progress.insert(id) {
            return Err(ReflectError::RecursiveType(id));
        }
        let result = self.resolve_uncached(id);
        self.in_progress.remove(&id);
        result
    }

    fn resolve_uncached(&mut self, id: Id) -> Result<TypeKind, ReflectError> {
        let facts = self.facts;

        if let Some(fact) = facts.primitives.get(&id) {
            return self.resolve_primitive_fact(id, fact);
        }
        if let Some(fact) = facts.structs.get(&id) {
            let mut members = Vec::with_capacity(fact.members.len());
            for (index, &ty) in fact.members.iter().enumerate() {
                let key = MemberKey::new(id, index as u32);
                let name = facts
                    .member_names
                    .get(&key)
                    .ok_or(ReflectError::MissingMemberName {
                        structure: id,
                        member: key.index,
                    })?;
                let offset = facts
                    .member_offsets
                    .get(&key)
                    .ok_or(ReflectError::MissingMemberOffset {
                        structure: id,
                        member: key.index,
                    })?;
                self.resolve(ty)?;
                members.push(StructMember {
                    ty,
                    name: name.clone(),
                    offset: *offset,
                });
            }
            self.tables.structs.insert(
                id,
                StructType {
                    is_array: false,
                    array_length: Id::NONE,
                    name: facts.name(id).to_owned(),
                    members,
                },
            );
            return Ok(TypeKind::Struct);
        }
        if let Some(fact) = facts.images.get(&id) {
            self.tables.images.insert(
                id,
                ImageType {
                    sampled_type: fact.sampled_type,
                    dim: fact.dim,
                    arrayed: fact.arrayed,
                    multisampled: fact.multisampled,
                    is_array: false,
                    array_length: Id::NONE,
                },
            );
            return Ok(TypeKind::Image);
        }
        if facts.samplers.contains(&id) {
            self.tables.samplers.insert(id, SamplerType::default());
            return Ok(TypeKind::Sampler);
        }
        if let Some(fact) = facts.sampled_images.get(&id) {
            self.tables.sampled_images.insert(
                id,
                SampledImageType {
                    image: fact.image,
                    is_array: false,
                    array_length: Id::NONE,
                },
            );
            return Ok(TypeKind::SampledImage);
        }

        Err(ReflectError::UnresolvedType(id))
    }

    fn resolve_primitive_fact(&mut self, id: Id, fact: &PrimitiveFact) -> Result<TypeKind, ReflectError> {
        let ty = match fact.op {
            PrimitiveOp::Void => PrimitiveType::scalar(PrimitiveKind::Void, 0, false),
            PrimitiveOp::Bool => PrimitiveType::scalar(PrimitiveKind::Bool, 0, false),
            PrimitiveOp::Int => PrimitiveType::scalar(PrimitiveKind::Int, fact.argument, fact.signed),
            PrimitiveOp::Float => PrimitiveType::scalar(PrimitiveKind::Float, fact.argument, false),
            PrimitiveOp::Vector => {
                let component = self.primitive(fact.element, "scalar")?;
                if !component.is_scalar() || component.is_array {
                    return Err(ReflectError::UnexpectedType {
                        id: fact.element,
                        expected: "scalar",
                    });
                }
                PrimitiveType {
                    rows: fact.argument,
                    cols: 1,
                    ..component
                }
            }
            PrimitiveOp::Matrix => {
                let column = self.primitive(fact.element, "vector")?;
                if !column.is_vector() || column.is_array {
                    return Err(ReflectError::UnexpectedType {
                        id: fact.element,
                        expected: "vector",
                    });
                }
                PrimitiveType {
                    cols: fact.argument,
                    ..column
                }
            }
            PrimitiveOp::Array => return self.resolve_array(id, fact.element, Id(fact.argument)),
            PrimitiveOp::RuntimeArray => return self.resolve_array(id, fact.element, Id::NONE),
        };
        self.tables.primitives.insert(id, ty);
        Ok(TypeKind::Primitive)
    }

    fn primitive(&mut self, id: Id, expected: &'static str) -> Result<PrimitiveType, ReflectError> {
        self.resolve(id)?;
        self.tables
            .primitives
            .get(&id)
            .copied()
            .ok_or(ReflectError::UnexpectedType { id, expected })
    }

    /// The array id gets a copy of its element marked as an array, the
    /// element keeps its own entry untouched
    fn resolve_array(&mut self, id: Id, element: Id, length: Id) -> Result<TypeKind, ReflectError> {
        let kind = self.resolve(element)?;
        let tables = &mut self.tables;
        match kind {
            TypeKind::Primitive => {
                if let Some(ty) = tables.primitives.get(&element).copied() {
                    tables.primitives.insert(
                        id,
                        PrimitiveType {
                            is_array: true,
                            array_length: length,
                            ..ty
                        },
                    );
                }
            }
            TypeKind::Struct => {
                if let Some(ty) = tables.structs.get(&element).cloned() {
                    tables.structs.insert(
                        id,
                        StructType {
                            is_array: true,
                            array_length: length,
                            ..ty
                        },
                    );
                }
            }
            TypeKind::Image => {
                if let Some(ty) = tables.images.get(&element).copied() {
                    tables.images.insert(
                        id,
                        ImageType {
                            is_array: true,
                            array_length: length,
                            ..ty
                        },
                    );
                }
            }
            TypeKind::Sampler => {
                tables.samplers.insert(
                    id,
                    SamplerType {
                        is_array: true,
                        array_length: length,
                    },
                );
            }
            TypeKind::SampledImage => {
                if let Some(ty) = tables.sampled_images.get(&element).copied() {
                    tables.sampled_images.insert(
                        id,
                        SampledImageType {
                            is_array: true,
                            array_length: length,
                            ..ty
                        },
                    );
                }
            }
        }
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use rspirv::dr;
    use rspirv::spirv;

    use super::*;
    use crate::ingest::ingest;

    fn inst(op: spirv::Op, result_id: u32, operands: Vec<dr::Operand>) -> dr::Instruction {
        dr::Instruction::new(op, None, Some(result_id), operands)
    }

    fn lit(v: u32) -> dr::Operand {
        dr::Operand::LiteralInt32(v)
    }

    fn id(v: u32) -> dr::Operand {
        dr::Operand::IdRef(v)
    }

    fn member_name(structure: u32, member: u32, name: &str) -> dr::Instruction {
        dr::Instruction::new(
            spirv::Op::MemberName,
            None,
            None,
            vec![id(structure), lit(member), dr::Operand::LiteralString(name.into())],
        )
    }

    fn member_offset(structure: u32, member: u32, offset: u32) -> dr::Instruction {
        dr::Instruction::new(
            spirv::Op::MemberDecorate,
            None,
            None,
            vec![
                id(structure),
                lit(member),
                dr::Operand::Decoration(spirv::Decoration::Offset),
                lit(offset),
            ],
        )
    }

    /// %1 float, %2 vec3, %3 mat4 (of %4 vec4), %5 int, %6 uint
    fn primitives() -> Vec<dr::Instruction> {
        vec![
            inst(spirv::Op::TypeFloat, 1, vec![lit(32)]),
            inst(spirv::Op::TypeVector, 2, vec![id(1), lit(3)]),
            inst(spirv::Op::TypeMatrix, 3, vec![id(4), lit(4)]),
            inst(spirv::Op::TypeVector, 4, vec![id(1), lit(4)]),
            inst(spirv::Op::TypeInt, 5, vec![lit(32), lit(1)]),
            inst(spirv::Op::TypeInt, 6, vec![lit(32), lit(0)]),
        ]
    }

    #[test]
    fn scalars_vectors_and_matrices() {
        let facts = ingest(&primitives()).unwrap();
        let mut resolver = TypeResolver::new(&facts);

        assert_eq!(resolver.resolve(Id(3)).unwrap(), TypeKind::Primitive);
        resolver.resolve(Id(2)).unwrap();
        resolver.resolve(Id(5)).unwrap();
        resolver.resolve(Id(6)).unwrap();
        let tables = resolver.finish();

        let mat4 = tables.primitives[&Id(3)];
        assert_eq!((mat4.kind, mat4.rows, mat4.cols, mat4.width), (PrimitiveKind::Float, 4, 4, 32));
        assert!(mat4.is_matrix());
        // the column type was resolved on the way
        assert_eq!(tables.primitives[&Id(4)].rows, 4);
        assert_eq!(tables.primitives[&Id(4)].cols, 1);

        let vec3 = tables.primitives[&Id(2)];
        assert_eq!((vec3.rows, vec3.cols), (3, 1));
        assert!(vec3.is_vector());

        assert!(tables.primitives[&Id(5)].signed);
        assert!(!tables.primitives[&Id(6)].signed);
        assert!(!tables.primitives[&Id(1)].signed);
    }

    #[test]
    fn array_of_primitive_keeps_length_id() {
        let mut insts = primitives();
        insts.push(dr::Instruction::new(spirv::Op::Constant, Some(6), Some(7), vec![lit(8)]));
        insts.push(inst(spirv::Op::TypeArray, 8, vec![id(2), id(7)]));
        insts.push(inst(spirv::Op::TypeRuntimeArray, 9, vec![id(1)]));
        let facts = ingest(&insts).unwrap();
        let mut resolver = TypeResolver::new(&facts);

        resolver.resolve(Id(8)).unwrap();
        resolver.resolve(Id(9)).unwrap();
        let tables = resolver.finish();

        let array = tables.primitives[&Id(8)];
        assert!(array.is_array);
        assert_eq!(array.array_length, Id(7));
        assert_eq!(array.rows, 3);
        assert!(!tables.primitives[&Id(2)].is_array);

        let runtime = tables.primitives[&Id(9)];
        assert!(runtime.is_array);
        assert!(runtime.array_length.is_none());
    }

    /// %10 struct { float a; vec3 b; }, %12 array of %10 with length %11
    fn struct_module(with_offsets: bool) -> Vec<dr::Instruction> {
        let mut insts = primitives();
        insts.push(inst(spirv::Op::TypeStruct, 10, vec![id(1), id(2)]));
        insts.push(dr::Instruction::new(spirv::Op::Constant, Some(6), Some(11), vec![lit(4)]));
        insts.push(inst(spirv::Op::TypeArray, 12, vec![id(10), id(11)]));
        insts.push(dr::Instruction::new(
            spirv::Op::Name,
            None,
            None,
            vec![id(10), dr::Operand::LiteralString("Light".into())],
        ));
        insts.push(member_name(10, 1, "b"));
        insts.push(member_name(10, 0, "a"));
        insts.push(member_offset(10, 0, 0));
        if with_offsets {
            insts.push(member_offset(10, 1, 16));
        }
        insts
    }

    #[test]
    fn array_of_struct_gets_its_own_entry() {
        let facts = ingest(&struct_module(true)).unwrap();
        let mut resolver = TypeResolver::new(&facts);

        assert_eq!(resolver.resolve(Id(12)).unwrap(), TypeKind::Struct);
        let tables = resolver.finish();

        let array = &tables.structs[&Id(12)];
        let element = &tables.structs[&Id(10)];
        assert!(array.is_array);
        assert_eq!(array.array_length, Id(11));
        assert!(!element.is_array);
        assert!(element.array_length.is_none());
        assert_eq!(array.members, element.members);
        assert_eq!(element.name, "Light");

        let names = element.members.iter().map(|m| (m.name.as_str(), m.offset, m.ty)).collect::<Vec<_>>();
        assert_eq!(names, vec![("a", 0, Id(1)), ("b", 16, Id(2))]);
        // member types are resolved along with the struct
        assert!(tables.primitives.contains_key(&Id(2)));
    }

    #[test]
    fn missing_member_offset_is_fatal() {
        let facts = ingest(&struct_module(false)).unwrap();
        let mut resolver = TypeResolver::new(&facts);

        match resolver.resolve(Id(10)) {
            Err(ReflectError::MissingMemberOffset { structure, member }) => {
                assert_eq!(structure, Id(10));
                assert_eq!(member, 1);
            }
            r => panic!("expected missing offset, got {:?}", r),
        }
        assert!(resolver.tables().structs.is_empty());
    }

    #[test]
    fn missing_member_name_is_fatal() {
        let mut insts = primitives();
        insts.push(inst(spirv::Op::TypeStruct, 10, vec![id(1)]));
        insts.push(member_offset(10, 0, 0));
        let facts = ingest(&insts).unwrap();

        assert!(matches!(
            TypeResolver::new(&facts).resolve(Id(10)),
            Err(ReflectError::MissingMemberName { member: 0, .. })
        ));
    }

    #[test]
    fn unknown_ids_do_not_resolve() {
        let facts = ingest(&primitives()).unwrap();
        let mut resolver = TypeResolver::new(&facts);

        assert!(matches!(resolver.resolve(Id(42)), Err(ReflectError::UnresolvedType(Id(42)))));
    }

    #[test]
    fn vector_of_vector_is_rejected() {
        let mut insts = primitives();
        insts.push(inst(spirv::Op::TypeVector, 20, vec![id(2), lit(2)]));
        let facts = ingest(&insts).unwrap();

        assert!(matches!(
            TypeResolver::new(&facts).resolve(Id(20)),
            Err(ReflectError::UnexpectedType { id: Id(2), expected: "scalar" })
        ));
    }

    #[test]
    fn opaque_types_and_arrays_of_them() {
        let insts = vec![
            inst(spirv::Op::TypeFloat, 1, vec![lit(32)]),
            inst(
                spirv::Op::TypeImage,
                2,
                vec![
                    id(1),
                    dr::Operand::Dim(spirv::Dim::Dim2D),
                    lit(0),
                    lit(1),
                    lit(0),
                    lit(1),
                    dr::Operand::ImageFormat(spirv::ImageFormat::Unknown),
                ],
            ),
            inst(spirv::Op::TypeSampledImage, 3, vec![id(2)]),
            inst(spirv::Op::TypeSampler, 4, vec![]),
            inst(spirv::Op::TypeInt, 5, vec![lit(32), lit(0)]),
            dr::Instruction::new(spirv::Op::Constant, Some(5), Some(6), vec![lit(4)]),
            inst(spirv::Op::TypeArray, 7, vec![id(3), id(6)]),
            inst(spirv::Op::TypeRuntimeArray, 8, vec![id(4)]),
        ];
        let facts = ingest(&insts).unwrap();
        let mut resolver = TypeResolver::new(&facts);

        assert_eq!(resolver.resolve(Id(7)).unwrap(), TypeKind::SampledImage);
        assert_eq!(resolver.resolve(Id(8)).unwrap(), TypeKind::Sampler);
        assert_eq!(resolver.resolve(Id(2)).unwrap(), TypeKind::Image);
        let tables = resolver.finish();

        let image = tables.images[&Id(2)];
        assert_eq!(image.dim, spirv::Dim::Dim2D);
        assert!(image.arrayed);
        assert!(!image.multisampled);
        assert_eq!(image.sampled_type, Id(1));

        let textures = tables.sampled_images[&Id(7)];
        assert_eq!(textures.image, Id(2));
        assert!(textures.is_array);
        assert_eq!(textures.array_length, Id(6));
        assert!(!tables.sampled_images[&Id(3)].is_array);
        assert!(tables.samplers[&Id(8)].is_array);
        // the runtime array pulled in its element
        assert_eq!(tables.kind(Id(4)), Some(TypeKind::Sampler));
    }
}
