//! Ids and the resolved type records

/// Result id of an instruction
///
/// Types, variables, constants and functions all share the same id space.
/// `Id(0)` is never a valid result id so it doubles as "none" in a few fields
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Id(pub u32);

impl Id {
    pub const NONE: Id = Id(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl From<u32> for Id {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Addresses one member of a struct type
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MemberKey {
    pub structure: Id,
    pub index: u32,
}

impl MemberKey {
    pub fn new(structure: Id, index: u32) -> Self {
        Self { structure, index }
    }
}

/// The scalar a primitive type is built from
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Int,
    Float,
}

/// A scalar, vector or matrix, possibly arrayed
///
/// Vectors have `rows` components and one column, matrices have `cols`
/// column vectors of `rows` components each
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PrimitiveType {
    pub kind: PrimitiveKind,
    pub rows: u32,
    pub cols: u32,
    /// bit width of the scalar, 0 for void and bool
    pub width: u32,
    /// only ever true for ints
    pub signed: bool,
    pub is_array: bool,
    /// id of the constant holding the array length, [`Id::NONE`] if not
    /// an array or if the array is runtime sized
    pub array_length: Id,
}

impl PrimitiveType {
    pub(crate) fn scalar(kind: PrimitiveKind, width: u32, signed: bool) -> Self {
        Self {
            kind,
            rows: 1,
            cols: 1,
            width,
            signed,
            is_array: false,
            array_length: Id::NONE,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub fn is_vector(&self) -> bool {
        self.rows > 1 && self.cols == 1
    }

    pub fn is_matrix(&self) -> bool {
        self.cols > 1
    }
}

/// One member of a [`StructType`]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StructMember {
    pub ty: Id,
    pub name: String,
    /// byte offset from the start of the struct
    pub offset: u32,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StructType {
    pub is_array: bool,
    pub array_length: Id,
    pub name: String,
    pub members: Vec<StructMember>,
}

impl StructType {
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ImageType {
    /// the type of the components produced by sampling
    pub sampled_type: Id,
    pub dim: rspirv::spirv::Dim,
    /// an image array, not to be confused with an array of images
    pub arrayed: bool,
    pub multisampled: bool,
    pub is_array: bool,
    pub array_length: Id,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct SamplerType {
    pub is_array: bool,
    pub array_length: Id,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SampledImageType {
    pub image: Id,
    pub is_array: bool,
    pub array_length: Id,
}

/// Which of the type tables an id lives in
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    Primitive,
    Struct,
    Image,
    Sampler,
    SampledImage,
}

/// Borrowed view of any resolved type
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Type<'a> {
    Primitive(&'a PrimitiveType),
    Struct(&'a StructType),
    Image(&'a ImageType),
    Sampler(&'a SamplerType),
    SampledImage(&'a SampledImageType),
}

impl<'a> Type<'a> {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Primitive(_) => TypeKind::Primitive,
            Type::Struct(_) => TypeKind::Struct,
            Type::Image(_) => TypeKind::Image,
            Type::Sampler(_) => TypeKind::Sampler,
            Type::SampledImage(_) => TypeKind::SampledImage,
        }
    }

    pub fn is_array(&self) -> bool {
        match self {
            Type::Primitive(t) => t.is_array,
            Type::Struct(t) => t.is_array,
            Type::Image(t) => t.is_array,
            Type::Sampler(t) => t.is_array,
            Type::SampledImage(t) => t.is_array,
        }
    }
}
