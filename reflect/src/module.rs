//! The reflected module and the pass that builds it

use std::collections::BTreeMap;

use rspirv::spirv;

use crate::bind::{bind_constant, bind_variable};
use crate::data::*;
use crate::error::{Diagnostic, ReflectError};
use crate::ingest::Facts;
use crate::resolve::{TypeResolver, TypeTables};

/// A global or function local variable
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Variable {
    pub id: Id,
    /// empty if the module has no debug name for it
    pub name: String,
    pub storage_class: spirv::StorageClass,
    /// the type pointed to by the variable's declared pointer type
    pub ty: Id,
    pub binding: u32,
    pub location: u32,
    pub descriptor_set: u32,
    pub input_attachment_index: u32,
    pub specialization_id: u32,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Constant {
    pub id: Id,
    pub ty: Id,
    /// literal words, low order first. Empty for null constants
    pub value: Vec<u32>,
    pub name: String,
    pub is_specialization: bool,
    pub specialization_id: u32,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EntryPoint {
    pub execution_model: spirv::ExecutionModel,
    pub function: Id,
    pub name: String,
    /// ids of the variables making up the entry point's interface
    pub interface: Vec<Id>,
}

/// Reflection of one spirv module
///
/// Every type id referenced by a variable or struct member is guaranteed to
/// be found by [`Module::ty`]
#[derive(Clone, PartialEq, Debug)]
pub struct Module {
    pub(crate) variables: BTreeMap<Id, Variable>,
    pub(crate) constants: BTreeMap<Id, Constant>,
    pub(crate) types: TypeTables,
    pub(crate) entry_points: Vec<EntryPoint>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Module {
    /// Resolves every type, variable and constant described by `facts`
    pub(crate) fn assemble(facts: &Facts) -> Result<Self, ReflectError> {
        let mut resolver = TypeResolver::new(facts);

        // walk every type so the ones only reachable through
        // pointers or struct members get resolved too
        for &id in facts.primitives.keys() {
            resolver.resolve(id)?;
        }
        for &id in facts.structs.keys() {
            resolver.resolve(id)?;
        }
        for &id in facts.images.keys() {
            resolver.resolve(id)?;
        }
        for &id in facts.samplers.iter() {
            resolver.resolve(id)?;
        }
        for &id in facts.sampled_images.keys() {
            resolver.resolve(id)?;
        }
        for pointer in facts.pointers.values() {
            resolver.resolve(pointer.pointee)?;
        }

        let mut diagnostics = facts.diagnostics.clone();

        let mut variables = BTreeMap::new();
        for (&id, fact) in facts.variables.iter() {
            let variable = bind_variable(facts, id, fact, &mut diagnostics);
            resolver.resolve(variable.ty)?;
            variables.insert(id, variable);
        }

        let constants = facts
            .constants
            .iter()
            .map(|(&id, fact)| (id, bind_constant(facts, id, fact)))
            .collect::<BTreeMap<_, _>>();

        Ok(Self {
            variables,
            constants,
            types: resolver.finish(),
            entry_points: facts.entry_points.clone(),
            diagnostics,
        })
    }

    pub fn variables(&self) -> &BTreeMap<Id, Variable> {
        &self.variables
    }

    pub fn variable(&self, id: Id) -> Option<&Variable> {
        self.variables.get(&id)
    }

    /// First variable with the given debug name
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables.values().find(|v| v.name == name)
    }

    pub fn variables_with_storage_class(
        &self,
        storage_class: spirv::StorageClass,
    ) -> impl Iterator<Item = &Variable> + '_ {
        self.variables
            .values()
            .filter(move |v| v.storage_class == storage_class)
    }

    pub fn constants(&self) -> &BTreeMap<Id, Constant> {
        &self.constants
    }

    pub fn constant(&self, id: Id) -> Option<&Constant> {
        self.constants.get(&id)
    }

    pub fn specialization_constants(&self) -> impl Iterator<Item = &Constant> + '_ {
        self.constants.values().filter(|c| c.is_specialization)
    }

    pub fn primitives(&self) -> &BTreeMap<Id, PrimitiveType> {
        &self.types.primitives
    }

    pub fn structs(&self) -> &BTreeMap<Id, StructType> {
        &self.types.structs
    }

    pub fn images(&self) -> &BTreeMap<Id, ImageType> {
        &self.types.images
    }

    pub fn samplers(&self) -> &BTreeMap<Id, SamplerType> {
        &self.types.samplers
    }

    pub fn sampled_images(&self) -> &BTreeMap<Id, SampledImageType> {
        &self.types.sampled_images
    }

    pub fn type_kind(&self, id: Id) -> Option<TypeKind> {
        self.types.kind(id)
    }

    pub fn ty(&self, id: Id) -> Option<Type<'_>> {
        self.types.get(id)
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.name == name)
    }

    /// Non fatal problems found while reflecting, in the order they were found
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
