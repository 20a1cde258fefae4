//! Apply pointer and decoration facts to variables and constants

use rspirv::spirv;

use crate::data::Id;
use crate::error::Diagnostic;
use crate::ingest::{ConstantFact, Facts, VariableFact};
use crate::module::{Constant, Variable};

/// Builds the final record for one variable
///
/// If the declared type isn't a known pointer type the declared id is used
/// as the variable's type and a [`Diagnostic::MissingPointer`] is recorded
pub(crate) fn bind_variable(
    facts: &Facts,
    id: Id,
    fact: &VariableFact,
    diagnostics: &mut Vec<Diagnostic>,
) -> Variable {
    let ty = match facts.pointers.get(&fact.ty) {
        Some(pointer) => pointer.pointee,
        None => {
            let diagnostic = Diagnostic::MissingPointer {
                variable: id,
                declared: fact.ty,
            };
            #[cfg(feature = "logging")]
            log::warn!("REFLECT: {}", diagnostic);
            diagnostics.push(diagnostic);
            fact.ty
        }
    };

    let mut variable = Variable {
        id,
        name: facts.name(id).to_owned(),
        storage_class: fact.storage_class,
        ty,
        binding: 0,
        location: 0,
        descriptor_set: 0,
        input_attachment_index: 0,
        specialization_id: 0,
    };

    for decoration in facts.decorations(id) {
        let value = decoration.operand.unwrap_or(0);
        match decoration.kind {
            spirv::Decoration::Location => variable.location = value,
            spirv::Decoration::Binding => variable.binding = value,
            spirv::Decoration::DescriptorSet => variable.descriptor_set = value,
            spirv::Decoration::InputAttachmentIndex => variable.input_attachment_index = value,
            _ => (),
        }
    }

    variable
}

pub(crate) fn bind_constant(facts: &Facts, id: Id, fact: &ConstantFact) -> Constant {
    let spec_id = facts
        .decorations(id)
        .iter()
        .rev()
        .find(|d| d.kind == spirv::Decoration::SpecId)
        .map(|d| d.operand.unwrap_or(0));

    Constant {
        id,
        ty: fact.ty,
        value: fact.value.clone(),
        name: facts.name(id).to_owned(),
        is_specialization: spec_id.is_some(),
        specialization_id: spec_id.unwrap_or(0),
    }
}
