//! Reflection of spirv shader modules
//!
//! Reflection runs in two stages:
//!     - stage 1. [`ingest`] walks the decoded instructions once and records
//!       what each instruction says about its ids (names, decorations, types,
//!       variables, constants, entry points)
//!     - stage 2. [`Module`] is assembled from those facts, resolving every
//!       type on first use and applying decorations to variables and constants
//!
//! Decoding the binary itself is left to [`rspirv`].
//!
//! ```ignore
//! let module = reflect::reflect(&spirv, &reflect::ReflectDesc::default())?;
//! for uniform in module.variables_with_storage_class(reflect::spirv::StorageClass::Uniform) {
//!     println!("{} set {} binding {}", uniform.name, uniform.descriptor_set, uniform.binding);
//! }
//! ```

use std::borrow::Cow;

use rspirv::dr;

pub use rspirv::spirv;

mod bind;
pub mod data;
pub mod error;
pub mod ingest;
pub mod module;
pub mod operand;
mod resolve;

pub use data::*;
pub use error::*;
pub use ingest::{Facts, ingest};
pub use module::*;
pub use operand::{FromOperand, Operands};

/// Describes how to reflect a module
#[derive(Debug, Default, Clone, Copy)]
pub struct ReflectDesc<'a> {
    /// the name of the module, only used for logging
    pub name: Option<&'a str>,
    /// Fail on anything that would otherwise only be reported in
    /// [`Module::diagnostics`]
    pub strict: bool,
}

/// Reflect a module from its decoded instructions
///
/// This is the core entry point, the others decode into instructions and call this
pub fn reflect_instructions<'i, I>(instructions: I, desc: &ReflectDesc<'_>) -> Result<Module, ReflectError>
where
    I: IntoIterator<Item = &'i dr::Instruction>,
{
    #[cfg(feature = "logging")]
    log::trace!("REFLECT: Reflect module, name {:?}", desc.name);

    let facts = ingest(instructions)?;
    let module = Module::assemble(&facts)?;

    #[cfg(feature = "logging")]
    log::trace!(
        "REFLECT: Reflected module, name {:?}, {} variables, {} constants, {} entry points, {} diagnostics",
        desc.name,
        module.variables.len(),
        module.constants.len(),
        module.entry_points.len(),
        module.diagnostics.len(),
    );

    if desc.strict {
        if let Some(diagnostic) = module.diagnostics.first() {
            return Err(ReflectError::Anomaly(diagnostic.clone()));
        }
    }

    Ok(module)
}

/// Reflect a module already decoded by rspirv
pub fn reflect_module(module: &dr::Module, desc: &ReflectDesc<'_>) -> Result<Module, ReflectError> {
    reflect_instructions(module.all_inst_iter(), desc)
}

/// Decode and reflect spirv words
pub fn reflect(spirv: &[u32], desc: &ReflectDesc<'_>) -> Result<Module, ReflectError> {
    let module = dr::load_words(spirv)?;
    reflect_module(&module, desc)
}

/// Decode and reflect spirv bytes, see [`make_spirv`]
pub fn reflect_bytes(data: &[u8], desc: &ReflectDesc<'_>) -> Result<Module, ReflectError> {
    let spirv = make_spirv(data)?;
    reflect(&spirv, desc)
}

/// <https://www.khronos.org/registry/spir-v/specs/1.0/SPIRV.html#_a_id_magic_a_magic_number>
pub const MAGIC_NUMBER: u32 = 0x07230203;

/// Makes [u8] into [u32] ensuring correct spirv
///
/// returns error if the length isn't a multiple of 4 or if the magic number is missing.
/// Modules written with the other endianness are swapped into native order
pub fn make_spirv(data: &[u8]) -> Result<Cow<'_, [u32]>, ReflectError> {
    if data.len() % 4 != 0 {
        return Err(ReflectError::NotMultipleOfFour);
    }

    // include_bytes! and friends don't promise any alignment
    let words = match bytemuck::try_cast_slice::<u8, u32>(data) {
        Ok(words) => Cow::Borrowed(words),
        Err(_) => Cow::Owned(bytemuck::pod_collect_to_vec::<u8, u32>(data)),
    };

    match words.first().copied() {
        Some(MAGIC_NUMBER) => Ok(words),
        Some(magic) if magic == MAGIC_NUMBER.swap_bytes() => {
            Ok(Cow::Owned(words.iter().map(|w| w.swap_bytes()).collect()))
        }
        _ => Err(ReflectError::MissingMagicNumber),
    }
}
