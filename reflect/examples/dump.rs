//! Print the reflection of a spirv file
//!
//! cargo run --example dump -- shader.spv [--strict]

use std::env;
use std::fs;
use std::process;

use reflect::{ReflectDesc, TypeKind};

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: dump <file.spv> [--strict]");
            process::exit(1);
        }
    };
    let strict = args.any(|a| a == "--strict");

    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to read {}: {}", path, e);
            process::exit(1);
        }
    };

    let desc = ReflectDesc {
        name: Some(path.as_str()),
        strict,
    };
    let module = match reflect::reflect_bytes(&bytes, &desc) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    for entry in module.entry_points() {
        println!("entry point {} {:?} {}", entry.name, entry.execution_model, entry.function);
    }

    for v in module.variables().values() {
        let kind = module
            .type_kind(v.ty)
            .map(|k| format!("{:?}", k))
            .unwrap_or_else(|| "?".to_owned());
        println!(
            "{} {:?} {:?} {} {} set {} binding {} location {}",
            v.id, v.name, v.storage_class, kind, v.ty, v.descriptor_set, v.binding, v.location,
        );
        if module.type_kind(v.ty) == Some(TypeKind::Struct) {
            for m in &module.structs()[&v.ty].members {
                println!("    {} offset {} {:?}", m.name, m.offset, module.ty(m.ty));
            }
        }
    }

    for c in module.constants().values() {
        println!(
            "{} {:?} {} {:?} spec {}",
            c.id,
            c.name,
            c.ty,
            c.value,
            if c.is_specialization { c.specialization_id.to_string() } else { "-".to_owned() },
        );
    }

    for d in module.diagnostics() {
        println!("warning: {}", d);
    }
}
