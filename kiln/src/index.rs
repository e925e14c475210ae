use std::collections::{HashMap, HashSet};

use crate::{ComponentDecl, Error, ErrorKind, Model, ModuleDecl, Result, TypeDecl, TypeExpr};

/// Validated name lookup over a [`Model`].
pub struct ModelIndex<'m> {
    model: &'m Model,
    types: HashMap<&'m str, &'m TypeDecl>,
    modules: HashMap<&'m str, &'m ModuleDecl>,
    components: HashMap<&'m str, &'m ComponentDecl>,
}

impl<'m> ModelIndex<'m> {
    pub fn new(model: &'m Model) -> Result<Self> {
        let mut types = HashMap::new();
        for decl in &model.types {
            if types.insert(decl.name.as_str(), decl).is_some() {
                return Err(parse_error(format!("type {} is declared twice", decl.name))
                    .at(decl.location.as_ref()));
            }
        }
        let mut modules = HashMap::new();
        for decl in &model.modules {
            if modules.insert(decl.name.as_str(), decl).is_some() {
                return Err(parse_error(format!("module {} is declared twice", decl.name))
                    .at(decl.location.as_ref()));
            }
        }
        let mut components = HashMap::new();
        for decl in &model.components {
            if components.insert(decl.name.as_str(), decl).is_some() {
                return Err(
                    parse_error(format!("component {} is declared twice", decl.name))
                        .at(decl.location.as_ref()),
                );
            }
        }
        for module in &model.modules {
            for include in &module.includes {
                if !modules.contains_key(include.as_str()) {
                    return Err(parse_error(format!(
                        "module {} includes unknown module {include}",
                        module.name
                    ))
                    .at(module.location.as_ref()));
                }
            }
        }
        for component in &model.components {
            let fail = |message: String| {
                Err(Error::new(&component.name, ErrorKind::Parse { message })
                    .at(component.location.as_ref()))
            };
            for module in &component.modules {
                if !modules.contains_key(module.as_str()) {
                    return fail(format!("unknown module {module}"));
                }
            }
            for name in &component.subcomponents {
                match components.get(name.as_str()) {
                    None => return fail(format!("unknown subcomponent {name}")),
                    Some(sub) if !sub.subcomponent => {
                        return fail(format!("{name} is not declared as a subcomponent"));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(Self {
            model,
            types,
            modules,
            components,
        })
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// Components that are not nested under another component, in declaration order.
    pub fn top_level(&self) -> impl Iterator<Item = &'m ComponentDecl> + use<'m> {
        self.model.components.iter().filter(|c| !c.subcomponent)
    }

    pub fn type_decl(&self, name: &str) -> Option<&'m TypeDecl> {
        self.types.get(name).copied()
    }

    /// Declaration of a plain nominal type.
    pub fn named_decl(&self, ty: &TypeExpr) -> Option<&'m TypeDecl> {
        ty.as_plain_name().and_then(|name| self.type_decl(name))
    }

    pub fn module(&self, name: &str) -> Option<&'m ModuleDecl> {
        self.modules.get(name).copied()
    }

    pub fn component(&self, name: &str) -> Option<&'m ComponentDecl> {
        self.components.get(name).copied()
    }

    /// Whether a value of type `from` may be used where `to` is expected.
    ///
    /// Plain nominal types follow the declared supertype closure; every other
    /// shape is only assignable to itself.
    pub fn is_assignable(&self, from: &TypeExpr, to: &TypeExpr) -> bool {
        if from == to {
            return true;
        }
        let (Some(from), Some(to)) = (from.as_plain_name(), to.as_plain_name()) else {
            return false;
        };
        let mut visited = HashSet::new();
        let mut pending = vec![from];
        while let Some(name) = pending.pop() {
            if name == to {
                return true;
            }
            if !visited.insert(name) {
                continue;
            }
            if let Some(decl) = self.type_decl(name) {
                pending.extend(decl.supertypes.iter().map(String::as_str));
            }
        }
        false
    }
}

fn parse_error(message: String) -> Error {
    Error::model(ErrorKind::Parse { message })
}
