//! Parameter binding and namespace resolution for one instance.

use indexmap::IndexMap;
use strata_common::Ident;
use strata_ir::{Bindings, Expr, IdentKind, IrError, ModConfig, ModuleDecl, Namespace, Value};

use crate::errors::ElabErrorKind;

/// Parameter values of an instance and the bindings derived from them.
#[derive(Clone, Debug, Default)]
pub struct BoundParams {
    /// Values in declaration order.
    pub values: IndexMap<Ident, Value>,
    /// Define values, then configuration values, then parameter values.
    pub bindings: Bindings,
}

/// Binds every parameter of `decl`, in declaration order.
///
/// A parameter takes its override when one is given, and otherwise its
/// default resolved against the configuration and the parameters bound
/// before it.
pub fn bind_params(
    decl: &ModuleDecl,
    overrides: &IndexMap<Ident, Value>,
    config: Option<&ModConfig>,
) -> Result<BoundParams, ElabErrorKind> {
    for name in overrides.keys() {
        let is_param = decl
            .namespace
            .get(*name)
            .is_some_and(|i| i.kind == IdentKind::Param);
        if !is_param {
            return Err(ElabErrorKind::UnknownParameter {
                modref: decl.modref,
                param: *name,
            });
        }
    }

    let declared: Vec<Ident> = decl.namespace.params().map(|p| p.name).collect();
    let mut bindings = decl.define_bindings();
    if let Some(config) = config {
        bindings.extend(config.bindings().iter());
    }
    let mut bound = BoundParams {
        values: IndexMap::new(),
        bindings,
    };
    for param in decl.namespace.params() {
        let ty = match overrides.get(&param.name) {
            Some(value) => param.ty.with_default(Expr::constant(*value))?,
            None => param.ty,
        };
        let resolved = ty.resolve(&bound.bindings).map_err(|err| match err {
            IrError::UnresolvedParameter { params, .. } => {
                match params.iter().find(|p| declared.contains(p)) {
                    Some(reference) => IrError::ParameterOrder {
                        param: param.name,
                        reference: *reference,
                    },
                    None => IrError::UnresolvedParameter {
                        context: param.name.to_string(),
                        params,
                    },
                }
            }
            other => other,
        })?;
        let value = resolved
            .default()
            .and_then(Expr::as_const)
            .ok_or_else(|| IrError::TypeDefinition {
                name: resolved.to_string(),
                reason: format!("parameter '{}' has no value", param.name),
            })?;
        bound.bindings.insert(param.name, Expr::constant(value));
        bound.values.insert(param.name, value);
    }
    Ok(bound)
}

/// Resolves every identifier type of `decl` under the bound parameters.
///
/// Parameter identifiers carry their bound value as type default.
pub fn resolve_namespace(decl: &ModuleDecl, bound: &BoundParams) -> Result<Namespace, IrError> {
    let mut namespace = Namespace::new();
    for ident in decl.namespace.iter() {
        let mut ident = ident.clone();
        if let Some(value) = bound.values.get(&ident.name) {
            ident.ty = ident.ty.with_default(Expr::constant(*value))?;
        }
        namespace.add(ident.resolve(&bound.bindings)?)?;
    }
    Ok(namespace)
}
