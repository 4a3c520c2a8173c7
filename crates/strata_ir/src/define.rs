//! Named preprocessor constants.

use crate::error::IrError;
use crate::expr::{Bindings, Expr};
use crate::ident::split_suffix;
use crate::types::{Type, TypeKind};
use crate::value::Value;
use std::fmt;
use strata_common::Ident;

/// A named constant of a scalar type, e.g. `` `define CNT_P 4 ``.
///
/// Parameter and type expressions of the declaring module may refer to it
/// by name; it evaluates to its value, or to the type default if unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Define {
    /// Name.
    pub name: Ident,
    /// Scalar type.
    pub ty: Type,
    /// Explicit value.
    pub value: Option<Value>,
}

impl Define {
    /// A define of `ty`, which must be a scalar type.
    pub fn new(ty: Type, name: impl Into<Ident>) -> Result<Self, IrError> {
        if matches!(
            ty.kind(),
            TypeKind::Array { .. } | TypeKind::Struct { .. }
        ) {
            return Err(IrError::TypeDefinition {
                name: ty.to_string(),
                reason: "defines require a scalar type".to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            ty,
            value: None,
        })
    }

    /// Sets the value; it must fit the type.
    pub fn with_value(mut self, value: impl Into<Value>) -> Result<Self, IrError> {
        let value = value.into();
        self.ty
            .with_default(Expr::constant(value))?
            .resolve(&Bindings::new())?;
        self.value = Some(value);
        Ok(self)
    }

    /// The value, falling back to the type default.
    pub fn expr(&self) -> Expr {
        match self.value {
            Some(value) => Expr::constant(value),
            None => self.ty.default().unwrap_or_else(|| Expr::int(0)),
        }
    }

    /// Name without its suffix.
    pub fn basename(&self) -> &'static str {
        split_suffix(self.name.as_str()).0
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Define({}, '{}'", self.ty, self.name)?;
        if let Some(value) = self.value {
            write!(f, ", value={value}")?;
        }
        write!(f, ")")
    }
}
