//! `{scope.attr}` placeholders and `$VAR` references in rule paths.

use strata_ir::{ModuleDecl, ModuleInstance};

use crate::errors::FileListError;

/// Values for `{mod.*}` placeholders of one instance.
pub fn mod_placeholder(inst: &ModuleInstance) -> impl Fn(&str) -> Option<String> + '_ {
    move |key: &str| match key {
        "mod.modname" => Some(inst.modname.clone()),
        "mod.libname" => Some(inst.libname().to_string()),
        "mod.inst" => Some(inst.name.to_string()),
        "mod.path" => Some(inst.path.to_string()),
        "mod.topmodname" => Some(inst.topmodname.clone()),
        _ => None,
    }
}

/// Values for `{cls.*}` placeholders of a declaration contributing
/// templates.
pub fn cls_placeholder(decl: &ModuleDecl) -> impl Fn(&str) -> Option<String> + '_ {
    move |key: &str| match key {
        "cls.modname" => Some(decl.name().to_string()),
        "cls.libname" => Some(decl.libname().to_string()),
        _ => None,
    }
}

/// Replaces every `{key}` in `text` by `lookup(key)`.
///
/// `{{` and `}}` produce literal braces.
pub fn substitute(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, FileListError> {
    let error = |reason: String| FileListError::Placeholder {
        text: text.to_string(),
        reason,
    };
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => key.push(c),
                        None => return Err(error("unclosed '{'".to_string())),
                    }
                }
                let value = lookup(&key)
                    .ok_or_else(|| error(format!("unknown placeholder '{key}'")))?;
                out.push_str(&value);
            }
            '}' => return Err(error("single '}'".to_string())),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Expands `$NAME` and `${NAME}` from `env`.
pub fn expand_env(
    text: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String, FileListError> {
    let error = |reason: String| FileListError::Placeholder {
        text: text.to_string(),
        reason,
    };
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, tail) = if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| error("unclosed '${'".to_string()))?;
            (&braced[..end], &braced[end + 1..])
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], &after[end..])
        };
        if name.is_empty() {
            out.push('$');
        } else {
            let value =
                env(name).ok_or_else(|| error(format!("environment variable '{name}' is not set")))?;
            out.push_str(&value);
        }
        rest = tail;
    }
    out.push_str(rest);
    Ok(out)
}
