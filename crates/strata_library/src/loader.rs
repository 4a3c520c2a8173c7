//! Loading library files into a [`ModuleRegistry`].
//!
//! Loading happens in two passes: every file is parsed and its named types
//! are registered first, then the modules are built. This lets a library
//! use types of libraries loaded after it.

use std::fs;
use std::path::{Path, PathBuf};

use strata_elaborate::ModuleRegistry;
use strata_ir::{
    Define, Identifier, InstDecl, IrError, ModRef, ModuleBuilder, ModuleDecl, Value,
};
use tracing::{debug, warn};

use crate::error::LibraryError;
use crate::schema::{parse_endpoint, IfdefSpec, LibraryFile, ModuleSpec};
use crate::types::TypeTable;

/// File extension of library files.
pub const LIBRARY_EXTENSION: &str = "toml";

/// Summary of a loaded library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryInfo {
    /// Library name.
    pub name: String,
    /// Description from the library file.
    pub description: String,
    /// File the library was read from, if any.
    pub path: Option<PathBuf>,
    /// Modules in declaration order.
    pub modules: Vec<ModRef>,
}

struct Pending {
    origin: PathBuf,
    dir: Option<PathBuf>,
    file: LibraryFile,
}

/// Collects library sources and builds them into a registry.
#[derive(Default)]
pub struct LibraryLoader {
    pending: Vec<Pending>,
}

impl LibraryLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a library given as TOML text; `dir` anchors relative `basedir`s.
    pub fn add_str(
        &mut self,
        source: &str,
        origin: impl Into<PathBuf>,
        dir: Option<PathBuf>,
    ) -> Result<&mut Self, LibraryError> {
        let origin = origin.into();
        let file: LibraryFile = toml::from_str(source).map_err(|err| LibraryError::Parse {
            path: origin.clone(),
            message: err.message().to_string(),
        })?;
        debug!(library = %file.library.name, origin = %origin.display(), "parsed library");
        self.pending.push(Pending { origin, dir, file });
        Ok(self)
    }

    /// Adds a library file.
    pub fn add_file(&mut self, path: &Path) -> Result<&mut Self, LibraryError> {
        let source = fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = path.parent().map(Path::to_path_buf);
        self.add_str(&source, path, dir)
    }

    /// Adds a library file, or every library file of a directory in name
    /// order. Missing paths are skipped with a warning.
    pub fn add_path(&mut self, path: &Path) -> Result<&mut Self, LibraryError> {
        if path.is_file() {
            return self.add_file(path);
        }
        if !path.is_dir() {
            warn!(path = %path.display(), "library path does not exist");
            return Ok(self);
        }
        let io = |source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(io)? {
            let file = entry.map_err(io)?.path();
            if file.is_file() && file.extension().is_some_and(|e| e == LIBRARY_EXTENSION) {
                files.push(file);
            }
        }
        files.sort();
        for file in files {
            self.add_file(&file)?;
        }
        Ok(self)
    }

    /// Builds all added libraries into a registry.
    pub fn finish(self) -> Result<(ModuleRegistry, Vec<LibraryInfo>), LibraryError> {
        let mut types = TypeTable::new();
        for pending in &self.pending {
            let library = &pending.file.library.name;
            for (name, def) in &pending.file.types {
                types.define(library, name, def.clone());
            }
        }

        let mut registry = ModuleRegistry::new();
        let mut infos = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            let library = pending.file.library.name.as_str();
            let mut modules = Vec::with_capacity(pending.file.modules.len());
            for spec in &pending.file.modules {
                let decl = build_module(library, spec, pending.dir.as_deref(), &mut types)?;
                modules.push(decl.modref);
                registry.add(decl)?;
            }
            debug!(library, modules = modules.len(), "loaded library");
            infos.push(LibraryInfo {
                name: library.to_string(),
                description: pending.file.library.description.clone(),
                path: Some(pending.origin).filter(|p| p.as_os_str() != "<string>"),
                modules,
            });
        }
        Ok((registry, infos))
    }
}

fn build_module(
    library: &str,
    spec: &ModuleSpec,
    dir: Option<&Path>,
    types: &mut TypeTable,
) -> Result<ModuleDecl, LibraryError> {
    let context = format!("{library}.{}", spec.name);
    let definition = LibraryError::definition(&context);

    let mut builder = ModuleBuilder::new(ModRef::new(library, spec.name.as_str()));
    builder.flags(spec.flags);
    if let Some(title) = &spec.title {
        builder.title(title.as_str());
    }
    if let Some(base) = spec.base {
        builder.base(base);
    }
    if let Some(basedir) = &spec.basedir {
        match dir {
            Some(dir) => builder.basedir(dir.join(basedir)),
            None => builder.basedir(basedir.as_str()),
        };
    }
    if let Some(config) = &spec.config {
        builder.config(config.build());
    }

    for define in &spec.defines {
        let ty = types.resolve(library, &define.ty)?;
        let mut built = Define::new(ty, define.name.as_str()).map_err(&definition)?;
        if let Some(value) = define.value {
            built = built.with_value(Value::from(value)).map_err(&definition)?;
        }
        builder.define(built).map_err(&definition)?;
    }
    for param in &spec.params {
        let ty = types.resolve(library, &param.ty)?;
        let ident = with_doc(Identifier::param(param.name.as_str(), ty), &param.doc);
        let ident = with_ifdefs(ident, &param.ifdef).map_err(&definition)?;
        builder.ident(ident).map_err(&definition)?;
    }
    for port in &spec.ports {
        let ty = types.resolve(library, &port.ty)?;
        let ident = Identifier::port(port.name.as_str(), ty, port.direction);
        let ident = with_ifdefs(with_doc(ident, &port.doc), &port.ifdef).map_err(&definition)?;
        builder.ident(ident).map_err(&definition)?;
    }
    for signal in &spec.signals {
        let ty = types.resolve(library, &signal.ty)?;
        let ident = Identifier::signal(signal.name.as_str(), ty);
        let ident =
            with_ifdefs(with_doc(ident, &signal.doc), &signal.ifdef).map_err(&definition)?;
        builder.ident(ident).map_err(&definition)?;
    }

    for inst in &spec.insts {
        let mut decl = InstDecl::new(inst.name.as_str(), inst.module);
        for (name, value) in &inst.params {
            decl = decl.param(name.as_str(), value.to_expr()?);
        }
        if let Some(config) = &inst.config {
            decl = decl.with_config(config.build());
        }
        builder.inst(decl).map_err(&definition)?;
    }
    for assign in &spec.assigns {
        builder.assign(parse_endpoint(&assign.target)?, assign.source.to_endpoint()?);
    }
    for mux_spec in &spec.muxes {
        let mux = builder.mux(mux_spec.name.as_str()).map_err(&definition)?;
        if let Some(title) = &mux_spec.title {
            mux.set_title(title.as_str());
        }
        for default in &mux_spec.defaults {
            mux.set_default(parse_endpoint(&default.target)?, default.source.to_endpoint()?)
                .map_err(&definition)?;
        }
        for case in &mux_spec.cases {
            mux.set(
                parse_endpoint(&case.sel)?,
                case.cond.to_expr()?,
                parse_endpoint(&case.target)?,
                case.source.to_endpoint()?,
            )
            .map_err(&definition)?;
        }
    }
    for rule in &spec.filelists {
        builder.filelist(rule.clone());
    }
    Ok(builder.build())
}

fn with_doc(ident: Identifier, doc: &Option<String>) -> Identifier {
    match doc {
        Some(doc) => ident.with_doc(doc.as_str()),
        None => ident,
    }
}

fn with_ifdefs(ident: Identifier, ifdef: &Option<IfdefSpec>) -> Result<Identifier, IrError> {
    match ifdef {
        Some(spec) => ident.with_ifdefs(spec.names()),
        None => Ok(ident),
    }
}

/// Parses a single library from TOML text.
pub fn load_library_str(source: &str) -> Result<(ModuleRegistry, LibraryInfo), LibraryError> {
    let mut loader = LibraryLoader::new();
    loader.add_str(source, "<string>", None)?;
    let (registry, mut infos) = loader.finish()?;
    let info = infos.pop().ok_or_else(|| LibraryError::Parse {
        path: PathBuf::from("<string>"),
        message: "no library".to_string(),
    })?;
    Ok((registry, info))
}

/// Loads a single library file.
pub fn load_library_file(path: &Path) -> Result<(ModuleRegistry, LibraryInfo), LibraryError> {
    let mut loader = LibraryLoader::new();
    loader.add_file(path)?;
    let (registry, mut infos) = loader.finish()?;
    let info = infos.pop().ok_or_else(|| LibraryError::Parse {
        path: path.to_path_buf(),
        message: "no library".to_string(),
    })?;
    Ok((registry, info))
}

/// Loads every library found at `paths` into one registry.
pub fn load_registry(
    paths: &[PathBuf],
) -> Result<(ModuleRegistry, Vec<LibraryInfo>), LibraryError> {
    let mut loader = LibraryLoader::new();
    for path in paths {
        loader.add_path(path)?;
    }
    loader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_elaborate::{Elaborator, TopModRef};
    use strata_ir::{Direction, Endpoint, GenMode};

    const GLBL: &str = r#"
[library]
name = "glbl_lib"

[types.BusType]
kind = "struct"
members = [
    { name = "trans", type = { kind = "bit" } },
    { name = "addr", type = { kind = "uint", width = 32 } },
    { name = "ready", type = { kind = "bit", default = 1 }, orientation = "bwd" },
]

[[modules]]
name = "clk_gate"
ports = [
    { name = "clk_i", type = { kind = "clk" }, direction = "in" },
    { name = "clk_o", type = { kind = "clk" }, direction = "out" },
]
"#;

    const UART: &str = r#"
[library]
name = "uart_lib"

[[modules]]
name = "uart"
title = "UART"
params = [
    { name = "param_p", type = { kind = "integer", default = 10 }, doc = "Depth" },
    { name = "width_p", type = { kind = "integer", default = "log2ceil(param_p + 1)" } },
]
ports = [
    { name = "main_i", type = { kind = "clk_rst_an" }, direction = "in" },
    { name = "bus_i", type = { kind = "ref", name = "glbl_lib.BusType" }, direction = "in" },
]
signals = [{ name = "data_s", type = { kind = "uint", width = "width_p" } }]
insts = [{ name = "u_clk_gate", module = "glbl_lib.clk_gate" }]
assigns = [{ target = "u_clk_gate/clk_i", source = "main_clk_i" }]

[[modules.filelists]]
name = "hdl"
gen = "full"
filepaths = ["uart.sv"]
"#;

    #[test]
    fn builds_declarations() {
        let mut loader = LibraryLoader::new();
        loader.add_str(UART, "uart.toml", None).unwrap();
        loader.add_str(GLBL, "glbl.toml", None).unwrap();
        let (registry, infos) = loader.finish().unwrap();

        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].modules, vec![ModRef::new("uart_lib", "uart")]);
        let decl = registry.get(&ModRef::new("uart_lib", "uart")).unwrap();
        assert_eq!(decl.title.as_deref(), Some("UART"));
        assert_eq!(decl.insts.len(), 1);
        assert_eq!(decl.filelists[0].gen, GenMode::Full);
        assert_eq!(
            decl.assigns[0].source,
            Endpoint::Local("main_clk_i".into())
        );
        let bus = decl.namespace.get("bus_i").unwrap();
        assert_eq!(bus.direction(), Some(Direction::In));
        assert_eq!(bus.ty.to_string(), "BusType()");
        let param = decl.namespace.get("param_p").unwrap();
        assert_eq!(param.doc.as_deref(), Some("Depth"));
    }

    #[test]
    fn elaborates_loaded_libraries() {
        let mut loader = LibraryLoader::new();
        loader.add_str(GLBL, "glbl.toml", None).unwrap();
        loader.add_str(UART, "uart.toml", None).unwrap();
        let (registry, _) = loader.finish().unwrap();
        let top: TopModRef = "uart_lib.uart".parse().unwrap();
        let design = Elaborator::new(&registry).elaborate(&top).unwrap();
        assert_eq!(
            design.top.param("width_p").map(|v| v.to_string()),
            Some("4".to_string())
        );
    }

    const MUXED: &str = r#"
[library]
name = "mux_lib"

[[modules]]
name = "leaf"
ports = [
    { name = "a_i", type = { kind = "uint", width = 4 }, direction = "in" },
    { name = "q_o", type = { kind = "uint", width = 8 }, direction = "out" },
]

[[modules]]
name = "top"
defines = [{ name = "lanes_p", type = { kind = "integer" }, value = 2 }]
params = [{ name = "width_p", type = { kind = "integer", default = "lanes_p * 4" } }]
ports = [
    { name = "sel_i", type = { kind = "uint", width = 2 }, direction = "in" },
    { name = "q_o", type = { kind = "uint", width = "width_p" }, direction = "out" },
    { name = "dbg_o", type = { kind = "bit" }, direction = "out", ifdef = "DEBUG" },
]
insts = [
    { name = "u_a", module = "mux_lib.leaf" },
    { name = "u_b", module = "mux_lib.leaf" },
]
assigns = [
    { target = "u_a/a_i", source = "u_b/q_o[7:4]" },
    { target = "u_b/a_i", source = "u_a/q_o[3:0]" },
    { target = "dbg_o", source = "u_a/q_o[0]" },
]

[[modules.muxes]]
name = "main"
title = "Output select"
defaults = [{ target = "q_o", source = 0 }]
cases = [
    { sel = "sel_i", cond = 1, target = "q_o", source = "u_a/q_o" },
    { sel = "sel_i", cond = 2, target = "q_o", source = "u_b/q_o" },
]
"#;

    #[test]
    fn muxes_slices_and_defines() {
        let (registry, _) = load_library_str(MUXED).unwrap();
        let decl = registry.get(&ModRef::new("mux_lib", "top")).unwrap();
        assert_eq!(decl.defines.len(), 1);
        let main = decl.get_mux("main").unwrap();
        assert_eq!(main.title.as_deref(), Some("Output select"));
        assert_eq!(main.cases.len(), 2);
        let dbg = decl.namespace.get("dbg_o").unwrap();
        assert_eq!(dbg.ifdefs.iter().map(|i| i.as_str()).collect::<Vec<_>>(), vec!["DEBUG"]);

        let top: TopModRef = "mux_lib.top".parse().unwrap();
        let design = Elaborator::new(&registry).elaborate(&top).unwrap();
        assert_eq!(design.top.param("width_p").map(|v| v.to_string()), Some("8".to_string()));
        let conns: Vec<String> = design.top.connections.iter().map(ToString::to_string).collect();
        assert_eq!(
            conns,
            vec![
                "u_a/a_i <= u_b/q_o[7:4]",
                "u_b/a_i <= u_a/q_o[3:0]",
                "dbg_o <= u_a/q_o[0]",
                "q_o <= 0 [main: default]",
                "q_o <= u_a/q_o [main: sel_i == 1]",
                "q_o <= u_b/q_o [main: sel_i == 2]",
            ]
        );
    }

    #[test]
    fn invalid_ifdef_is_a_definition_error() {
        let source = r#"
[library]
name = "lib"

[[modules]]
name = "m"
signals = [{ name = "x_s", type = { kind = "bit" }, ifdef = "not a name" }]
"#;
        assert!(matches!(
            load_library_str(source),
            Err(LibraryError::Definition { .. })
        ));
    }

    #[test]
    fn parameter_order_is_checked() {
        let source = r#"
[library]
name = "lib"

[[modules]]
name = "m"
params = [
    { name = "width_p", type = { kind = "integer", default = "depth_p" } },
    { name = "depth_p", type = { kind = "integer", default = 4 } },
]
"#;
        let err = load_library_str(source).unwrap_err();
        assert!(matches!(err, LibraryError::Definition { .. }));
        assert!(err.to_string().starts_with("lib.m: "));
    }

    #[test]
    fn config_values_visible_to_params() {
        let source = r#"
[library]
name = "lib"

[[modules]]
name = "m"
config = { name = "fast", values = { depth = 8 } }
params = [{ name = "depth_p", type = { kind = "integer", default = "depth" } }]
"#;
        let (registry, info) = load_library_str(source).unwrap();
        assert_eq!(info.name, "lib");
        assert!(info.path.is_none());
        assert!(registry.get(&ModRef::new("lib", "m")).unwrap().config.is_some());
    }

    #[test]
    fn parse_errors_name_the_file() {
        let mut loader = LibraryLoader::new();
        let err = loader
            .add_str("[library]\nname = 1\n", "bad.toml", None)
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("failed to parse 'bad.toml'"));
    }

    #[test]
    fn duplicate_modules_are_rejected() {
        let mut loader = LibraryLoader::new();
        loader.add_str(GLBL, "a.toml", None).unwrap();
        loader.add_str(GLBL, "b.toml", None).unwrap();
        assert!(matches!(loader.finish(), Err(LibraryError::Registry(_))));
    }

    #[test]
    fn loads_directories_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_uart.toml"), UART).unwrap();
        fs::write(dir.path().join("a_glbl.toml"), GLBL).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let (registry, infos) =
            load_registry(&[dir.path().to_path_buf(), dir.path().join("missing")]).unwrap();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["glbl_lib", "uart_lib"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(infos[0].path.as_deref(), Some(dir.path().join("a_glbl.toml").as_path()));
    }

    #[test]
    fn basedir_is_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.toml");
        fs::write(
            &path,
            "[library]\nname = \"lib\"\n\n[[modules]]\nname = \"m\"\nbasedir = \"rtl\"\n",
        )
        .unwrap();
        let (registry, info) = load_library_file(&path).unwrap();
        assert_eq!(info.path.as_deref(), Some(path.as_path()));
        let decl = registry.get(&ModRef::new("lib", "m")).unwrap();
        assert_eq!(decl.basedir.as_deref(), Some(dir.path().join("rtl").as_path()));
    }
}
